// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./shamba.toml` > `~/.config/shamba/shamba.toml` > `/etc/shamba/shamba.toml`
//! with environment variable overrides via `SHAMBA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ShambaConfig;

/// Top-level sections, used to map `SHAMBA_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: &[&str] = &["engine", "countries", "sms", "agent", "join", "tenant"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/shamba/shamba.toml` (system-wide)
/// 3. `~/.config/shamba/shamba.toml` (user XDG config)
/// 4. `./shamba.toml` (local directory)
/// 5. `SHAMBA_*` environment variables
pub fn load_config() -> Result<ShambaConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ShambaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShambaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ShambaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ShambaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ShambaConfig::default()))
        .merge(Toml::file("/etc/shamba/shamba.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("shamba/shamba.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("shamba.toml"))
        .merge(env_provider())
}

/// Map an env key (prefix stripped, lowercased) onto its dotted config path.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `SHAMBA_ENGINE_DUPLICATE_WINDOW_SECS` maps to `engine.duplicate_window_secs`.
pub fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("SHAMBA_").map(|key| map_env_key(key.as_str()).into())
}
