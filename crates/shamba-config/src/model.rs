// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Shamba SMS engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shamba_core::{Country, Language};

/// Top-level Shamba configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ShambaConfig {
    /// Dispatch engine windows and fallbacks.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Which countries are served.
    #[serde(default)]
    pub countries: CountriesConfig,

    /// SMS pagination settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// AI signup agent settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Join flow settings.
    #[serde(default)]
    pub join: JoinConfig,

    /// Per-tenant values substituted into response templates.
    #[serde(default)]
    pub tenant: TenantConfig,
}

/// Dispatch engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Trailing window in which identical texts from one customer are duplicates.
    #[serde(default = "default_duplicate_window_secs")]
    pub duplicate_window_secs: u64,

    /// How far back a survey request still expects a reply.
    #[serde(default = "default_lookback_days")]
    pub survey_lookback_days: i64,

    /// How far back a data request still expects a reply.
    #[serde(default = "default_lookback_days")]
    pub data_request_lookback_days: i64,

    /// Longest text still considered a survey answer.
    #[serde(default = "default_nps_max_reply_len")]
    pub nps_max_reply_len: usize,

    /// Sent to senders whose phone country is not operated.
    #[serde(default = "default_unsupported_country_text")]
    pub unsupported_country_text: String,

    /// Language used when the customer has no preference.
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: default_duplicate_window_secs(),
            survey_lookback_days: default_lookback_days(),
            data_request_lookback_days: default_lookback_days(),
            nps_max_reply_len: default_nps_max_reply_len(),
            unsupported_country_text: default_unsupported_country_text(),
            default_language: default_language(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// The configured default language, falling back to English when unparsable.
    pub fn default_language(&self) -> Language {
        Language::from_str(&self.default_language).unwrap_or(Language::Eng)
    }
}

fn default_duplicate_window_secs() -> u64 {
    300
}

fn default_lookback_days() -> i64 {
    3
}

fn default_nps_max_reply_len() -> usize {
    10
}

fn default_unsupported_country_text() -> String {
    "Sorry, this service is only available to farmers in Kenya, Uganda and Zambia.".to_string()
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Operated countries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CountriesConfig {
    /// ISO codes of the countries whose senders are served.
    #[serde(default = "default_operated")]
    pub operated: Vec<String>,
}

impl Default for CountriesConfig {
    fn default() -> Self {
        Self {
            operated: default_operated(),
        }
    }
}

impl CountriesConfig {
    /// Parsed operated countries; unknown codes are skipped (validation reports them).
    pub fn operated_countries(&self) -> Vec<Country> {
        self.operated
            .iter()
            .filter_map(|code| Country::from_str(code.trim()).ok())
            .collect()
    }

    pub fn is_operated(&self, country: Country) -> bool {
        self.operated_countries().contains(&country)
    }
}

fn default_operated() -> Vec<String> {
    vec!["KE".to_string(), "UG".to_string(), "ZM".to_string()]
}

/// SMS pagination configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Encoding units available per page.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Append a continuation suffix to every page of a multi-page message.
    #[serde(default = "default_paginate")]
    pub paginate: bool,

    /// Suffix format; `{i}` is the page number and `{n}` the page count.
    #[serde(default = "default_continuation_format")]
    pub continuation_format: String,

    /// Texts needing more pages than this are rejected.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
            paginate: default_paginate(),
            continuation_format: default_continuation_format(),
            max_pages: default_max_pages(),
        }
    }
}

fn default_page_limit() -> usize {
    160
}

fn default_paginate() -> bool {
    true
}

fn default_continuation_format() -> String {
    " ({i}/{n})".to_string()
}

fn default_max_pages() -> usize {
    10
}

/// AI signup agent configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Global switch for the signup agent.
    #[serde(default)]
    pub enabled: bool,

    /// Restrict the agent to whitelisted senders.
    #[serde(default)]
    pub whitelist_enabled: bool,

    /// E.164 numbers allowed to reach the agent while whitelisting is on.
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Countries where the landmark collaborator may infer a level-3 region.
    #[serde(default = "default_landmark_countries")]
    pub landmark_countries: Vec<String>,

    /// Lowest landmark-match confidence that is accepted.
    #[serde(default = "default_landmark_min_confidence")]
    pub landmark_min_confidence: f64,

    /// Time-to-live of the commodity name cache.
    #[serde(default = "default_commodity_cache_ttl_secs")]
    pub commodity_cache_ttl_secs: u64,

    /// Extra raw-name -> catalog-name overrides merged over the built-in table.
    #[serde(default)]
    pub commodity_overrides: BTreeMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            whitelist_enabled: false,
            whitelist: Vec::new(),
            landmark_countries: default_landmark_countries(),
            landmark_min_confidence: default_landmark_min_confidence(),
            commodity_cache_ttl_secs: default_commodity_cache_ttl_secs(),
            commodity_overrides: BTreeMap::new(),
        }
    }
}

impl AgentConfig {
    /// Whether the agent may run for `sender`.
    pub fn allows_sender(&self, sender: &str) -> bool {
        self.enabled && (!self.whitelist_enabled || self.whitelist.iter().any(|w| w == sender))
    }

    pub fn landmarks_enabled_for(&self, country: Country) -> bool {
        self.landmark_countries
            .iter()
            .any(|code| code.eq_ignore_ascii_case(country.code()))
    }
}

fn default_landmark_countries() -> Vec<String> {
    vec!["KE".to_string()]
}

fn default_landmark_min_confidence() -> f64 {
    0.85
}

fn default_commodity_cache_ttl_secs() -> u64 {
    300
}

/// Join flow configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JoinConfig {
    /// Open a registration task for every brand-new joiner.
    #[serde(default)]
    pub create_registration_task: bool,

    /// Introductory subscription months granted alongside free-month vouchers.
    #[serde(default = "default_intro_subscription_months")]
    pub intro_subscription_months: u32,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            create_registration_task: false,
            intro_subscription_months: default_intro_subscription_months(),
        }
    }
}

fn default_intro_subscription_months() -> u32 {
    1
}

/// Tenant values available to template placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
    /// Default sender identity for outgoing messages.
    #[serde(default = "default_sender_identity")]
    pub sender_identity: String,

    #[serde(default)]
    pub call_centre: Option<String>,

    #[serde(default)]
    pub shortcode: Option<String>,

    #[serde(default)]
    pub monthly_price: Option<String>,

    #[serde(default)]
    pub yearly_price: Option<String>,

    #[serde(default)]
    pub till_number: Option<String>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        Self {
            sender_identity: default_sender_identity(),
            call_centre: None,
            shortcode: None,
            monthly_price: None,
            yearly_price: None,
            till_number: None,
        }
    }
}

fn default_sender_identity() -> String {
    "SHAMBA".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operated_countries_parse_codes() {
        let countries = CountriesConfig {
            operated: vec!["KE".into(), " UG ".into(), "XX".into()],
        };
        assert_eq!(
            countries.operated_countries(),
            vec![Country::Kenya, Country::Uganda]
        );
        assert!(!countries.is_operated(Country::Zambia));
    }

    #[test]
    fn agent_whitelist_gates_senders() {
        let mut agent = AgentConfig {
            enabled: true,
            ..AgentConfig::default()
        };
        assert!(agent.allows_sender("+254700000001"));

        agent.whitelist_enabled = true;
        agent.whitelist = vec!["+254700000002".into()];
        assert!(!agent.allows_sender("+254700000001"));
        assert!(agent.allows_sender("+254700000002"));

        agent.enabled = false;
        assert!(!agent.allows_sender("+254700000002"));
    }

    #[test]
    fn landmarks_default_to_kenya() {
        let agent = AgentConfig::default();
        assert!(agent.landmarks_enabled_for(Country::Kenya));
        assert!(!agent.landmarks_enabled_for(Country::Zambia));
    }

    #[test]
    fn unparsable_default_language_falls_back() {
        let engine = EngineConfig {
            default_language: "klingon".into(),
            ..EngineConfig::default()
        };
        assert_eq!(engine.default_language(), Language::Eng);
    }
}
