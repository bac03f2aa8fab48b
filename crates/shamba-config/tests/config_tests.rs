// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Shamba configuration system.

use shamba_config::diagnostic::ConfigError;
use shamba_config::model::ShambaConfig;
use shamba_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use shamba_core::Country;

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_shamba_config() {
    let toml = r#"
[engine]
duplicate_window_secs = 120
survey_lookback_days = 2
default_language = "swa"

[countries]
operated = ["KE", "UG"]

[sms]
page_limit = 150
paginate = false

[agent]
enabled = true
whitelist_enabled = true
whitelist = ["+254700000001"]

[agent.commodity_overrides]
"ng'ombe" = "Dairy Cattle"

[join]
create_registration_task = true
intro_subscription_months = 2

[tenant]
sender_identity = "FARMERS"
call_centre = "0800 123 456"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.engine.duplicate_window_secs, 120);
    assert_eq!(config.engine.survey_lookback_days, 2);
    assert_eq!(config.engine.data_request_lookback_days, 3);
    assert_eq!(config.countries.operated_countries(), vec![Country::Kenya, Country::Uganda]);
    assert_eq!(config.sms.page_limit, 150);
    assert!(!config.sms.paginate);
    assert!(config.agent.enabled);
    assert!(config.agent.allows_sender("+254700000001"));
    assert_eq!(
        config.agent.commodity_overrides.get("ng'ombe").map(String::as_str),
        Some("Dairy Cattle")
    );
    assert!(config.join.create_registration_task);
    assert_eq!(config.join.intro_subscription_months, 2);
    assert_eq!(config.tenant.sender_identity, "FARMERS");
    assert_eq!(config.tenant.call_centre.as_deref(), Some("0800 123 456"));
}

/// Unknown field in [engine] is rejected.
#[test]
fn unknown_field_in_engine_produces_error() {
    let toml = r#"
[engine]
duplicate_windw_secs = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("duplicate_windw_secs"),
        "error should mention the bad key, got: {err_str}"
    );
}

/// Unknown keys come back as diagnostics with a suggestion.
#[test]
fn unknown_key_diagnostic_carries_suggestion() {
    let errors = load_and_validate_str("[sms]\npage_limt = 100\n").expect_err("should fail");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::UnknownKey { suggestion: Some(s), .. } if s == "page_limit"
    )));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.engine.duplicate_window_secs, 300);
    assert_eq!(config.engine.survey_lookback_days, 3);
    assert_eq!(config.engine.nps_max_reply_len, 10);
    assert_eq!(config.countries.operated, vec!["KE", "UG", "ZM"]);
    assert_eq!(config.sms.page_limit, 160);
    assert_eq!(config.sms.continuation_format, " ({i}/{n})");
    assert!(!config.agent.enabled);
    assert_eq!(config.agent.landmark_min_confidence, 0.85);
    assert!(!config.join.create_registration_task);
    assert_eq!(config.tenant.sender_identity, "SHAMBA");
}

/// A dotted override (how env vars land after key mapping) wins over TOML.
#[test]
fn dotted_override_wins_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: ShambaConfig = Figment::new()
        .merge(Serialized::defaults(ShambaConfig::default()))
        .merge(Toml::string("[engine]\nduplicate_window_secs = 60\n"))
        .merge(("engine.duplicate_window_secs", 30))
        .extract()
        .expect("should merge override");

    assert_eq!(config.engine.duplicate_window_secs, 30);
}

/// Semantic validation runs after deserialization.
#[test]
fn validation_errors_surface_through_load_and_validate() {
    let errors = load_and_validate_str("[countries]\noperated = [\"KE\", \"TZ\"]\n")
        .expect_err("TZ is not operated");
    assert!(errors
        .iter()
        .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("TZ"))));
}

/// Wrong value types are reported as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let errors =
        load_and_validate_str("[sms]\npage_limit = \"lots\"\n").expect_err("should fail");
    assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidType { .. })));
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let err = load_config_from_str("[storage]\npath = \"x\"\n")
        .expect_err("unknown top-level section should be rejected");
    assert!(format!("{err}").contains("storage"));
}

/// A config file on disk loads through the explicit path loader.
#[test]
fn loads_from_explicit_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shamba.toml");
    std::fs::write(&path, "[tenant]\nshortcode = \"21606\"\n").expect("write config");

    let config = load_and_validate_path(&path).expect("config should load");
    assert_eq!(config.tenant.shortcode.as_deref(), Some("21606"));
}
