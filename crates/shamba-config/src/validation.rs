// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as known country codes, sane page limits, and well-formed phone numbers.

use std::str::FromStr;

use shamba_core::{Country, Language};

use crate::diagnostic::ConfigError;
use crate::model::ShambaConfig;

/// Smallest page budget that still leaves room for a continuation suffix.
const MIN_PAGE_LIMIT: usize = 20;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ShambaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.countries.operated.is_empty() {
        errors.push(ConfigError::Validation {
            message: "countries.operated must list at least one country".to_string(),
        });
    }

    for code in &config.countries.operated {
        if Country::from_str(code.trim()).is_err() {
            errors.push(ConfigError::Validation {
                message: format!("countries.operated contains unknown country code `{code}`"),
            });
        }
    }

    for code in &config.agent.landmark_countries {
        if Country::from_str(code.trim()).is_err() {
            errors.push(ConfigError::Validation {
                message: format!("agent.landmark_countries contains unknown country code `{code}`"),
            });
        }
    }

    if Language::from_str(&config.engine.default_language).is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.default_language `{}` is not a supported language",
                config.engine.default_language
            ),
        });
    }

    if config.engine.duplicate_window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.duplicate_window_secs must be positive".to_string(),
        });
    }

    if config.engine.survey_lookback_days <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.survey_lookback_days must be positive, got {}",
                config.engine.survey_lookback_days
            ),
        });
    }

    if config.engine.data_request_lookback_days <= 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.data_request_lookback_days must be positive, got {}",
                config.engine.data_request_lookback_days
            ),
        });
    }

    if config.sms.page_limit < MIN_PAGE_LIMIT {
        errors.push(ConfigError::Validation {
            message: format!(
                "sms.page_limit must be at least {MIN_PAGE_LIMIT}, got {}",
                config.sms.page_limit
            ),
        });
    }

    if config.sms.max_pages == 0 {
        errors.push(ConfigError::Validation {
            message: "sms.max_pages must be at least 1".to_string(),
        });
    }

    let format = &config.sms.continuation_format;
    if !format.contains("{i}") || !format.contains("{n}") {
        errors.push(ConfigError::Validation {
            message: format!("sms.continuation_format `{format}` must contain both {{i}} and {{n}}"),
        });
    }

    for number in &config.agent.whitelist {
        let digits = number.strip_prefix('+').unwrap_or("");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            errors.push(ConfigError::Validation {
                message: format!("agent.whitelist entry `{number}` must look like +<digits>"),
            });
        }
    }

    if !(0.0..=1.0).contains(&config.agent.landmark_min_confidence) {
        errors.push(ConfigError::Validation {
            message: format!(
                "agent.landmark_min_confidence must be within 0.0..=1.0, got {}",
                config.agent.landmark_min_confidence
            ),
        });
    }

    if config.tenant.sender_identity.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "tenant.sender_identity must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = ShambaConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_country_fails_validation() {
        let mut config = ShambaConfig::default();
        config.countries.operated.push("TZ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "`TZ`"));
    }

    #[test]
    fn empty_operated_list_fails_validation() {
        let mut config = ShambaConfig::default();
        config.countries.operated.clear();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "at least one country"));
    }

    #[test]
    fn continuation_format_needs_both_markers() {
        let mut config = ShambaConfig::default();
        config.sms.continuation_format = " [{i}]".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "continuation_format"));
    }

    #[test]
    fn tiny_page_limit_fails_validation() {
        let mut config = ShambaConfig::default();
        config.sms.page_limit = 5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "sms.page_limit"));
    }

    #[test]
    fn malformed_whitelist_fails_validation() {
        let mut config = ShambaConfig::default();
        config.agent.whitelist = vec!["0712345678".to_string(), "+254712345678".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(has_error(&errors, "0712345678"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = ShambaConfig::default();
        config.engine.survey_lookback_days = 0;
        config.engine.data_request_lookback_days = -1;
        config.engine.default_language = "xx".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
