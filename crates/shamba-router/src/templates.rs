// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Localized template text with a language fallback chain.

use shamba_core::{Language, ResponseTemplate};

use crate::metrics::{Anomaly, record_anomaly};

/// Template names the engine's built-in flows look up.
pub mod names {
    pub const EMPTY: &str = "empty";
    pub const JOIN: &str = "join";
    pub const JOIN_NEW: &str = "join_new";
    pub const JOIN_REJOIN: &str = "join_rejoin";
    pub const JOIN_EXISTING: &str = "join_existing";
    pub const STOP_CONFIRMED: &str = "stop_confirmed";
    pub const STOP_ALREADY: &str = "stop_already";
    pub const VOUCHER_EXPIRED: &str = "voucher_expired";
    pub const VOUCHER_USED: &str = "voucher_used";
    pub const VOUCHER_USED_BY_YOU: &str = "voucher_used_by_you";
    pub const VOUCHER_DISCOUNT: &str = "voucher_discount";
    pub const VOUCHER_FREE_MONTHS: &str = "voucher_free_months";
    pub const SIGNUP_COMPLETE: &str = "signup_complete";
    pub const SIGNUP_PARTIAL: &str = "signup_partial";
}

/// Text of `template` in `requested`, else `default`, else any translation.
///
/// Each step down the chain is recorded as an anomaly. `None` only when the
/// template has no translations at all.
pub fn localized_text(
    template: &ResponseTemplate,
    requested: Language,
    default: Language,
) -> Option<(Language, String)> {
    if let Some(text) = template.translations.get(&requested) {
        return Some((requested, text.clone()));
    }

    if let Some(text) = template.translations.get(&default) {
        record_anomaly(
            Anomaly::LanguageFallback,
            &format!(
                "template `{}` has no {requested} text, using default {default}",
                template.name
            ),
        );
        return Some((default, text.clone()));
    }

    match template.translations.iter().next() {
        Some((language, text)) => {
            record_anomaly(
                Anomaly::LanguageFallback,
                &format!(
                    "template `{}` has neither {requested} nor {default} text, using {language}",
                    template.name
                ),
            );
            Some((*language, text.clone()))
        }
        None => {
            record_anomaly(
                Anomaly::MissingTranslation,
                &format!("template `{}` has no text in any language", template.name),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use shamba_core::{TemplateAction, TemplateId};
    use tracing_test::traced_test;

    use super::*;

    fn template(translations: &[(Language, &str)]) -> ResponseTemplate {
        ResponseTemplate {
            id: TemplateId::new(),
            name: "join_new".into(),
            translations: translations
                .iter()
                .map(|(l, t)| (*l, t.to_string()))
                .collect::<BTreeMap<_, _>>(),
            sender: None,
            action: TemplateAction::JoinCustomer,
            assign_category: None,
            all_countries: true,
            countries: vec![],
            protected: true,
        }
    }

    #[test]
    fn requested_language_wins() {
        let t = template(&[(Language::Eng, "Welcome"), (Language::Swa, "Karibu")]);
        assert_eq!(
            localized_text(&t, Language::Swa, Language::Eng),
            Some((Language::Swa, "Karibu".into()))
        );
    }

    #[traced_test]
    #[test]
    fn falls_back_to_default_then_any() {
        let t = template(&[(Language::Eng, "Welcome")]);
        assert_eq!(
            localized_text(&t, Language::Lug, Language::Eng),
            Some((Language::Eng, "Welcome".into()))
        );
        assert!(logs_contain("has no lug text"));

        let t = template(&[(Language::Nya, "Mwalandilidwa")]);
        assert_eq!(
            localized_text(&t, Language::Swa, Language::Eng),
            Some((Language::Nya, "Mwalandilidwa".into()))
        );
        assert!(logs_contain("neither swa nor eng"));
    }

    #[traced_test]
    #[test]
    fn no_translations_is_none() {
        assert_eq!(localized_text(&template(&[]), Language::Eng, Language::Eng), None);
        assert!(logs_contain("no text in any language"));
    }
}
