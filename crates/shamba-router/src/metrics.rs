// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counters and anomaly capture for the dispatch engine.
//!
//! Uses the metrics-rs facade; the binary installs a Prometheus recorder, and
//! without one every call here is a no-op.

use strum::{Display, IntoStaticStr};
use tracing::warn;

use shamba_core::{MessageKind, TaskReason};

use crate::action::Branch;

/// A recoverable condition worth an operator's attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Anomaly {
    MissingTemplate,
    MissingTranslation,
    LanguageFallback,
    KeywordConflict,
    UnresolvedPlaceholder,
    ExtractionFailed,
    InvalidCharacters,
    RegionConflict,
    DeliveryFailed,
    EffectRejected,
    ProcessingFailure,
}

/// Log `detail` at warn level and count it under `kind`.
pub fn record_anomaly(kind: Anomaly, detail: &str) {
    warn!(anomaly = %kind, "{detail}");
    let label: &'static str = kind.into();
    metrics::counter!("shamba_anomalies_total", "kind" => label).increment(1);
}

pub fn record_processed(branch: Branch) {
    let label: &'static str = branch.into();
    metrics::counter!("shamba_sms_processed_total", "branch" => label).increment(1);
}

pub fn record_task(reason: TaskReason) {
    metrics::counter!("shamba_tasks_created_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_response(kind: MessageKind) {
    metrics::counter!("shamba_responses_sent_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_processing_time(seconds: f64) {
    metrics::histogram!("shamba_processing_seconds").record(seconds);
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn anomaly_labels_are_snake_case() {
        assert_eq!(Anomaly::LanguageFallback.to_string(), "language_fallback");
        let label: &'static str = Anomaly::MissingTemplate.into();
        assert_eq!(label, "missing_template");
    }

    #[traced_test]
    #[test]
    fn anomalies_are_logged() {
        record_anomaly(Anomaly::KeywordConflict, "keyword JOIN has 2 templates in KE");
        assert!(logs_contain("keyword JOIN has 2 templates in KE"));
        assert!(logs_contain("keyword_conflict"));
    }
}
