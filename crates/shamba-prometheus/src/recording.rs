// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric descriptions for everything the engine records.
//!
//! The engine records through the metrics-rs facade; this module only
//! describes the series so the exporter can emit HELP lines.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Inbound messages, labelled by the terminal branch they ended in.
pub const SMS_PROCESSED: &str = "shamba_sms_processed_total";
/// Human tasks, labelled by reason.
pub const TASKS_CREATED: &str = "shamba_tasks_created_total";
/// Outgoing messages handed to the delivery collaborator, labelled by kind.
pub const RESPONSES_SENT: &str = "shamba_responses_sent_total";
/// Recovered anomalies, labelled by kind.
pub const ANOMALIES: &str = "shamba_anomalies_total";
pub const PROCESSING_SECONDS: &str = "shamba_processing_seconds";
pub const KNOWN_CUSTOMERS: &str = "shamba_known_customers";

/// Register all Shamba metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(SMS_PROCESSED, "Inbound messages processed, by terminal branch");
    describe_counter!(TASKS_CREATED, "Human tasks created, by reason");
    describe_counter!(RESPONSES_SENT, "Outgoing messages handed off, by kind");
    describe_counter!(ANOMALIES, "Recovered anomalies, by kind");
    describe_histogram!(
        PROCESSING_SECONDS,
        "Time to run one inbound message to its terminal branch"
    );
    describe_gauge!(KNOWN_CUSTOMERS, "Customers held by the store");
}

/// Set the number of customers currently known to the store.
pub fn set_known_customers(count: usize) {
    metrics::gauge!(KNOWN_CUSTOMERS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use metrics_exporter_prometheus::PrometheusBuilder;

    use super::*;

    #[test]
    fn described_series_render_with_help() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            register_metrics();
            metrics::counter!(ANOMALIES, "kind" => "missing_template").increment(2);
            set_known_customers(7);
        });

        let rendered = handle.render();
        assert!(rendered.contains("# HELP shamba_anomalies_total Recovered anomalies, by kind"));
        assert!(rendered.contains("shamba_anomalies_total{kind=\"missing_template\"} 2"));
        assert!(rendered.contains("shamba_known_customers 7"));
    }
}
