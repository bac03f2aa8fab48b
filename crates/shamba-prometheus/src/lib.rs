// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics recorder for the Shamba SMS engine.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered in Prometheus text format via [`PrometheusAdapter::render`].

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use shamba_core::{AdapterType, HealthStatus, PluginAdapter, ShambaError};

pub use recording::{register_metrics, set_known_customers};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Install the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, ShambaError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            ShambaError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wrap an existing handle, e.g. one from a locally scoped recorder.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_adapter() -> (PrometheusAdapter, metrics_exporter_prometheus::PrometheusRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        (PrometheusAdapter::from_handle(recorder.handle()), recorder)
    }

    #[tokio::test]
    async fn adapter_identity_and_health() {
        let (adapter, _recorder) = local_adapter();
        assert_eq!(adapter.name(), "prometheus");
        assert_eq!(adapter.adapter_type(), AdapterType::Observability);
        assert_eq!(adapter.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn renders_engine_counters() {
        let (adapter, recorder) = local_adapter();
        metrics::with_local_recorder(&recorder, || {
            metrics::counter!(recording::SMS_PROCESSED, "branch" => "vanilla").increment(1);
            metrics::counter!(recording::TASKS_CREATED, "reason" => "vanilla_request").increment(1);
            metrics::histogram!(recording::PROCESSING_SECONDS).record(0.02);
        });

        let rendered = adapter.render();
        assert!(rendered.contains("shamba_sms_processed_total{branch=\"vanilla\"} 1"));
        assert!(rendered.contains("shamba_tasks_created_total{reason=\"vanilla_request\"} 1"));
        assert!(rendered.contains("shamba_processing_seconds"));
    }
}
