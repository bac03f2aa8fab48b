// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock signup agent with scripted extraction results.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shamba_core::{
    AdapterType, Country, ExtractionFailed, HealthStatus, PluginAdapter, ShambaError,
    SignupAgent, SignupExtraction,
};

type Scripted = Result<SignupExtraction, ExtractionFailed>;

/// A signup agent that answers each invocation with the next scripted result.
///
/// Once the script is exhausted every call fails with
/// [`ExtractionFailed::Unavailable`]. Invocations are recorded as
/// `(text, country)` pairs.
pub struct MockExtractor {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<(String, Country)>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<Scripted>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn push(&self, result: Scripted) {
        self.script.lock().await.push_back(result);
    }

    pub async fn calls(&self) -> Vec<(String, Country)> {
        self.calls.lock().await.clone()
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockExtractor {
    fn name(&self) -> &str {
        "mock-extractor"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SignupAgent for MockExtractor {
    async fn invoke(
        &self,
        text: &str,
        country: Country,
    ) -> Result<SignupExtraction, ExtractionFailed> {
        self.calls.lock().await.push((text.to_string(), country));
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(ExtractionFailed::Unavailable("script exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use shamba_core::UgandaSignup;

    use super::*;

    #[tokio::test]
    async fn plays_script_then_reports_unavailable() {
        let extractor = MockExtractor::with_script(vec![Ok(SignupExtraction::Uganda(
            UgandaSignup {
                name: Some("Nakato".into()),
                ..UgandaSignup::default()
            },
        ))]);

        let first = extractor.invoke("Nakato", Country::Uganda).await.unwrap();
        assert_eq!(first.country(), Country::Uganda);
        assert!(matches!(
            extractor.invoke("again", Country::Uganda).await,
            Err(ExtractionFailed::Unavailable(_))
        ));
        assert_eq!(extractor.calls().await.len(), 2);
    }
}
