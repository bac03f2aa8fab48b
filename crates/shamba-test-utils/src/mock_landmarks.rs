// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Landmark matcher backed by a fixed table.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use shamba_core::{
    AdapterType, BorderId, Country, HealthStatus, LandmarkMatch, LandmarkMatcher, PluginAdapter,
    ShambaError,
};

/// Resolves landmarks by case-insensitive exact lookup.
///
/// Unknown landmarks resolve to `None`. Lookups are recorded together with
/// the level-1 region they were scoped to.
#[derive(Default)]
pub struct MockLandmarks {
    table: HashMap<String, LandmarkMatch>,
    lookups: Mutex<Vec<(String, Country, BorderId)>>,
}

impl MockLandmarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, landmark: &str, border: BorderId, confidence: f64) -> Self {
        self.table
            .insert(landmark.to_lowercase(), LandmarkMatch { border, confidence });
        self
    }

    pub async fn lookups(&self) -> Vec<(String, Country, BorderId)> {
        self.lookups.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockLandmarks {
    fn name(&self) -> &str {
        "mock-landmarks"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Landmarks
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LandmarkMatcher for MockLandmarks {
    async fn locate(
        &self,
        landmark: &str,
        country: Country,
        level1: BorderId,
    ) -> Result<Option<LandmarkMatch>, ShambaError> {
        self.lookups
            .lock()
            .await
            .push((landmark.to_string(), country, level1));
        Ok(self.table.get(&landmark.trim().to_lowercase()).copied())
    }
}
