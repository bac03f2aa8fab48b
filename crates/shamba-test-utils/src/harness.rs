// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles an [`Engine`] over an in-memory store seeded from a
//! JSON catalog, with mock collaborators for delivery, extraction and landmark
//! lookup. [`TestHarness::send`] drives one SMS through the full pipeline.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use shamba_agent::PromptedSignupAgent;
use shamba_config::ShambaConfig;
use shamba_core::{
    BorderId, BorderLevel, CatalogStore, Country, Customer, CustomerStore, ExtractionFailed,
    OutboundMessage, ShambaError, SignupExtraction, Store, Task,
};
use shamba_router::{Engine, Outcome};
use shamba_storage::{Catalog, MemoryStore};

use crate::mock_completion::MockCompletion;
use crate::mock_extractor::MockExtractor;
use crate::mock_landmarks::MockLandmarks;
use crate::mock_sender::MockSender;

/// Templates, keywords, regions and customers for Kenya, Uganda and Zambia.
pub const FIXTURE_CATALOG: &str = include_str!("../fixtures/catalog.json");

/// Shortcode every harness message is addressed to.
pub const SHORTCODE: &str = "21606";

/// A fixed point in the test calendar: `day` March 2026, UTC.
pub fn march(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0)
        .single()
        .expect("valid test timestamp")
}

enum AgentScript {
    Completions(Vec<String>),
    Extractions(Vec<Result<SignupExtraction, ExtractionFailed>>),
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    config: ShambaConfig,
    catalog: String,
    agent: Option<AgentScript>,
    landmarks: Vec<(String, Country, String, f64)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = ShambaConfig::default();
        config.tenant.sender_identity = SHORTCODE.to_string();
        config.tenant.shortcode = Some(SHORTCODE.to_string());
        config.tenant.call_centre = Some("0800 720 000".to_string());
        config.tenant.monthly_price = Some("KSh 100".to_string());
        config.tenant.yearly_price = Some("KSh 1,000".to_string());
        config.tenant.till_number = Some("512345".to_string());
        Self {
            config,
            catalog: FIXTURE_CATALOG.to_string(),
            agent: None,
            landmarks: Vec::new(),
        }
    }

    /// Adjust the engine configuration.
    pub fn with_config(mut self, adjust: impl FnOnce(&mut ShambaConfig)) -> Self {
        adjust(&mut self.config);
        self
    }

    /// Replace the fixture catalog.
    pub fn with_catalog(mut self, json: impl Into<String>) -> Self {
        self.catalog = json.into();
        self
    }

    /// Enable the prompted signup agent, answering its prompts with `replies`.
    pub fn with_agent_replies(mut self, replies: Vec<String>) -> Self {
        self.config.agent.enabled = true;
        self.agent = Some(AgentScript::Completions(replies));
        self
    }

    /// Enable a signup agent that returns `script` in order.
    pub fn with_extractions(
        mut self,
        script: Vec<Result<SignupExtraction, ExtractionFailed>>,
    ) -> Self {
        self.config.agent.enabled = true;
        self.agent = Some(AgentScript::Extractions(script));
        self
    }

    /// Resolve `landmark` to the level-3 region named `ward`.
    pub fn with_landmark(
        mut self,
        landmark: &str,
        country: Country,
        ward: &str,
        confidence: f64,
    ) -> Self {
        self.landmarks
            .push((landmark.to_string(), country, ward.to_string(), confidence));
        self
    }

    /// Build the test harness, seeding the store from the catalog.
    pub async fn build(self) -> Result<TestHarness, ShambaError> {
        let store = Arc::new(Catalog::from_json(&self.catalog)?.into_store().await?);
        let sender = Arc::new(MockSender::new());
        let completion = Arc::new(MockCompletion::new());
        let extractor = Arc::new(MockExtractor::new());

        let mut landmarks = MockLandmarks::new();
        for (landmark, country, ward, confidence) in &self.landmarks {
            let border = border_named(&store, *country, BorderLevel::Level3, ward)
                .await?
                .ok_or_else(|| ShambaError::NotFound {
                    entity: "border",
                    id: ward.clone(),
                })?;
            landmarks = landmarks.with(landmark, border, *confidence);
        }

        let dyn_store: Arc<dyn Store> = store.clone();
        let mut engine = Engine::new(self.config, dyn_store, sender.clone());
        match self.agent {
            Some(AgentScript::Completions(replies)) => {
                for reply in replies {
                    completion.add_reply(reply).await;
                }
                engine = engine.with_agent(Arc::new(PromptedSignupAgent::new(completion.clone())));
            }
            Some(AgentScript::Extractions(script)) => {
                for result in script {
                    extractor.push(result).await;
                }
                engine = engine.with_agent(extractor.clone());
            }
            None => {}
        }
        if !self.landmarks.is_empty() {
            engine = engine.with_landmarks(Arc::new(landmarks));
        }

        tracing::debug!(customers = store.customer_count(), "test harness ready");
        Ok(TestHarness {
            engine,
            store,
            sender,
            completion,
            extractor,
        })
    }
}

/// An engine wired to in-memory collaborators.
pub struct TestHarness {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub sender: Arc<MockSender>,
    pub completion: Arc<MockCompletion>,
    pub extractor: Arc<MockExtractor>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with the default configuration and no signup agent.
    pub async fn new() -> Result<Self, ShambaError> {
        Self::builder().build().await
    }

    /// Receive `text` from `phone` at `at` and run it through the engine.
    pub async fn send(
        &self,
        phone: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Outcome, ShambaError> {
        self.engine.receive(phone, SHORTCODE, text, at).await
    }

    pub async fn customer(&self, phone: &str) -> Result<Option<Customer>, ShambaError> {
        self.store.customer_by_phone(phone).await
    }

    /// Text of the reply an outcome produced, if any.
    pub fn response_text(&self, outcome: &Outcome) -> Option<String> {
        outcome
            .response
            .and_then(|id| self.store.outbound_message(id))
            .map(|m| m.text)
    }

    /// The task an outcome created, if any.
    pub fn task(&self, outcome: &Outcome) -> Option<Task> {
        let id = outcome.task?;
        self.store.all_tasks().into_iter().find(|t| t.id == id)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.all_tasks()
    }

    pub fn outbound(&self) -> Vec<OutboundMessage> {
        self.store.all_outbound()
    }

    pub async fn border(
        &self,
        country: Country,
        level: BorderLevel,
        name: &str,
    ) -> Result<Option<BorderId>, ShambaError> {
        border_named(&self.store, country, level, name).await
    }
}

async fn border_named(
    store: &MemoryStore,
    country: Country,
    level: BorderLevel,
    name: &str,
) -> Result<Option<BorderId>, ShambaError> {
    Ok(store
        .borders(country, level)
        .await?
        .into_iter()
        .find(|b| b.name.eq_ignore_ascii_case(name))
        .map(|b| b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_catalog_loads_all_countries() {
        let harness = TestHarness::new().await.unwrap();
        for country in Country::ALL {
            let roots = harness.store.borders(country, BorderLevel::Country).await.unwrap();
            assert_eq!(roots.len(), 1, "{country}");
        }
        assert_eq!(harness.store.customer_count(), 3);
    }

    #[tokio::test]
    async fn unknown_landmark_ward_fails_the_build() {
        let result = TestHarness::builder()
            .with_landmark("Kagwe market", Country::Kenya, "Atlantis", 0.9)
            .build()
            .await;
        assert!(matches!(result, Err(ShambaError::NotFound { entity: "border", .. })));
    }

    #[tokio::test]
    async fn send_records_inbound_and_replies() {
        let harness = TestHarness::new().await.unwrap();
        let outcome = harness.send("+254722333444", "JOIN", march(10, 8, 0)).await.unwrap();
        assert!(outcome.customer_created);
        assert!(harness.response_text(&outcome).is_some());
        assert_eq!(harness.sender.sent_count().await, 1);
    }
}
