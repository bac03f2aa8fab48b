// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS sender for capturing outbound dispatches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use shamba_core::{AdapterType, Dispatch, HealthStatus, MessageSender, PluginAdapter, ShambaError};

/// A sender that records every dispatch it accepts.
///
/// Calling [`MockSender::set_failing`] makes it reject dispatches with a
/// [`ShambaError::Delivery`], the way an unreachable gateway would.
pub struct MockSender {
    dispatches: Arc<Mutex<Vec<Dispatch>>>,
    failing: AtomicBool,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            dispatches: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// Reject (or accept again) all further dispatches.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get all accepted dispatches, oldest first.
    pub async fn dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.dispatches.lock().await.len()
    }

    pub async fn clear(&self) {
        self.dispatches.lock().await.clear();
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockSender {
    fn name(&self) -> &str {
        "mock-sender"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        if self.failing.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("gateway unreachable".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[async_trait]
impl MessageSender for MockSender {
    async fn send(&self, dispatch: Dispatch) -> Result<(), ShambaError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShambaError::Delivery {
                message: format!("gateway rejected message {}", dispatch.message),
                source: None,
            });
        }
        self.dispatches.lock().await.push(dispatch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shamba_core::{CustomerId, OutboundId, SendOptions};

    use super::*;

    fn dispatch() -> Dispatch {
        Dispatch {
            message: OutboundId::new(),
            recipients: vec![CustomerId::new()],
            sender_identity: "21606".to_string(),
            options: SendOptions::default(),
        }
    }

    #[tokio::test]
    async fn captures_dispatches() {
        let sender = MockSender::new();
        sender.send(dispatch()).await.unwrap();
        sender.send(dispatch()).await.unwrap();
        assert_eq!(sender.sent_count().await, 2);

        sender.clear().await;
        assert_eq!(sender.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failing_sender_rejects_and_reports_unhealthy() {
        let sender = MockSender::new();
        sender.set_failing(true);

        let err = sender.send(dispatch()).await.unwrap_err();
        assert!(matches!(err, ShambaError::Delivery { .. }));
        assert_eq!(sender.sent_count().await, 0);
        assert!(matches!(
            sender.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}
