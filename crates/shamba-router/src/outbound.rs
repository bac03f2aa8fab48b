// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building outgoing messages and handing them to the delivery collaborator.
//!
//! The contract ends at the hand-off: a persisted [`OutboundMessage`], one
//! queued [`DeliveryAttempt`] per recipient and page, and a [`Dispatch`]
//! accepted by the [`MessageSender`]. Delivery itself is not tracked here.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use shamba_config::model::SmsConfig;
use shamba_core::{
    CustomerId, DeliveryAttempt, DeliveryStatus, Dispatch, InboundId, MessageKind, MessageSender,
    MessageStore, OutboundId, OutboundMessage, SendOptions, ShambaError,
};
use shamba_text::{PageOptions, PaginationError, sanitize, split_into_pages};

use crate::metrics::{Anomaly, record_anomaly, record_response};

/// Pagination settings from the `[sms]` section.
pub fn page_options(config: &SmsConfig) -> PageOptions {
    PageOptions {
        limit: config.page_limit,
        paginate: config.paginate,
        continuation_format: config.continuation_format.clone(),
        max_pages: config.max_pages,
    }
}

fn pagination_error(err: PaginationError) -> ShambaError {
    match err {
        PaginationError::Charset(e) => ShambaError::InvalidCharacters { chars: e.0 },
        other => ShambaError::Internal(other.to_string()),
    }
}

/// One message to construct and hand off.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub recipients: Vec<CustomerId>,
    pub text: String,
    pub kind: MessageKind,
    pub in_reply_to: Option<InboundId>,
    pub metadata: BTreeMap<String, String>,
    /// Overrides the tenant's default sender identity.
    pub sender_identity: Option<String>,
    pub allow_international: bool,
}

impl OutboundRequest {
    pub fn reply(recipient: CustomerId, text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            recipients: vec![recipient],
            text: text.into(),
            kind,
            in_reply_to: None,
            metadata: BTreeMap::new(),
            sender_identity: None,
            allow_international: false,
        }
    }

    pub fn in_reply_to(mut self, inbound: InboundId) -> Self {
        self.in_reply_to = Some(inbound);
        self
    }

    pub fn from_sender(mut self, identity: Option<String>) -> Self {
        self.sender_identity = identity;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Persists outgoing messages and hands them to the delivery collaborator.
pub struct Responder<S: ?Sized> {
    store: Arc<S>,
    sender: Arc<dyn MessageSender>,
    pages: PageOptions,
    default_identity: String,
}

impl<S> Responder<S>
where
    S: MessageStore + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        sender: Arc<dyn MessageSender>,
        pages: PageOptions,
        default_identity: String,
    ) -> Self {
        Self {
            store,
            sender,
            pages,
            default_identity,
        }
    }

    /// Construct, persist and hand off `request`.
    ///
    /// Empty recipient lists and blank texts are caller bugs and fail with
    /// [`ShambaError::Contract`].
    pub async fn send(
        &self,
        request: OutboundRequest,
        now: DateTime<Utc>,
    ) -> Result<OutboundMessage, ShambaError> {
        if request.recipients.is_empty() {
            return Err(ShambaError::Contract(
                "outbound message needs at least one recipient".to_string(),
            ));
        }
        if request.text.trim().is_empty() {
            return Err(ShambaError::Contract(
                "outbound message text is empty".to_string(),
            ));
        }

        let sanitized = sanitize(&request.text);
        if !sanitized.removed.is_empty() {
            record_anomaly(
                Anomaly::InvalidCharacters,
                &format!("dropped unencodable characters {:?}", sanitized.removed),
            );
        }
        let pages = split_into_pages(&sanitized.text, &self.pages).map_err(pagination_error)?;
        let page_count = u16::try_from(pages.len())
            .map_err(|_| ShambaError::Internal(format!("{} pages", pages.len())))?;

        let mut message = OutboundMessage {
            id: OutboundId::new(),
            text: sanitized.text.trim().to_string(),
            kind: request.kind,
            in_reply_to: request.in_reply_to,
            metadata: request.metadata,
            created_at: now,
            sent_at: None,
        };
        self.store.save_outbound(&message).await?;

        let identity = request
            .sender_identity
            .unwrap_or_else(|| self.default_identity.clone());
        for recipient in &request.recipients {
            for page_index in 0..page_count {
                self.store
                    .record_attempt(&DeliveryAttempt {
                        message: message.id,
                        recipient: *recipient,
                        sender: identity.clone(),
                        page_index,
                        status: DeliveryStatus::Queued,
                        failure_reason: None,
                        cost: None,
                    })
                    .await?;
            }
        }

        let dispatch = Dispatch {
            message: message.id,
            recipients: request.recipients,
            sender_identity: identity,
            options: SendOptions {
                allow_international: request.allow_international,
                pages: page_count,
            },
        };
        if let Err(e) = self.sender.send(dispatch).await {
            let reason = e.to_string();
            error!(message_id = %message.id, "hand-off to delivery failed: {reason}");
            self.store
                .update_attempts(message.id, DeliveryStatus::Failed, Some(reason.clone()))
                .await?;
            record_anomaly(Anomaly::DeliveryFailed, &reason);
            return Err(ShambaError::Delivery {
                message: reason,
                source: Some(Box::new(e)),
            });
        }

        message.sent_at = Some(now);
        self.store.save_outbound(&message).await?;
        record_response(message.kind);
        debug!(message_id = %message.id, kind = %message.kind, pages = page_count, "message handed off");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use shamba_core::{AdapterType, HealthStatus, PluginAdapter};
    use shamba_storage::MemoryStore;
    use tokio::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSender {
        fail: bool,
        dispatches: Mutex<Vec<Dispatch>>,
    }

    #[async_trait]
    impl PluginAdapter for RecordingSender {
        fn name(&self) -> &str {
            "recording"
        }
        fn version(&self) -> semver::Version {
            semver::Version::new(0, 0, 1)
        }
        fn adapter_type(&self) -> AdapterType {
            AdapterType::Sender
        }
        async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
            Ok(HealthStatus::Healthy)
        }
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send(&self, dispatch: Dispatch) -> Result<(), ShambaError> {
            if self.fail {
                return Err(ShambaError::Internal("gateway down".into()));
            }
            self.dispatches.lock().await.push(dispatch);
            Ok(())
        }
    }

    fn responder(
        sender: Arc<RecordingSender>,
        limit: usize,
    ) -> (Arc<MemoryStore>, Responder<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let pages = PageOptions {
            limit,
            ..PageOptions::default()
        };
        let responder = Responder::new(Arc::clone(&store), sender, pages, "21606".into());
        (store, responder)
    }

    #[tokio::test]
    async fn records_one_attempt_per_recipient_and_page() {
        let sender = Arc::new(RecordingSender::default());
        let (store, responder) = responder(Arc::clone(&sender), 30);
        let first = CustomerId::new();
        let second = CustomerId::new();
        let mut request = OutboundRequest::reply(
            first,
            "Plant maize after the first good rains",
            MessageKind::Tip,
        );
        request.recipients.push(second);

        let message = responder.send(request, Utc::now()).await.unwrap();
        assert!(message.sent_at.is_some());
        let attempts = store.attempts_for(message.id);
        assert_eq!(attempts.len(), 4);
        assert!(attempts.iter().all(|a| a.status == DeliveryStatus::Queued));

        let dispatches = sender.dispatches.lock().await;
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].options.pages, 2);
        assert_eq!(dispatches[0].sender_identity, "21606");
    }

    #[tokio::test]
    async fn unencodable_characters_are_dropped() {
        let sender = Arc::new(RecordingSender::default());
        let (_, responder) = responder(sender, 160);
        let message = responder
            .send(
                OutboundRequest::reply(CustomerId::new(), "Karibu \u{1F33D}", MessageKind::Join),
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(message.text, "Karibu");
    }

    #[tokio::test]
    async fn failed_hand_off_marks_attempts_failed() {
        let sender = Arc::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let (store, responder) = responder(sender, 160);
        let err = responder
            .send(
                OutboundRequest::reply(CustomerId::new(), "Welcome", MessageKind::Join),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShambaError::Delivery { .. }));

        let message = store.all_outbound().pop().unwrap();
        assert!(message.sent_at.is_none());
        let attempts = store.attempts_for(message.id);
        assert_eq!(attempts[0].status, DeliveryStatus::Failed);
        assert!(attempts[0].failure_reason.as_deref().unwrap().contains("gateway down"));
    }

    #[tokio::test]
    async fn empty_recipients_or_text_are_contract_violations() {
        let sender = Arc::new(RecordingSender::default());
        let (_, responder) = responder(sender, 160);
        let mut request = OutboundRequest::reply(CustomerId::new(), "hi", MessageKind::Bulk);
        request.recipients.clear();
        assert!(responder.send(request, Utc::now()).await.unwrap_err().is_contract_violation());

        let request = OutboundRequest::reply(CustomerId::new(), "   ", MessageKind::Bulk);
        assert!(responder.send(request, Utc::now()).await.unwrap_err().is_contract_violation());
    }
}
