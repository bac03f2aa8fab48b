// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent in-memory implementation of the store traits.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shamba_core::{
    AdapterType, Border, BorderId, BorderLevel, CatalogStore, Commodity, CommodityId, Country,
    Customer, CustomerId, CustomerStore, DeliveryAttempt, DeliveryStatus, HealthStatus,
    InboundId, InboundMessage, Keyword, KeywordId, MessageKind, MessageStore, NpsResponse,
    OutboundId, OutboundMessage, PluginAdapter, ResponseTemplate, ShambaError, Task, TaskId,
    TaskStore, TemplateId, Voucher,
};

/// Subscription tier; only premium and freemium count as paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Premium,
    Freemium,
    Free,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub tier: SubscriptionTier,
    pub ends_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_paid_at(&self, at: DateTime<Utc>) -> bool {
        self.tier != SubscriptionTier::Free && self.ends_at > at
    }
}

/// Insertion sequence, used to order records that share a timestamp.
type Seq = u64;

/// Key of a delivery attempt: one row per (recipient, message, page).
type AttemptKey = (CustomerId, OutboundId, u16);

/// In-memory store backed by sharded concurrent maps.
///
/// Every map is independently locked, so concurrent dispatches for different
/// customers never contend on a single lock.
#[derive(Default)]
pub struct MemoryStore {
    seq: AtomicU64,
    customers: DashMap<CustomerId, Customer>,
    phones: DashMap<String, CustomerId>,
    subscriptions: DashMap<CustomerId, Subscription>,
    inbound: DashMap<InboundId, (Seq, InboundMessage)>,
    outbound: DashMap<OutboundId, (Seq, OutboundMessage)>,
    attempts: DashMap<AttemptKey, DeliveryAttempt>,
    nps: DashMap<InboundId, NpsResponse>,
    keywords: DashMap<KeywordId, Keyword>,
    templates: DashMap<TemplateId, ResponseTemplate>,
    vouchers: DashMap<String, Voucher>,
    borders: DashMap<BorderId, Border>,
    commodities: DashMap<CommodityId, Commodity>,
    tasks: DashMap<TaskId, (Seq, Task)>,
}

fn voucher_key(code: &str) -> String {
    code.trim().to_uppercase()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> Seq {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn insert_keyword(&self, keyword: Keyword) {
        self.keywords.insert(keyword.id, keyword);
    }

    pub fn insert_template(&self, template: ResponseTemplate) {
        self.templates.insert(template.id, template);
    }

    pub fn insert_border(&self, border: Border) {
        self.borders.insert(border.id, border);
    }

    pub fn insert_commodity(&self, commodity: Commodity) {
        self.commodities.insert(commodity.id, commodity);
    }

    pub fn insert_voucher(&self, voucher: Voucher) {
        self.vouchers.insert(voucher_key(&voucher.code), voucher);
    }

    pub fn set_subscription(&self, customer: CustomerId, subscription: Subscription) {
        self.subscriptions.insert(customer, subscription);
    }

    pub fn subscription(&self, customer: CustomerId) -> Option<Subscription> {
        self.subscriptions.get(&customer).map(|s| s.clone())
    }

    /// Every task, oldest first.
    pub fn all_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<(Seq, Task)> = self.tasks.iter().map(|e| e.value().clone()).collect();
        tasks.sort_by_key(|(seq, task)| (task.created_at, *seq));
        tasks.into_iter().map(|(_, task)| task).collect()
    }

    /// Every outbound message, oldest first.
    pub fn all_outbound(&self) -> Vec<OutboundMessage> {
        let mut messages: Vec<(Seq, OutboundMessage)> =
            self.outbound.iter().map(|e| e.value().clone()).collect();
        messages.sort_by_key(|(seq, m)| (m.created_at, *seq));
        messages.into_iter().map(|(_, m)| m).collect()
    }

    pub fn outbound_message(&self, id: OutboundId) -> Option<OutboundMessage> {
        self.outbound.get(&id).map(|e| e.value().1.clone())
    }

    pub fn inbound_message(&self, id: InboundId) -> Option<InboundMessage> {
        self.inbound.get(&id).map(|e| e.value().1.clone())
    }

    /// Delivery attempts for `message`, by recipient then page.
    pub fn attempts_for(&self, message: OutboundId) -> Vec<DeliveryAttempt> {
        let mut attempts: Vec<DeliveryAttempt> = self
            .attempts
            .iter()
            .filter(|e| e.key().1 == message)
            .map(|e| e.value().clone())
            .collect();
        attempts.sort_by_key(|a| (a.recipient, a.page_index));
        attempts
    }

    pub fn nps_responses(&self) -> Vec<NpsResponse> {
        let mut responses: Vec<NpsResponse> = self.nps.iter().map(|e| e.value().clone()).collect();
        responses.sort_by_key(|r| r.recorded_at);
        responses
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Outbound messages with at least one attempt addressed to `customer`.
    fn outbound_for(&self, customer: CustomerId) -> Vec<(Seq, OutboundMessage)> {
        let mut ids: Vec<OutboundId> = self
            .attempts
            .iter()
            .filter(|e| e.key().0 == customer)
            .map(|e| e.key().1)
            .collect();
        ids.sort();
        ids.dedup();
        let mut messages: Vec<(Seq, OutboundMessage)> = ids
            .into_iter()
            .filter_map(|id| self.outbound.get(&id).map(|e| e.value().clone()))
            .collect();
        messages.sort_by_key(|(seq, m)| (m.created_at, *seq));
        messages
    }
}

#[async_trait]
impl PluginAdapter for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Store
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CustomerStore for MemoryStore {
    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, ShambaError> {
        Ok(self.customers.get(&id).map(|c| c.clone()))
    }

    async fn customer_by_phone(&self, number: &str) -> Result<Option<Customer>, ShambaError> {
        let Some(id) = self.phones.get(number.trim()).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.customers.get(&id).map(|c| c.clone()))
    }

    async fn save_customer(&self, customer: &Customer) -> Result<(), ShambaError> {
        for phone in &customer.phones {
            match self.phones.entry(phone.number.clone()) {
                Entry::Occupied(existing) if *existing.get() != customer.id => {
                    return Err(ShambaError::Duplicate {
                        entity: "phone number",
                        key: phone.number.clone(),
                    });
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(customer.id);
                }
            }
        }
        self.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn has_paid_subscription(
        &self,
        id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<bool, ShambaError> {
        Ok(self.subscriptions.get(&id).is_some_and(|s| s.is_paid_at(at)))
    }

    async fn extend_subscription(
        &self,
        id: CustomerId,
        months: u32,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ShambaError> {
        if !self.customers.contains_key(&id) {
            return Err(ShambaError::NotFound {
                entity: "customer",
                id: id.to_string(),
            });
        }
        let mut entry = self.subscriptions.entry(id).or_insert(Subscription {
            tier: SubscriptionTier::Free,
            ends_at: from,
        });
        let start = entry.ends_at.max(from);
        let ends_at = start
            .checked_add_months(Months::new(months))
            .ok_or_else(|| ShambaError::Internal(format!("subscription end overflows: {months} months")))?;
        if entry.tier == SubscriptionTier::Free {
            entry.tier = SubscriptionTier::Freemium;
        }
        entry.ends_at = ends_at;
        debug!(customer_id = %id, months, %ends_at, "extended subscription");
        Ok(ends_at)
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn record_inbound(&self, message: &InboundMessage) -> Result<(), ShambaError> {
        let seq = self.next_seq();
        self.inbound.insert(message.id, (seq, message.clone()));
        Ok(())
    }

    async fn inbound_from(
        &self,
        customer: CustomerId,
        since: DateTime<Utc>,
    ) -> Result<Vec<InboundMessage>, ShambaError> {
        let mut messages: Vec<(Seq, InboundMessage)> = self
            .inbound
            .iter()
            .filter(|e| {
                let (_, m) = e.value();
                m.customer == Some(customer) && m.received_at >= since
            })
            .map(|e| e.value().clone())
            .collect();
        messages.sort_by_key(|(seq, m)| (m.received_at, *seq));
        Ok(messages.into_iter().map(|(_, m)| m).collect())
    }

    async fn save_outbound(&self, message: &OutboundMessage) -> Result<(), ShambaError> {
        match self.outbound.entry(message.id) {
            Entry::Occupied(mut existing) => {
                existing.get_mut().1 = message.clone();
            }
            Entry::Vacant(slot) => {
                slot.insert((self.next_seq(), message.clone()));
            }
        }
        Ok(())
    }

    async fn record_attempt(&self, attempt: &DeliveryAttempt) -> Result<(), ShambaError> {
        let key = (attempt.recipient, attempt.message, attempt.page_index);
        match self.attempts.entry(key) {
            Entry::Occupied(_) => Err(ShambaError::Duplicate {
                entity: "delivery attempt",
                key: format!(
                    "{}/{}/{}",
                    attempt.recipient, attempt.message, attempt.page_index
                ),
            }),
            Entry::Vacant(slot) => {
                slot.insert(attempt.clone());
                Ok(())
            }
        }
    }

    async fn update_attempts(
        &self,
        message: OutboundId,
        status: DeliveryStatus,
        failure_reason: Option<String>,
    ) -> Result<(), ShambaError> {
        let mut updated = 0usize;
        for mut entry in self.attempts.iter_mut() {
            if entry.key().1 == message {
                entry.status = status.clone();
                entry.failure_reason = failure_reason.clone();
                updated += 1;
            }
        }
        debug!(message_id = %message, updated, %status, "updated delivery attempts");
        Ok(())
    }

    async fn latest_outbound_to(
        &self,
        customer: CustomerId,
        kind: MessageKind,
    ) -> Result<Option<OutboundMessage>, ShambaError> {
        Ok(self
            .outbound_for(customer)
            .into_iter()
            .rev()
            .map(|(_, m)| m)
            .find(|m| m.kind == kind))
    }

    async fn outbound_to(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<OutboundMessage>, ShambaError> {
        Ok(self
            .outbound_for(customer)
            .into_iter()
            .map(|(_, m)| m)
            .collect())
    }

    async fn record_nps(&self, response: &NpsResponse) -> Result<(), ShambaError> {
        match self.nps.entry(response.reply) {
            Entry::Occupied(_) => Err(ShambaError::Duplicate {
                entity: "nps response",
                key: response.reply.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(response.clone());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn keywords_starting_with(
        &self,
        anchor: &str,
        country: Country,
    ) -> Result<Vec<Keyword>, ShambaError> {
        let anchor = anchor.to_uppercase();
        let mut keywords: Vec<Keyword> = self
            .keywords
            .iter()
            .filter(|e| e.is_active && e.text.to_uppercase().starts_with(&anchor))
            .filter(|e| {
                e.templates.iter().any(|id| {
                    self.templates
                        .get(id)
                        .is_some_and(|t| t.applies_to(country))
                })
            })
            .map(|e| e.value().clone())
            .collect();
        keywords.sort_by(|a, b| a.text.cmp(&b.text));
        Ok(keywords)
    }

    async fn templates_for_keyword(
        &self,
        keyword: KeywordId,
        country: Country,
    ) -> Result<Vec<ResponseTemplate>, ShambaError> {
        let Some(template_ids) = self.keywords.get(&keyword).map(|k| k.templates.clone()) else {
            return Ok(Vec::new());
        };
        Ok(template_ids
            .iter()
            .filter_map(|id| self.templates.get(id).map(|t| t.clone()))
            .filter(|t| t.applies_to(country))
            .collect())
    }

    async fn template_by_name(
        &self,
        name: &str,
        country: Country,
    ) -> Result<Option<ResponseTemplate>, ShambaError> {
        let mut found: Vec<ResponseTemplate> = self
            .templates
            .iter()
            .filter(|t| t.name == name && t.applies_to(country))
            .map(|t| t.value().clone())
            .collect();
        // Country-specific templates win over catch-all ones.
        found.sort_by_key(|t| (t.all_countries, t.id));
        Ok(found.into_iter().next())
    }

    async fn voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, ShambaError> {
        Ok(self.vouchers.get(&voucher_key(code)).map(|v| v.clone()))
    }

    async fn save_voucher(&self, voucher: &Voucher) -> Result<(), ShambaError> {
        self.vouchers.insert(voucher_key(&voucher.code), voucher.clone());
        Ok(())
    }

    async fn borders(
        &self,
        country: Country,
        level: BorderLevel,
    ) -> Result<Vec<Border>, ShambaError> {
        let mut borders: Vec<Border> = self
            .borders
            .iter()
            .filter(|b| b.country == country && b.level == level)
            .map(|b| b.value().clone())
            .collect();
        borders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(borders)
    }

    async fn border(&self, id: BorderId) -> Result<Option<Border>, ShambaError> {
        Ok(self.borders.get(&id).map(|b| b.clone()))
    }

    async fn commodities(&self) -> Result<Vec<Commodity>, ShambaError> {
        let mut commodities: Vec<Commodity> =
            self.commodities.iter().map(|c| c.value().clone()).collect();
        commodities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(commodities)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, task: &Task) -> Result<(), ShambaError> {
        match self.tasks.entry(task.id) {
            Entry::Occupied(_) => Err(ShambaError::Duplicate {
                entity: "task",
                key: task.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert((self.next_seq(), task.clone()));
                Ok(())
            }
        }
    }

    async fn task(&self, id: TaskId) -> Result<Option<Task>, ShambaError> {
        Ok(self.tasks.get(&id).map(|e| e.value().1.clone()))
    }

    async fn update_task_description(
        &self,
        id: TaskId,
        description: &str,
    ) -> Result<(), ShambaError> {
        let mut entry = self.tasks.get_mut(&id).ok_or_else(|| ShambaError::NotFound {
            entity: "task",
            id: id.to_string(),
        })?;
        entry.1.description = description.to_string();
        Ok(())
    }

    async fn tasks_for(&self, customer: CustomerId) -> Result<Vec<Task>, ShambaError> {
        Ok(self
            .all_tasks()
            .into_iter()
            .filter(|t| t.customer == customer)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, TimeZone};
    use shamba_core::{
        Language, Offer, OfferId, OfferKind, TaskPriority, TaskReason, TaskSource, TaskStatus,
        TemplateAction, VoucherId,
    };

    use super::*;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 8, minute, 0).unwrap()
    }

    fn template(name: &str, countries: &[Country]) -> ResponseTemplate {
        ResponseTemplate {
            id: TemplateId::new(),
            name: name.to_string(),
            translations: BTreeMap::from([(Language::Eng, format!("{name} text"))]),
            sender: None,
            action: TemplateAction::None,
            assign_category: None,
            all_countries: countries.is_empty(),
            countries: countries.to_vec(),
            protected: false,
        }
    }

    fn keyword(text: &str, templates: &[&ResponseTemplate]) -> Keyword {
        Keyword {
            id: KeywordId::new(),
            text: text.to_string(),
            is_active: true,
            templates: templates.iter().map(|t| t.id).collect(),
        }
    }

    fn outbound(kind: MessageKind, created_at: DateTime<Utc>) -> OutboundMessage {
        OutboundMessage {
            id: OutboundId::new(),
            text: format!("{kind}"),
            kind,
            in_reply_to: None,
            metadata: BTreeMap::new(),
            created_at,
            sent_at: None,
        }
    }

    fn attempt(message: OutboundId, recipient: CustomerId, page: u16) -> DeliveryAttempt {
        DeliveryAttempt {
            message,
            recipient,
            sender: "21606".into(),
            page_index: page,
            status: DeliveryStatus::Queued,
            failure_reason: None,
            cost: None,
        }
    }

    #[tokio::test]
    async fn customers_are_found_by_any_phone() {
        let store = MemoryStore::new();
        let mut customer = Customer::new("+254700000001", at(0));
        customer.phones.push(shamba_core::PhoneNumber {
            number: "+254700000002".into(),
            is_main: false,
        });
        store.save_customer(&customer).await.unwrap();

        let found = store.customer_by_phone("+254700000002").await.unwrap().unwrap();
        assert_eq!(found.id, customer.id);
        assert!(store.customer_by_phone("+254700000009").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn phone_numbers_belong_to_one_customer() {
        let store = MemoryStore::new();
        store
            .save_customer(&Customer::new("+256700000001", at(0)))
            .await
            .unwrap();
        let err = store
            .save_customer(&Customer::new("+256700000001", at(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ShambaError::Duplicate { entity: "phone number", .. }));
    }

    #[tokio::test]
    async fn keyword_search_is_case_insensitive_and_country_scoped() {
        let store = MemoryStore::new();
        let kenya = template("join_info", &[Country::Kenya]);
        let everywhere = template("stop_info", &[]);
        store.insert_keyword(keyword("JOIN", &[&kenya]));
        store.insert_keyword(keyword("JOINING", &[&kenya]));
        store.insert_keyword(keyword("STOP", &[&everywhere]));
        let mut inactive = keyword("JOLLY", &[&everywhere]);
        inactive.is_active = false;
        store.insert_keyword(inactive);
        store.insert_template(kenya);
        store.insert_template(everywhere);

        let found = store.keywords_starting_with("jo", Country::Kenya).await.unwrap();
        let texts: Vec<&str> = found.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(texts, vec!["JOIN", "JOINING"]);

        assert!(store
            .keywords_starting_with("JOIN", Country::Uganda)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store.keywords_starting_with("stop", Country::Zambia).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn country_specific_template_wins_by_name() {
        let store = MemoryStore::new();
        let general = template("join_new", &[]);
        let ugandan = template("join_new", &[Country::Uganda]);
        let ugandan_id = ugandan.id;
        store.insert_template(general);
        store.insert_template(ugandan);

        let found = store.template_by_name("join_new", Country::Uganda).await.unwrap().unwrap();
        assert_eq!(found.id, ugandan_id);
        let found = store.template_by_name("join_new", Country::Kenya).await.unwrap().unwrap();
        assert!(found.all_countries);
        assert!(store.template_by_name("missing", Country::Kenya).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_delivery_attempt_is_rejected() {
        let store = MemoryStore::new();
        let customer = CustomerId::new();
        let message = outbound(MessageKind::TemplateResponse, at(0));
        store.save_outbound(&message).await.unwrap();

        store.record_attempt(&attempt(message.id, customer, 0)).await.unwrap();
        store.record_attempt(&attempt(message.id, customer, 1)).await.unwrap();
        let err = store
            .record_attempt(&attempt(message.id, customer, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ShambaError::Duplicate { entity: "delivery attempt", .. }));

        store
            .update_attempts(message.id, DeliveryStatus::Failed, Some("rejected".into()))
            .await
            .unwrap();
        let attempts = store.attempts_for(message.id);
        assert_eq!(attempts.len(), 2);
        assert!(attempts.iter().all(|a| a.status == DeliveryStatus::Failed));
        assert_eq!(attempts[0].failure_reason.as_deref(), Some("rejected"));
    }

    #[tokio::test]
    async fn latest_outbound_is_per_recipient_and_kind() {
        let store = MemoryStore::new();
        let customer = CustomerId::new();
        let other = CustomerId::new();

        let old = outbound(MessageKind::NpsRequest, at(0));
        let new = outbound(MessageKind::NpsRequest, at(5));
        let tip = outbound(MessageKind::Tip, at(9));
        let elsewhere = outbound(MessageKind::NpsRequest, at(10));
        for (message, recipient) in [(&old, customer), (&new, customer), (&tip, customer), (&elsewhere, other)] {
            store.save_outbound(message).await.unwrap();
            store.record_attempt(&attempt(message.id, recipient, 0)).await.unwrap();
        }

        let latest = store
            .latest_outbound_to(customer, MessageKind::NpsRequest)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, new.id);
        assert!(store
            .latest_outbound_to(customer, MessageKind::DataRequest)
            .await
            .unwrap()
            .is_none());

        let history = store.outbound_to(customer).await.unwrap();
        let ids: Vec<OutboundId> = history.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![old.id, new.id, tip.id]);
    }

    #[tokio::test]
    async fn inbound_history_is_filtered_and_ordered() {
        let store = MemoryStore::new();
        let customer = CustomerId::new();
        let message = |text: &str, received_at| InboundMessage {
            id: InboundId::new(),
            sender: "+254700000001".into(),
            recipient: "21606".into(),
            text: text.to_string(),
            received_at,
            customer: Some(customer),
            customer_created: false,
        };
        store.record_inbound(&message("late", at(20))).await.unwrap();
        store.record_inbound(&message("early", at(1))).await.unwrap();
        store.record_inbound(&message("middle", at(10))).await.unwrap();

        let since = at(5);
        let found = store.inbound_from(customer, since).await.unwrap();
        let texts: Vec<&str> = found.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["middle", "late"]);
    }

    #[tokio::test]
    async fn subscription_extension_stacks_on_remaining_time() {
        let store = MemoryStore::new();
        let customer = Customer::new("+260970000001", at(0));
        store.save_customer(&customer).await.unwrap();

        let now = Utc::now();
        let first = store.extend_subscription(customer.id, 2, now).await.unwrap();
        assert!(first > now + Duration::days(55));
        assert!(store.has_paid_subscription(customer.id, now).await.unwrap());

        let second = store.extend_subscription(customer.id, 1, now).await.unwrap();
        assert!(second > first + Duration::days(27));
        assert_eq!(
            store.subscription(customer.id).unwrap().tier,
            SubscriptionTier::Freemium
        );

        let err = store
            .extend_subscription(CustomerId::new(), 1, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ShambaError::NotFound { entity: "customer", .. }));
    }

    #[tokio::test]
    async fn expired_or_free_subscriptions_are_not_paid() {
        let store = MemoryStore::new();
        let lapsed = CustomerId::new();
        let free = CustomerId::new();
        store.set_subscription(
            lapsed,
            Subscription {
                tier: SubscriptionTier::Premium,
                ends_at: Utc::now() - Duration::days(1),
            },
        );
        store.set_subscription(
            free,
            Subscription {
                tier: SubscriptionTier::Free,
                ends_at: Utc::now() + Duration::days(30),
            },
        );
        let now = Utc::now();
        assert!(!store.has_paid_subscription(lapsed, now).await.unwrap());
        assert!(!store.has_paid_subscription(free, now).await.unwrap());
        assert!(!store.has_paid_subscription(CustomerId::new(), now).await.unwrap());
        // Judged at the instant asked about, not the wall clock.
        assert!(store.has_paid_subscription(lapsed, now - Duration::days(2)).await.unwrap());
    }

    #[tokio::test]
    async fn vouchers_are_looked_up_case_insensitively() {
        let store = MemoryStore::new();
        store.insert_voucher(Voucher {
            id: VoucherId::new(),
            code: "SHAMBA24".into(),
            offer: Offer {
                id: OfferId::new(),
                name: "launch".into(),
                kind: OfferKind::FreeSubscription { months: 3 },
                valid_from: at(0),
                valid_until: at(50),
                repeatable: false,
            },
            used_by: None,
            used_at: None,
        });
        let mut voucher = store.voucher_by_code(" shamba24 ").await.unwrap().unwrap();
        voucher.redeem(CustomerId::new(), at(3)).unwrap();
        store.save_voucher(&voucher).await.unwrap();
        assert!(store
            .voucher_by_code("SHAMBA24")
            .await
            .unwrap()
            .unwrap()
            .used_by
            .is_some());
    }

    #[tokio::test]
    async fn tasks_keep_creation_order_and_accept_description_updates() {
        let store = MemoryStore::new();
        let customer = CustomerId::new();
        let task = |minute| Task {
            id: TaskId::new(),
            customer,
            description: "Respond to farmer".into(),
            source: TaskSource::Inbound(InboundId::new()),
            priority: TaskPriority::Medium,
            status: TaskStatus::New,
            reasons: vec![TaskReason::VanillaRequest],
            incoming: vec![],
            outgoing: vec![],
            created_at: at(minute),
        };
        let second = task(5);
        let first = task(1);
        store.create_task(&second).await.unwrap();
        store.create_task(&first).await.unwrap();
        assert!(store.create_task(&first).await.is_err());

        store
            .update_task_description(first.id, "Call farmer back")
            .await
            .unwrap();
        let tasks = store.tasks_for(customer).await.unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, first.id);
        assert_eq!(tasks[0].description, "Call farmer back");
        assert!(store.update_task_description(TaskId::new(), "x").await.is_err());
    }

    #[tokio::test]
    async fn nps_reply_is_recorded_once() {
        let store = MemoryStore::new();
        let response = NpsResponse {
            customer: CustomerId::new(),
            score: 9,
            request: OutboundId::new(),
            reply: InboundId::new(),
            recorded_at: at(2),
        };
        store.record_nps(&response).await.unwrap();
        assert!(store.record_nps(&response).await.is_err());
        assert_eq!(store.nps_responses(), vec![response]);
    }
}
