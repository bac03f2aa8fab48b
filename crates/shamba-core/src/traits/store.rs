// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator traits.
//!
//! Only simple key- and filter-based lookups are required; the engine carries
//! no query language of its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ShambaError;
use crate::model::{
    Border, Commodity, Customer, DeliveryAttempt, InboundMessage, Keyword, NpsResponse,
    OutboundMessage, ResponseTemplate, Task, Voucher,
};
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    BorderId, BorderLevel, Country, CustomerId, DeliveryStatus, KeywordId, MessageKind,
    OutboundId, TaskId,
};

/// Customer records and subscription state.
#[async_trait]
pub trait CustomerStore: PluginAdapter {
    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, ShambaError>;

    async fn customer_by_phone(&self, number: &str) -> Result<Option<Customer>, ShambaError>;

    async fn save_customer(&self, customer: &Customer) -> Result<(), ShambaError>;

    /// Whether a premium or freemium subscription is running at `at`.
    async fn has_paid_subscription(
        &self,
        id: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<bool, ShambaError>;

    /// Extend the customer's subscription and return the new end date.
    async fn extend_subscription(
        &self,
        id: CustomerId,
        months: u32,
        from: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, ShambaError>;
}

/// Message history and delivery bookkeeping.
#[async_trait]
pub trait MessageStore: PluginAdapter {
    async fn record_inbound(&self, message: &InboundMessage) -> Result<(), ShambaError>;

    /// Inbound messages from `customer` received at or after `since`, oldest first.
    async fn inbound_from(
        &self,
        customer: CustomerId,
        since: DateTime<Utc>,
    ) -> Result<Vec<InboundMessage>, ShambaError>;

    async fn save_outbound(&self, message: &OutboundMessage) -> Result<(), ShambaError>;

    /// Record a delivery attempt, rejecting a repeated (recipient, message, page).
    async fn record_attempt(&self, attempt: &DeliveryAttempt) -> Result<(), ShambaError>;

    async fn update_attempts(
        &self,
        message: OutboundId,
        status: DeliveryStatus,
        failure_reason: Option<String>,
    ) -> Result<(), ShambaError>;

    /// The most recent message of `kind` addressed to `customer`.
    async fn latest_outbound_to(
        &self,
        customer: CustomerId,
        kind: MessageKind,
    ) -> Result<Option<OutboundMessage>, ShambaError>;

    /// Every message ever addressed to `customer`, oldest first.
    async fn outbound_to(&self, customer: CustomerId)
    -> Result<Vec<OutboundMessage>, ShambaError>;

    async fn record_nps(&self, response: &NpsResponse) -> Result<(), ShambaError>;
}

/// Keywords, templates, vouchers and reference data.
#[async_trait]
pub trait CatalogStore: PluginAdapter {
    /// Active keywords starting with `anchor` (case-insensitive) that are bound to
    /// at least one template applicable to `country`.
    async fn keywords_starting_with(
        &self,
        anchor: &str,
        country: Country,
    ) -> Result<Vec<Keyword>, ShambaError>;

    /// Templates bound to `keyword` that apply to `country`.
    async fn templates_for_keyword(
        &self,
        keyword: KeywordId,
        country: Country,
    ) -> Result<Vec<ResponseTemplate>, ShambaError>;

    /// A template by name, if one applies to `country`.
    async fn template_by_name(
        &self,
        name: &str,
        country: Country,
    ) -> Result<Option<ResponseTemplate>, ShambaError>;

    async fn voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, ShambaError>;

    async fn save_voucher(&self, voucher: &Voucher) -> Result<(), ShambaError>;

    async fn borders(
        &self,
        country: Country,
        level: BorderLevel,
    ) -> Result<Vec<Border>, ShambaError>;

    async fn border(&self, id: BorderId) -> Result<Option<Border>, ShambaError>;

    async fn commodities(&self) -> Result<Vec<Commodity>, ShambaError>;
}

/// Human work items.
#[async_trait]
pub trait TaskStore: PluginAdapter {
    async fn create_task(&self, task: &Task) -> Result<(), ShambaError>;

    async fn task(&self, id: TaskId) -> Result<Option<Task>, ShambaError>;

    async fn update_task_description(
        &self,
        id: TaskId,
        description: &str,
    ) -> Result<(), ShambaError>;

    async fn tasks_for(&self, customer: CustomerId) -> Result<Vec<Task>, ShambaError>;
}

/// Everything the engine needs from persistence.
pub trait Store: CustomerStore + MessageStore + CatalogStore + TaskStore {}

impl<T> Store for T where T: CustomerStore + MessageStore + CatalogStore + TaskStore {}
