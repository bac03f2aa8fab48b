// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records handed between the engine and its persistence collaborator.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    BorderId, BorderLevel, CommodityId, CommodityKind, Country, CustomerId, DeliveryStatus,
    InboundId, JoinMethod, KeywordId, Language, MessageKind, OfferId, OutboundId, StopMethod,
    TaskId, TaskPriority, TaskReason, TaskStatus, TemplateAction, TemplateId, VoucherId,
};

/// A phone number attached to a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// E.164 formatted number.
    pub number: String,
    pub is_main: bool,
}

/// A farmer known to the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: Option<String>,
    pub phones: Vec<PhoneNumber>,
    pub preferred_language: Option<Language>,
    pub border0: Option<BorderId>,
    pub border1: Option<BorderId>,
    pub border2: Option<BorderId>,
    pub border3: Option<BorderId>,
    pub commodities: Vec<CommodityId>,
    pub categories: Vec<String>,
    pub has_requested_stop: bool,
    pub stop_method: Option<StopMethod>,
    pub stop_date: Option<NaiveDate>,
    pub join_method: Option<JoinMethod>,
    pub is_registered: bool,
    /// Set once a human has taken over; the signup agent never runs again.
    pub skip_ai_invocation: bool,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// A blank customer owning a single main phone number.
    pub fn new(phone: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: CustomerId::new(),
            name: None,
            phones: vec![PhoneNumber {
                number: phone.into(),
                is_main: true,
            }],
            preferred_language: None,
            border0: None,
            border1: None,
            border2: None,
            border3: None,
            commodities: Vec::new(),
            categories: Vec::new(),
            has_requested_stop: false,
            stop_method: None,
            stop_date: None,
            join_method: None,
            is_registered: false,
            skip_ai_invocation: false,
            created_at,
        }
    }

    /// The primary phone number, falling back to the first one on record.
    pub fn main_phone(&self) -> Option<&str> {
        self.phones
            .iter()
            .find(|p| p.is_main)
            .or_else(|| self.phones.first())
            .map(|p| p.number.as_str())
    }

    /// Country derived from the main phone's dialing prefix.
    pub fn phone_country(&self) -> Option<Country> {
        self.main_phone().and_then(Country::from_phone)
    }

    /// Add a category tag unless it is already present.
    pub fn add_category(&mut self, category: &str) -> bool {
        if self.categories.iter().any(|c| c == category) {
            return false;
        }
        self.categories.push(category.to_string());
        true
    }
}

/// A received SMS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: InboundId,
    pub sender: String,
    pub recipient: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub customer: Option<CustomerId>,
    /// True when receiving this message created the customer record.
    pub customer_created: bool,
}

/// One logical outgoing SMS, possibly delivered to many recipients in many pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: OutboundId,
    pub text: String,
    pub kind: MessageKind,
    pub in_reply_to: Option<InboundId>,
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Bookkeeping for a single (recipient, message, page) delivery.
///
/// The triple is unique; storing it twice is a [`crate::ShambaError::Duplicate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    pub message: OutboundId,
    pub recipient: CustomerId,
    pub sender: String,
    pub page_index: u16,
    pub status: DeliveryStatus,
    pub failure_reason: Option<String>,
    pub cost: Option<f64>,
}

/// A word customers text in to reach a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: KeywordId,
    pub text: String,
    pub is_active: bool,
    pub templates: Vec<TemplateId>,
}

/// A localized canned response plus the action it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTemplate {
    pub id: TemplateId,
    pub name: String,
    pub translations: BTreeMap<Language, String>,
    /// Sender identity override; the tenant default is used when absent.
    pub sender: Option<String>,
    pub action: TemplateAction,
    pub assign_category: Option<String>,
    pub all_countries: bool,
    pub countries: Vec<Country>,
    /// Protected templates cannot be renamed or deleted.
    pub protected: bool,
}

impl ResponseTemplate {
    /// Whether this template may answer senders from `country`.
    pub fn applies_to(&self, country: Country) -> bool {
        self.all_countries || self.countries.contains(&country)
    }
}

/// What a voucher offer grants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OfferKind {
    /// An instant discount; the customer only needs a confirmation.
    Discount { percent: u8 },
    /// Free months of subscription on top of the introductory period.
    FreeSubscription { months: u32 },
}

/// A promotional offer vouchers belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
    pub kind: OfferKind,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// Repeatable offers tell the original redeemer they already used it.
    pub repeatable: bool,
}

impl Offer {
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at <= self.valid_until
    }
}

/// Error returned when redeeming a voucher that already has an owner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("voucher already used by {0}")]
pub struct VoucherAlreadyUsed(pub CustomerId);

/// A single-use code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub code: String,
    pub offer: Offer,
    pub used_by: Option<CustomerId>,
    pub used_at: Option<DateTime<Utc>>,
}

impl Voucher {
    /// Claim the voucher for `customer`. `used_by` never changes once set.
    pub fn redeem(
        &mut self,
        customer: CustomerId,
        at: DateTime<Utc>,
    ) -> Result<(), VoucherAlreadyUsed> {
        if let Some(owner) = self.used_by {
            return Err(VoucherAlreadyUsed(owner));
        }
        self.used_by = Some(customer);
        self.used_at = Some(at);
        Ok(())
    }
}

/// What spawned a task. Set at creation and never changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum TaskSource {
    Inbound(InboundId),
    /// The outgoing query whose reply needs review.
    Outbound(OutboundId),
}

/// A human work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub customer: CustomerId,
    pub description: String,
    pub source: TaskSource,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub reasons: Vec<TaskReason>,
    pub incoming: Vec<InboundId>,
    pub outgoing: Vec<OutboundId>,
    pub created_at: DateTime<Utc>,
}

/// A node of the administrative hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Border {
    pub id: BorderId,
    pub country: Country,
    pub level: BorderLevel,
    pub name: String,
    pub parent: Option<BorderId>,
}

/// A crop or livestock type customers can subscribe to tips for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commodity {
    pub id: CommodityId,
    pub name: String,
    pub short_name: Option<String>,
    pub kind: CommodityKind,
    /// Tips are numbered from a recorded event rather than the season.
    pub event_based: bool,
}

/// A recorded survey answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpsResponse {
    pub customer: CustomerId,
    pub score: u8,
    pub request: OutboundId,
    pub reply: InboundId,
    pub recorded_at: DateTime<Utc>,
}
