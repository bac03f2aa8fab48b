// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers and small enumerations shared across the workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifier of a customer record.
    CustomerId
);
id_type!(
    /// Identifier of a received SMS.
    InboundId
);
id_type!(
    /// Identifier of a logical outgoing SMS.
    OutboundId
);
id_type!(
    /// Identifier of a human work item.
    TaskId
);
id_type!(
    /// Identifier of a response template.
    TemplateId
);
id_type!(
    /// Identifier of a keyword.
    KeywordId
);
id_type!(
    /// Identifier of a voucher.
    VoucherId
);
id_type!(
    /// Identifier of a voucher offer.
    OfferId
);
id_type!(
    /// Identifier of an administrative region node.
    BorderId
);
id_type!(
    /// Identifier of a crop or livestock commodity.
    CommodityId
);

/// Countries the engine knows how to serve.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
pub enum Country {
    #[strum(serialize = "KE")]
    #[serde(rename = "KE")]
    Kenya,
    #[strum(serialize = "UG")]
    #[serde(rename = "UG")]
    Uganda,
    #[strum(serialize = "ZM")]
    #[serde(rename = "ZM")]
    Zambia,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::Kenya, Country::Uganda, Country::Zambia];

    /// ISO 3166-1 alpha-2 code.
    pub fn code(&self) -> &'static str {
        match self {
            Country::Kenya => "KE",
            Country::Uganda => "UG",
            Country::Zambia => "ZM",
        }
    }

    /// International dialing prefix including the leading `+`.
    pub fn dialing_prefix(&self) -> &'static str {
        match self {
            Country::Kenya => "+254",
            Country::Uganda => "+256",
            Country::Zambia => "+260",
        }
    }

    /// Resolve a country from an E.164 phone number by its dialing prefix.
    pub fn from_phone(number: &str) -> Option<Country> {
        let number = number.trim();
        Country::ALL
            .into_iter()
            .find(|c| number.starts_with(c.dialing_prefix()))
    }

    /// Language used for customers who never stated a preference.
    pub fn default_language(&self) -> Language {
        match self {
            Country::Kenya => Language::Swa,
            Country::Uganda | Country::Zambia => Language::Eng,
        }
    }

    /// The word locals use for an administrative level (e.g. "county", "ward").
    pub fn level_word(&self, level: BorderLevel) -> &'static str {
        match (self, level) {
            (_, BorderLevel::Country) => "country",
            (Country::Kenya, BorderLevel::Level1) => "county",
            (Country::Kenya, BorderLevel::Level2) => "subcounty",
            (Country::Kenya, BorderLevel::Level3) => "ward",
            (Country::Uganda, BorderLevel::Level1) => "district",
            (Country::Uganda, BorderLevel::Level2) => "county",
            (Country::Uganda, BorderLevel::Level3) => "subcounty",
            (Country::Zambia, BorderLevel::Level1) => "province",
            (Country::Zambia, BorderLevel::Level2) => "district",
            (Country::Zambia, BorderLevel::Level3) => "ward",
        }
    }
}

/// Depth of a node in the administrative hierarchy (border0..border3).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BorderLevel {
    Country,
    Level1,
    Level2,
    Level3,
}

impl BorderLevel {
    /// The level directly above this one, if any.
    pub fn parent(&self) -> Option<BorderLevel> {
        match self {
            BorderLevel::Country => None,
            BorderLevel::Level1 => Some(BorderLevel::Country),
            BorderLevel::Level2 => Some(BorderLevel::Level1),
            BorderLevel::Level3 => Some(BorderLevel::Level2),
        }
    }
}

/// Languages templates can be translated into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Eng,
    Swa,
    Lug,
    Nya,
}

/// Purpose of an outgoing message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Bulk,
    Individual,
    TemplateResponse,
    Tip,
    Voucher,
    SubscriptionNotice,
    DataRequest,
    NpsRequest,
    Join,
    Stop,
    Signup,
    Unsupported,
}

/// Lifecycle of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
}

/// What the engine does after matching a template's keyword.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateAction {
    #[default]
    None,
    CreateTask,
    JoinCustomer,
    StopCustomer,
}

/// How a customer subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JoinMethod {
    Sms,
    Call,
    Web,
    Voucher,
    Agent,
}

/// How a customer opted out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StopMethod {
    Sms,
    Call,
    Web,
    Agent,
}

/// Urgency of a human work item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Workflow state of a human work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    New,
    InProgress,
    Resolved,
    Closed,
}

/// Why the engine asked a human to look at a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskReason {
    VanillaRequest,
    TemplateAction,
    ResponseFailed,
    SurveyReview,
    DataReview,
    KeywordConflict,
    SignupReview,
    DuplicateAiResponse,
    MissingTemplate,
    Voucher,
    Registration,
    ProcessingFailure,
}

/// Whether a commodity is a crop or an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommodityKind {
    Crop,
    Livestock,
}

/// Health status reported by collaborator health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Collaborator is fully operational.
    Healthy,
    /// Collaborator is operational but experiencing issues.
    Degraded(String),
    /// Collaborator is not operational.
    Unhealthy(String),
}

/// Identifies the kind of collaborator behind an adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Store,
    Sender,
    Extractor,
    Landmarks,
    Observability,
}
