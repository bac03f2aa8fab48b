// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The handling paths an inbound message can take.

use serde::Serialize;
use strum::{Display, IntoStaticStr};

use shamba_core::{
    CustomerId, InboundId, Keyword, OutboundId, OutboundMessage, ResponseTemplate, TaskId,
    Voucher,
};

/// A template selected by keyword, or by the empty-message rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// `None` for the empty-message template.
    pub keyword: Option<Keyword>,
    pub template: ResponseTemplate,
}

/// The single handling path chosen for a message, in priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// The sender's number is outside the operated countries.
    UnsupportedCountry,
    /// An identical earlier message from the same customer is being handled.
    Duplicate { first: InboundId },
    RedeemVoucher(Voucher),
    SurveyReply { request: OutboundMessage },
    DataReply { request: OutboundMessage },
    Template(TemplateMatch),
    /// The keyword resolves to zero or several templates.
    KeywordConflict { keyword: Keyword, templates: usize },
    Signup,
    Vanilla,
}

/// Terminal branch a processed message ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Branch {
    UnsupportedCountry,
    Duplicate,
    Voucher,
    SurveyReply,
    DataReply,
    Join,
    Stop,
    Template,
    KeywordConflict,
    Signup,
    Vanilla,
    /// An unexpected error was turned into a task.
    Failed,
}

/// What processing one message produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub inbound: InboundId,
    pub customer: CustomerId,
    pub customer_created: bool,
    pub branch: Branch,
    pub task: Option<TaskId>,
    pub response: Option<OutboundId>,
}
