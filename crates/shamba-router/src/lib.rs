// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound SMS classification and dispatch for the Shamba engine.
//!
//! This crate provides:
//! - [`Engine`]: runs each inbound message through the ordered decision list
//!   and guarantees that anything short of a caller bug ends in a reply, silence,
//!   or a task for a human
//! - [`resolve_keyword`]: keyword to template resolution with the prefix-coverage rule
//! - [`ContextTracker`]: recognition of replies to survey and data requests
//! - [`Responder`]: outgoing message construction, pagination and hand-off
//! - [`populate`] and [`localized_text`]: template rendering
//!
//! Anomalies are logged at WARN and counted in `shamba_anomalies_total`.

pub mod action;
pub mod context;
pub mod effects;
pub mod engine;
mod flows;
pub mod keywords;
pub mod metrics;
pub mod outbound;
pub mod placeholders;
pub mod templates;


pub use action::{Action, Branch, Outcome, TemplateMatch};
pub use context::{ContextTracker, NpsRejection, ReplyContext, parse_nps_score};
pub use effects::{Effects, TaskDraft};
pub use engine::Engine;
pub use keywords::{KeywordResolution, resolve_keyword};
pub use metrics::{Anomaly, record_anomaly};
pub use outbound::{OutboundRequest, Responder, page_options};
pub use placeholders::{PlaceholderContext, PlaceholderError, populate};
pub use templates::{localized_text, names};
