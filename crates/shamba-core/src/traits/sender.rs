// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message delivery collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ShambaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CustomerId, OutboundId};

/// Per-dispatch delivery options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Deliver even when the recipient's number is outside the operated countries.
    pub allow_international: bool,
    /// Number of SMS pages the text was split into.
    pub pages: u16,
}

/// A constructed outgoing message handed off for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub message: OutboundId,
    pub recipients: Vec<CustomerId>,
    pub sender_identity: String,
    pub options: SendOptions,
}

/// Fire-and-forget hand-off to the SMS gateway layer.
///
/// Returning `Ok` means the dispatch was accepted, not that it was delivered.
#[async_trait]
pub trait MessageSender: PluginAdapter {
    async fn send(&self, dispatch: Dispatch) -> Result<(), ShambaError>;
}
