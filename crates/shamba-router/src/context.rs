// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recognizing replies to outstanding survey and data requests.
//!
//! A message is a reply to a request only when the request was sent to the
//! customer within the lookback window and the message is the first thing the
//! customer sent since.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use shamba_config::model::EngineConfig;
use shamba_core::{InboundMessage, MessageKind, MessageStore, OutboundMessage, ShambaError};

/// A number with an optional "/N" scale: "9", "-1", "9/10", "6 / 11".
static NPS_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d+)(?:\s*/\s*\d+)?").unwrap());

/// Why a survey reply could not be turned into a score.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NpsRejection {
    #[error("reply contains no number")]
    NoNumber,
    #[error("reply contains {0} numbers")]
    SeveralNumbers(usize),
    #[error("score {0} is outside 0-10")]
    OutOfRange(String),
}

/// Extract a 0-10 score from a survey reply.
pub fn parse_nps_score(text: &str) -> Result<u8, NpsRejection> {
    let numbers: Vec<&str> = NPS_NUMBER
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    let raw = match numbers.as_slice() {
        [] => return Err(NpsRejection::NoNumber),
        [only] => *only,
        many => return Err(NpsRejection::SeveralNumbers(many.len())),
    };

    let digits = raw.trim_start_matches('-');
    if raw.starts_with('-') || digits.len() > 2 {
        return Err(NpsRejection::OutOfRange(raw.to_string()));
    }
    match digits.parse::<u8>() {
        Ok(score) if score <= 10 => Ok(score),
        _ => Err(NpsRejection::OutOfRange(raw.to_string())),
    }
}

/// An outstanding request the inbound message answers.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyContext {
    Survey { request: OutboundMessage },
    DataRequest { request: OutboundMessage },
}

impl ReplyContext {
    pub fn request(&self) -> &OutboundMessage {
        match self {
            ReplyContext::Survey { request } | ReplyContext::DataRequest { request } => request,
        }
    }
}

/// Finds the request, if any, an inbound message replies to.
#[derive(Debug, Clone)]
pub struct ContextTracker {
    survey_lookback: Duration,
    data_lookback: Duration,
    max_survey_reply_len: usize,
}

impl ContextTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            survey_lookback: Duration::days(config.survey_lookback_days),
            data_lookback: Duration::days(config.data_request_lookback_days),
            max_survey_reply_len: config.nps_max_reply_len,
        }
    }

    /// The survey request `message` answers, if any.
    pub async fn survey_reply<S>(
        &self,
        store: &S,
        message: &InboundMessage,
    ) -> Result<Option<ReplyContext>, ShambaError>
    where
        S: MessageStore + ?Sized,
    {
        if message.text.trim().chars().count() > self.max_survey_reply_len {
            return Ok(None);
        }
        let request = self
            .pending_request(store, message, MessageKind::NpsRequest, self.survey_lookback)
            .await?;
        Ok(request.map(|request| ReplyContext::Survey { request }))
    }

    /// The data request `message` answers, if any.
    pub async fn data_reply<S>(
        &self,
        store: &S,
        message: &InboundMessage,
    ) -> Result<Option<ReplyContext>, ShambaError>
    where
        S: MessageStore + ?Sized,
    {
        let request = self
            .pending_request(store, message, MessageKind::DataRequest, self.data_lookback)
            .await?;
        Ok(request.map(|request| ReplyContext::DataRequest { request }))
    }

    async fn pending_request<S>(
        &self,
        store: &S,
        message: &InboundMessage,
        kind: MessageKind,
        lookback: Duration,
    ) -> Result<Option<OutboundMessage>, ShambaError>
    where
        S: MessageStore + ?Sized,
    {
        let Some(customer) = message.customer else {
            return Ok(None);
        };
        let Some(request) = store.latest_outbound_to(customer, kind).await? else {
            return Ok(None);
        };

        let sent_at = sent_at(&request);
        if sent_at < message.received_at - lookback || sent_at > message.received_at {
            debug!(%kind, %sent_at, "request outside lookback window");
            return Ok(None);
        }

        let since: Vec<InboundMessage> = store
            .inbound_from(customer, sent_at)
            .await?
            .into_iter()
            .filter(|m| m.received_at <= message.received_at)
            .collect();
        match since.first() {
            Some(first) if first.id == message.id => Ok(Some(request)),
            _ => {
                debug!(%kind, replies = since.len(), "not the first reply since request");
                Ok(None)
            }
        }
    }
}

fn sent_at(message: &OutboundMessage) -> DateTime<Utc> {
    message.sent_at.unwrap_or(message.created_at)
}
