// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Shamba SMS engine.

use thiserror::Error;

/// The primary error type used across collaborator traits and engine internals.
///
/// Only [`ShambaError::Contract`] is allowed to escape the dispatch engine; every
/// other variant is converted into a human task at the message-receipt boundary.
#[derive(Debug, Error)]
pub enum ShambaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence collaborator errors.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A record looked up by key does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A uniqueness invariant would be violated.
    #[error("duplicate {entity}: {key}")]
    Duplicate { entity: &'static str, key: String },

    /// The delivery collaborator refused the hand-off.
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The signup extraction service returned nothing usable.
    #[error(transparent)]
    Extraction(#[from] ExtractionFailed),

    /// No response template with this name applies to the country.
    #[error("missing template `{name}` for {country}")]
    MissingTemplate { name: String, country: String },

    /// A placeholder in a response text could not be resolved.
    #[error("placeholder error: {0}")]
    Placeholder(String),

    /// Text contains characters outside the GSM basic and extended sets.
    #[error("invalid characters in message: {chars:?}")]
    InvalidCharacters { chars: Vec<char> },

    /// The caller handed data of the wrong shape to a public boundary.
    #[error("contract violation: {0}")]
    Contract(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ShambaError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ShambaError::Storage {
            source: Box::new(err),
        }
    }

    /// Whether this error indicates a caller bug rather than a message-content problem.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ShambaError::Contract(_))
    }
}

/// Reasons a signup extraction call produced no usable result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailed {
    /// The model output could not be parsed into the country's schema.
    #[error("malformed extraction output: {0}")]
    Malformed(String),

    /// The extraction service itself failed.
    #[error("extraction service unavailable: {0}")]
    Unavailable(String),

    /// No extraction schema exists for the country.
    #[error("no extraction schema for country {0}")]
    UnsupportedCountry(String),
}
