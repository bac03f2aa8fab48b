// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signup agent collaborators.

use async_trait::async_trait;

use crate::error::{ExtractionFailed, ShambaError};
use crate::signup::{LandmarkMatch, SignupExtraction};
use crate::traits::adapter::PluginAdapter;
use crate::types::{BorderId, Country};

/// Structured extraction of signup details from free text.
///
/// Implementations never return partial garbage: anything that cannot be
/// parsed into the country's schema is an [`ExtractionFailed`].
#[async_trait]
pub trait SignupAgent: PluginAdapter {
    async fn invoke(
        &self,
        text: &str,
        country: Country,
    ) -> Result<SignupExtraction, ExtractionFailed>;
}

/// Infers a level-3 region from a free-text landmark ("near Kagwe market").
#[async_trait]
pub trait LandmarkMatcher: PluginAdapter {
    /// Search level-3 regions under `level1` for the landmark.
    async fn locate(
        &self,
        landmark: &str,
        country: Country,
        level1: BorderId,
    ) -> Result<Option<LandmarkMatch>, ShambaError>;
}

/// A text-completion language model.
#[async_trait]
pub trait CompletionProvider: PluginAdapter {
    async fn complete(&self, prompt: &str) -> Result<String, ShambaError>;
}
