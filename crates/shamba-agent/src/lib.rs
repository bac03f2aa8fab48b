// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI-assisted signup for the Shamba SMS engine.
//!
//! This crate provides:
//! - [`PromptedSignupAgent`]: a [`shamba_core::SignupAgent`] backed by a completion model
//! - [`CommodityMatcher`]: override table plus cached fuzzy lookup of commodity names
//! - [`SignupAccumulator`]: monotonic, per-field completion of customer records
//! - [`TtlCache`]: the lazily refreshed cache behind the commodity index

pub mod accumulate;
pub mod cache;
pub mod commodity;
pub mod prompt;

pub use accumulate::{
    Intervention, SignupAccumulator, SignupField, SignupOutcome, SignupStatus, missing_fields,
};
pub use cache::TtlCache;
pub use commodity::{CommodityIndex, CommodityMatcher, CommodityResolution};
pub use prompt::{PromptedSignupAgent, build_prompt, parse_extraction};
