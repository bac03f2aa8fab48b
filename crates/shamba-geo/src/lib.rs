// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fuzzy matching helpers for the Shamba SMS engine.
//!
//! This crate provides:
//! - [`fuzzy`]: 0-100 similarity scores built on edit distance
//! - [`LocalityMatcher`]: resolves free-text location replies to a level-3
//!   administrative region, structured extraction first, then a sliding-window scan

pub mod fuzzy;
pub mod matcher;

pub use fuzzy::{Ranked, best_match, partial_ratio, rank, ratio, token_sort_ratio, weighted_ratio};
pub use matcher::{
    LocalityMatch, LocalityMatcher, MatchMethod, MatchScope, RegionIndex, accept_scores,
};
