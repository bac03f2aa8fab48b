// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text handling for inbound keyword matching and outbound SMS construction.
//!
//! - [`normalize`]: boundary punctuation stripping and case folding
//! - [`gsm`]: GSM 03.38 charset validation, cost counting and sanitizing
//! - [`pages`]: splitting long text into SMS pages with continuation suffixes

pub mod gsm;
pub mod normalize;
pub mod pages;

pub use gsm::{CharsetError, Sanitized, encoded_len, sanitize, validate_charset};
pub use normalize::{first_token, normalize_whitespace, strip_boundary_punctuation};
pub use pages::{PageOptions, PaginationError, split_into_pages, strip_page_suffix};
