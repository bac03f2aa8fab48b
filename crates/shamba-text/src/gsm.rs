// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GSM 03.38 character set handling.
//!
//! Basic-set characters cost one encoding unit; extended-set characters need an
//! escape prefix and cost two. Anything else cannot be sent in a GSM-7 page.

use shamba_core::ShambaError;
use thiserror::Error;

/// The GSM 03.38 default alphabet (escape character excluded).
const BASIC: &str = "@£$¥èéùìòÇ\nØø\rÅåΔ_ΦΓΛΩΠΨΣΘΞÆæßÉ !\"#¤%&'()*+,-./0123456789:;<=>?\
¡ABCDEFGHIJKLMNOPQRSTUVWXYZÄÖÑÜ§¿abcdefghijklmnopqrstuvwxyzäöñüà";

/// Characters reachable through the escape table.
const EXTENDED: &str = "\u{000C}^{}\\[~]|€";

/// Common non-GSM characters and the GSM text that replaces them when sanitizing.
const REPLACEMENTS: &[(char, &str)] = &[
    ('‘', "'"),
    ('’', "'"),
    ('“', "\""),
    ('”', "\""),
    ('–', "-"),
    ('—', "-"),
    ('…', "..."),
    ('\t', " "),
    ('\u{00A0}', " "),
];

/// Text contains characters outside both GSM sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("characters outside the GSM alphabet: {0:?}")]
pub struct CharsetError(pub Vec<char>);

impl From<CharsetError> for ShambaError {
    fn from(err: CharsetError) -> Self {
        ShambaError::InvalidCharacters { chars: err.0 }
    }
}

pub fn is_basic(c: char) -> bool {
    BASIC.contains(c)
}

pub fn is_extended(c: char) -> bool {
    EXTENDED.contains(c)
}

/// Encoding units a character consumes, or `None` if it is not encodable.
pub fn unit_cost(c: char) -> Option<usize> {
    if is_basic(c) {
        Some(1)
    } else if is_extended(c) {
        Some(2)
    } else {
        None
    }
}

/// Total encoding units of `text`, failing on the first unknown characters.
pub fn encoded_len(text: &str) -> Result<usize, CharsetError> {
    validate_charset(text)?;
    Ok(text.chars().filter_map(unit_cost).sum())
}

/// Check that every character belongs to the basic or extended set.
pub fn validate_charset(text: &str) -> Result<(), CharsetError> {
    let mut invalid: Vec<char> = Vec::new();
    for c in text.chars().filter(|c| unit_cost(*c).is_none()) {
        if !invalid.contains(&c) {
            invalid.push(c);
        }
    }
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(CharsetError(invalid))
    }
}

/// Result of making text GSM-safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    /// Characters that had no replacement and were dropped.
    pub removed: Vec<char>,
}

/// Replace well-known lookalikes and drop characters that cannot be encoded.
pub fn sanitize(text: &str) -> Sanitized {
    let mut out = String::with_capacity(text.len());
    let mut removed = Vec::new();
    for c in text.chars() {
        if unit_cost(c).is_some() {
            out.push(c);
        } else if let Some((_, replacement)) = REPLACEMENTS.iter().find(|(from, _)| *from == c) {
            out.push_str(replacement);
        } else if !removed.contains(&c) {
            removed.push(c);
        }
    }
    Sanitized { text: out, removed }
}
