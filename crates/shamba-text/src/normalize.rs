// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalization of inbound text for keyword and voucher comparison.

/// Characters trimmed from both ends of a message before keyword comparison.
///
/// Internal characters are left alone so "STOP-JOKING" keeps its hyphen.
pub const BOUNDARY_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '{', '}', '<', '>', '-', '_',
    '*', '#', '~', '`', '/', '\\', '|', '&', '@', '+', '=', '^', '%', '$', '¡', '¿', '“', '”',
    '‘', '’',
];

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || BOUNDARY_PUNCTUATION.contains(&c)
}

/// Trim whitespace and boundary punctuation from both ends and upper-case the rest.
pub fn strip_boundary_punctuation(text: &str) -> String {
    text.trim_matches(is_boundary).to_uppercase()
}

/// The first whitespace-delimited token, stripped like a whole message.
///
/// Returns `None` when nothing survives stripping.
pub fn first_token(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(strip_boundary_punctuation)
        .find(|t| !t.is_empty())
}

/// Collapse every whitespace run to a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_at_both_ends() {
        assert_eq!(strip_boundary_punctuation("  stop! "), "STOP");
        assert_eq!(strip_boundary_punctuation("\"join\"."), "JOIN");
        assert_eq!(strip_boundary_punctuation("...?"), "");
    }

    #[test]
    fn keeps_internal_characters() {
        assert_eq!(strip_boundary_punctuation("stop-joking!"), "STOP-JOKING");
        assert_eq!(strip_boundary_punctuation("(maize, beans)"), "MAIZE, BEANS");
    }

    #[test]
    fn first_token_skips_pure_punctuation() {
        assert_eq!(first_token("!! join now"), Some("JOIN".to_string()));
        assert_eq!(first_token("Stop joking"), Some("STOP".to_string()));
        assert_eq!(first_token("   "), None);
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize_whitespace("  a \n\n b\tc "), "a b c");
    }
}
