// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving inbound text to a keyword-bound response template.

use shamba_core::{CatalogStore, Country, Keyword, ResponseTemplate, ShambaError};
use shamba_text::{first_token, strip_boundary_punctuation};
use tracing::debug;

/// Result of looking up a message in the keyword registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordResolution {
    /// Nothing survived normalization.
    Empty,
    Matched {
        keyword: Keyword,
        template: ResponseTemplate,
    },
    /// The keyword is bound to zero or several templates for the country.
    Ambiguous { keyword: Keyword, templates: usize },
    NoMatch,
}

/// Length in chars of the shared prefix of two upper-cased strings.
fn common_prefix_len(text: &str, keyword: &str) -> usize {
    text.chars()
        .zip(keyword.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Whether a match of `matched` chars covers enough of `text` to count.
///
/// `text` is the message as received, padding included. "STOP" at the start
/// of "Stop joking" covers too little of it.
pub fn covers_enough(text: &str, matched: usize) -> bool {
    matched > 0 && text.chars().count() < 2 * matched
}

/// Resolve `text` against the active keywords applicable to `country`.
pub async fn resolve_keyword<S>(
    store: &S,
    text: &str,
    country: Country,
) -> Result<KeywordResolution, ShambaError>
where
    S: CatalogStore + ?Sized,
{
    let normalized = strip_boundary_punctuation(text);
    if normalized.is_empty() {
        return Ok(KeywordResolution::Empty);
    }
    let Some(anchor) = first_token(text) else {
        return Ok(KeywordResolution::Empty);
    };

    let candidates = store.keywords_starting_with(&anchor, country).await?;
    let best = candidates
        .into_iter()
        .map(|k| {
            let matched = common_prefix_len(&normalized, &k.text.to_uppercase());
            (matched, k)
        })
        // Longest match first; among equals the shortest keyword is the closest.
        .max_by(|(a, ka), (b, kb)| {
            a.cmp(b)
                .then_with(|| kb.text.chars().count().cmp(&ka.text.chars().count()))
                .then_with(|| kb.text.cmp(&ka.text))
        });

    let Some((matched, keyword)) = best else {
        debug!(anchor = %anchor, %country, "no keyword starts with anchor");
        return Ok(KeywordResolution::NoMatch);
    };
    if !covers_enough(text, matched) {
        debug!(keyword = %keyword.text, matched, "keyword covers too little of the message");
        return Ok(KeywordResolution::NoMatch);
    }

    let mut templates = store.templates_for_keyword(keyword.id, country).await?;
    if templates.len() != 1 {
        return Ok(KeywordResolution::Ambiguous {
            templates: templates.len(),
            keyword,
        });
    }
    let template = templates.remove(0);
    debug!(keyword = %keyword.text, template = %template.name, "keyword matched");
    Ok(KeywordResolution::Matched { keyword, template })
}
