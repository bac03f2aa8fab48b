// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity scores on a 0-100 scale.
//!
//! All scorers compare case-insensitively. [`weighted_ratio`] is the default
//! used for region and commodity names: it takes the best of a plain ratio, a
//! token-order-insensitive ratio and (for very different lengths) a scaled
//! substring ratio.

fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Normalized Levenshtein similarity.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_percent(strsim::normalized_levenshtein(
        &a.to_lowercase(),
        &b.to_lowercase(),
    ))
}

/// Best [`ratio`] of the shorter string against every same-length window of the longer.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let short_len = short.chars().count();
    let long_chars: Vec<char> = long.chars().collect();
    if short_len == 0 {
        return 0;
    }
    if long_chars.len() == short_len {
        return ratio(&short, &long);
    }

    let mut best = 0;
    for window in long_chars.windows(short_len) {
        let window: String = window.iter().collect();
        best = best.max(ratio(&short, &window));
        if best == 100 {
            break;
        }
    }
    best
}

/// [`ratio`] after sorting whitespace tokens, so word order does not matter.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sorted_tokens(&a.to_lowercase()), &sorted_tokens(&b.to_lowercase()))
}

/// Weighted combination of the scorers above.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let base = f64::from(ratio(&a, &b));
    let (len_a, len_b) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = len_a.max(len_b) / len_a.min(len_b);

    let best = if len_ratio < 1.5 {
        base.max(f64::from(token_sort_ratio(&a, &b)) * 0.95)
    } else {
        let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        let partial = f64::from(partial_ratio(&a, &b)) * scale;
        let partial_sorted =
            f64::from(partial_ratio(&sorted_tokens(&a), &sorted_tokens(&b))) * scale * 0.95;
        base.max(partial).max(partial_sorted)
    };
    best.round() as u8
}

/// A scored candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked<'a, T> {
    pub item: &'a T,
    pub score: u8,
}

/// Score every item against `query` with [`weighted_ratio`], best first.
///
/// Equal scores keep their input order.
pub fn rank<'a, T, F>(query: &str, items: &'a [T], key: F) -> Vec<Ranked<'a, T>>
where
    F: Fn(&T) -> &str,
{
    let mut ranked: Vec<Ranked<'a, T>> = items
        .iter()
        .map(|item| Ranked {
            item,
            score: weighted_ratio(query, key(item)),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

/// The top-ranked item if it reaches `threshold`.
pub fn best_match<'a, T, F>(query: &str, items: &'a [T], key: F, threshold: u8) -> Option<Ranked<'a, T>>
where
    F: Fn(&T) -> &str,
{
    rank(query, items, key)
        .into_iter()
        .next()
        .filter(|r| r.score >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(ratio("Kiambu", "kiambu"), 100);
        assert_eq!(weighted_ratio(" Kiambu ", "KIAMBU"), 100);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(ratio("", "kiambu"), 0);
        assert_eq!(partial_ratio("", "kiambu"), 0);
        assert_eq!(weighted_ratio("   ", "kiambu"), 0);
    }

    #[test]
    fn single_typo_scores_high() {
        assert_eq!(ratio("elbrgon", "elburgon"), 88);
        assert_eq!(ratio("kiambuu", "kiambu"), 86);
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("turi", "turi east"), 100);
        assert_eq!(partial_ratio("turi east", "turi"), 100);
    }

    #[test]
    fn token_order_is_ignored() {
        assert_eq!(token_sort_ratio("north gatundu", "Gatundu North"), 100);
        assert_eq!(weighted_ratio("north gatundu", "Gatundu North"), 95);
    }

    #[test]
    fn substring_of_longer_name_is_capped() {
        assert_eq!(weighted_ratio("turi", "turi east"), 90);
    }

    #[test]
    fn rank_orders_best_first_and_keeps_ties_stable() {
        let names = vec!["Molo", "Njoro", "Njoro"];
        let ranked = rank("njoro", &names, |n| *n);
        assert_eq!(ranked[0].score, 100);
        assert_eq!(ranked[1].score, 100);
        assert!(std::ptr::eq(ranked[0].item, &names[1]));
        assert!(std::ptr::eq(ranked[1].item, &names[2]));
    }

    #[test]
    fn best_match_respects_threshold() {
        let names = vec!["Maize", "Beans"];
        assert_eq!(best_match("maze", &names, |n| *n, 80).map(|r| *r.item), Some("Maize"));
        assert!(best_match("sorghum", &names, |n| *n, 80).is_none());
    }
}
