// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-text locality matching.
//!
//! Location replies arrive as unstructured, often misspelled SMS. Matching runs
//! in two phases:
//!
//! 1. **Structured**: pull values out of "<level word> is <value>" and
//!    "<value> <level word>" phrases. A full level-1/level-2/level-3 chain is
//!    accepted when every level scores at least 90 and exactly one consistent
//!    chain exists; otherwise a level-3 value scoring above 95 is accepted alone
//!    if no other candidate ties it.
//! 2. **Sliding window**: scan word windows (prefixes longest first, then
//!    suffixes) against level-3 names, accepting only a clear winner per
//!    [`accept_scores`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use shamba_core::{Border, BorderId, BorderLevel, Country};
use tracing::debug;

use crate::fuzzy::{Ranked, rank};

/// Minimum per-level score for a structured hierarchy match.
pub const HIERARCHY_MIN_SCORE: u8 = 90;
/// A lone structured level-3 value must score strictly above this.
pub const LEVEL3_ALONE_SCORE: u8 = 95;
pub const WINDOW_MIN_SCORE: u8 = 90;
pub const WINDOW_MIN_MARGIN: u8 = 5;
pub const SINGLE_WORD_MIN_SCORE: u8 = 85;
pub const SINGLE_WORD_MIN_MARGIN: u8 = 10;

/// Every administrative word used by any operated country.
const LEVEL_WORDS: &[&str] = &["province", "district", "county", "subcounty", "ward"];

/// Filler words removed before the sliding-window scan.
const FILLER_WORDS: &[&str] = &[
    "and", "the", "from", "near", "live", "living", "stay", "staying", "village", "location",
    "sub", "area", "place", "called", "this", "that", "with", "for", "are", "was", "but",
    "not", "our", "your", "here", "there",
];

static SUB_COUNTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsub[\s\-]+county\b").unwrap());

static LEVEL_PATTERNS: LazyLock<HashMap<&'static str, [Regex; 2]>> = LazyLock::new(|| {
    LEVEL_WORDS
        .iter()
        .map(|word| {
            (
                *word,
                [
                    Regex::new(&format!(r"(?i)\b{word}\s+is\s+([a-z']{{3,}})")).unwrap(),
                    Regex::new(&format!(r"(?i)\b([a-z']{{3,}})\s+{word}\b")).unwrap(),
                ],
            )
        })
        .collect()
});

/// Whether a fuzzy top score is a clear enough winner over the runner-up.
///
/// Rejects confident-looking but ambiguous matches such as direction words
/// ("East", "West") shared by many region names.
pub fn accept_scores(top: u8, runner_up: u8, single_word: bool) -> bool {
    let margin = top.saturating_sub(runner_up);
    (top >= WINDOW_MIN_SCORE && margin >= WINDOW_MIN_MARGIN)
        || (single_word && top >= SINGLE_WORD_MIN_SCORE && margin >= SINGLE_WORD_MIN_MARGIN)
}

/// Replace "sub county" / "sub-county" with "subcounty".
pub fn normalize_separators(text: &str) -> String {
    SUB_COUNTY.replace_all(text, "subcounty").into_owned()
}

/// Lowercase and drop apostrophes so "Mang'u" compares as "mangu".
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['\'', '’'], "")
}

fn is_filler(word: &str) -> bool {
    LEVEL_WORDS.contains(&word) || FILLER_WORDS.contains(&word)
}

/// The value following or preceding `level_word`, if the text names one.
fn extract_level_value(text: &str, level_word: &str) -> Option<String> {
    let [is_shape, suffix_shape] = LEVEL_PATTERNS.get(level_word)?;
    if let Some(caps) = is_shape.captures(text) {
        return caps.get(1).map(|m| normalize_name(m.as_str()));
    }
    suffix_shape
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| normalize_name(m.as_str())))
        .find(|value| !is_filler(value))
}

/// Words of three or more letters, fillers and level words removed.
fn window_words(text: &str) -> Vec<String> {
    normalize_name(text)
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| w.chars().count() >= 3 && !is_filler(w))
        .map(str::to_string)
        .collect()
}

/// A border paired with its normalized comparison key.
#[derive(Debug, Clone)]
struct Candidate {
    key: String,
    border: Border,
}

fn keyed(borders: Vec<Border>) -> Vec<Candidate> {
    borders
        .into_iter()
        .map(|border| Candidate {
            key: normalize_name(&border.name),
            border,
        })
        .collect()
}

fn rank_candidates<'a>(query: &str, candidates: &'a [Candidate]) -> Vec<Ranked<'a, Candidate>> {
    rank(query, candidates, |c| c.key.as_str())
}

/// Administrative regions of one country, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    borders: HashMap<BorderId, Border>,
}

impl RegionIndex {
    pub fn new(borders: impl IntoIterator<Item = Border>) -> Self {
        Self {
            borders: borders.into_iter().map(|b| (b.id, b)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.borders.is_empty()
    }

    pub fn get(&self, id: BorderId) -> Option<&Border> {
        self.borders.get(&id)
    }

    /// Borders at `level`, sorted by name for deterministic ranking.
    pub fn at_level(&self, level: BorderLevel) -> Vec<Border> {
        let mut found: Vec<Border> = self
            .borders
            .values()
            .filter(|b| b.level == level)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        found
    }

    /// Walk up the parent chain of `border` to the ancestor at `level`.
    pub fn ancestor(&self, border: &Border, level: BorderLevel) -> Option<&Border> {
        let mut current = self.get(border.parent?)?;
        loop {
            if current.level == level {
                return Some(current);
            }
            current = self.get(current.parent?)?;
        }
    }
}

/// Known context narrowing the level-3 candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchScope {
    pub level1: Option<BorderId>,
    pub level2: Option<BorderId>,
}

/// Which phase produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    Hierarchical,
    LevelThree,
    SlidingWindow,
}

/// A resolved level-3 region with its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalityMatch {
    pub level1: Option<Border>,
    pub level2: Option<Border>,
    pub level3: Border,
    pub score: u8,
    pub method: MatchMethod,
}

/// Resolves free text to a region of one country.
#[derive(Debug, Clone)]
pub struct LocalityMatcher {
    country: Country,
    index: RegionIndex,
}

impl LocalityMatcher {
    pub fn new(country: Country, index: RegionIndex) -> Self {
        Self { country, index }
    }

    /// Resolve `text` to a single level-3 region, or `None` when nothing is a clear match.
    pub fn find(&self, text: &str, scope: &MatchScope) -> Option<LocalityMatch> {
        let candidates = self.level3_candidates(scope);
        if candidates.is_empty() {
            debug!(country = %self.country, "no level-3 candidates in scope");
            return None;
        }

        let text = normalize_separators(text);
        self.match_structured(&text, &candidates)
            .or_else(|| self.match_window(&text, &candidates))
    }

    fn level3_candidates(&self, scope: &MatchScope) -> Vec<Candidate> {
        let borders = self
            .index
            .at_level(BorderLevel::Level3)
            .into_iter()
            .filter(|b| b.country == self.country)
            .filter(|b| {
                scope.level2.is_none_or(|id| {
                    self.index.ancestor(b, BorderLevel::Level2).map(|p| p.id) == Some(id)
                })
            })
            .filter(|b| {
                scope.level1.is_none_or(|id| {
                    self.index.ancestor(b, BorderLevel::Level1).map(|p| p.id) == Some(id)
                })
            })
            .collect();
        keyed(borders)
    }

    fn matched(&self, level3: &Border, score: u8, method: MatchMethod) -> LocalityMatch {
        LocalityMatch {
            level1: self.index.ancestor(level3, BorderLevel::Level1).cloned(),
            level2: self.index.ancestor(level3, BorderLevel::Level2).cloned(),
            level3: level3.clone(),
            score,
            method,
        }
    }

    fn match_structured(&self, text: &str, candidates: &[Candidate]) -> Option<LocalityMatch> {
        let word = |level| self.country.level_word(level);
        let level1 = extract_level_value(text, word(BorderLevel::Level1));
        let level2 = extract_level_value(text, word(BorderLevel::Level2));
        let level3 = extract_level_value(text, word(BorderLevel::Level3))?;

        if let (Some(level1), Some(level2)) = (&level1, &level2) {
            let l1_borders = keyed(self.index.at_level(BorderLevel::Level1));
            let l2_borders = keyed(self.index.at_level(BorderLevel::Level2));
            let l1 = above(rank_candidates(level1, &l1_borders), HIERARCHY_MIN_SCORE);
            let l2 = above(rank_candidates(level2, &l2_borders), HIERARCHY_MIN_SCORE);
            let l3 = above(rank_candidates(&level3, candidates), HIERARCHY_MIN_SCORE);

            let chains: Vec<(&Border, u8)> = l3
                .iter()
                .filter_map(|r3| {
                    let border = &r3.item.border;
                    let parent2 = self.index.ancestor(border, BorderLevel::Level2)?;
                    let r2 = l2.iter().find(|r| r.item.border.id == parent2.id)?;
                    let parent1 = self.index.ancestor(parent2, BorderLevel::Level1)?;
                    let r1 = l1.iter().find(|r| r.item.border.id == parent1.id)?;
                    Some((border, r1.score.min(r2.score).min(r3.score)))
                })
                .collect();

            match chains.as_slice() {
                [(border, score)] => {
                    debug!(region = %border.name, score, "hierarchical locality match");
                    return Some(self.matched(border, *score, MatchMethod::Hierarchical));
                }
                [] => {}
                _ => {
                    debug!(chains = chains.len(), "ambiguous locality hierarchy");
                    return None;
                }
            }
        }

        let ranked = rank_candidates(&level3, candidates);
        let top = ranked.first()?;
        let tied = ranked.get(1).is_some_and(|r| r.score == top.score);
        if top.score > LEVEL3_ALONE_SCORE && !tied {
            let border = &top.item.border;
            debug!(region = %border.name, score = top.score, "level-3 locality match");
            return Some(self.matched(border, top.score, MatchMethod::LevelThree));
        }
        None
    }

    fn match_window(&self, text: &str, candidates: &[Candidate]) -> Option<LocalityMatch> {
        let words = window_words(text);
        let n = words.len();
        let prefixes = (1..=n).rev().map(|end| &words[..end]);
        let suffixes = (1..n).map(|start| &words[start..]);

        for window in prefixes.chain(suffixes) {
            let query = window.join(" ");
            let ranked = rank_candidates(&query, candidates);
            let top = ranked.first()?;
            let runner_up = ranked.get(1).map_or(0, |r| r.score);
            if accept_scores(top.score, runner_up, window.len() == 1) {
                let border = &top.item.border;
                debug!(
                    window = %query,
                    region = %border.name,
                    score = top.score,
                    runner_up,
                    "sliding-window locality match"
                );
                return Some(self.matched(border, top.score, MatchMethod::SlidingWindow));
            }
        }
        None
    }
}

fn above<T>(ranked: Vec<Ranked<'_, T>>, threshold: u8) -> Vec<Ranked<'_, T>> {
    ranked.into_iter().filter(|r| r.score >= threshold).collect()
}
