// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Splitting long text into SMS pages.
//!
//! Pages are packed greedily. Break priority: line break > last whitespace >
//! mid-word split. Extended-set characters count double against the page
//! budget, and the continuation suffix (e.g. " (2/3)") is reserved up front.

use regex::Regex;
use thiserror::Error;

use crate::gsm::{CharsetError, unit_cost, validate_charset};

/// Pagination settings, usually built from the `[sms]` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOptions {
    /// Encoding units per page, suffix included.
    pub limit: usize,
    /// Whether multi-page messages get continuation suffixes.
    pub paginate: bool,
    /// Suffix format with `{i}` (page number) and `{n}` (page count).
    pub continuation_format: String,
    pub max_pages: usize,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            limit: 160,
            paginate: true,
            continuation_format: " ({i}/{n})".to_string(),
            max_pages: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error(transparent)]
    Charset(#[from] CharsetError),

    #[error("text needs {needed} pages but at most {max} are allowed")]
    TooManyPages { needed: usize, max: usize },

    #[error("page limit {limit} leaves no room for text after a {reserved}-unit suffix")]
    LimitTooSmall { limit: usize, reserved: usize },
}

/// Attempts at guessing the page count before the suffix width is stable.
const MAX_SUFFIX_ROUNDS: usize = 8;

fn cost(text: &str) -> usize {
    text.chars().map(|c| unit_cost(c).unwrap_or(1)).sum()
}

fn suffix(format: &str, page: usize, total: usize) -> String {
    format
        .replace("{i}", &page.to_string())
        .replace("{n}", &total.to_string())
}

/// Split `text` into the fewest pages that fit `options.limit` each.
///
/// Text that fits a single page is returned as-is (trimmed) without a suffix.
pub fn split_into_pages(text: &str, options: &PageOptions) -> Result<Vec<String>, PaginationError> {
    validate_charset(text)?;
    let text = text.trim();

    if cost(text) <= options.limit {
        return Ok(vec![text.to_string()]);
    }

    if !options.paginate {
        let pages = pack(text, options.limit);
        return check_count(pages, options.max_pages);
    }

    let format = options.continuation_format.as_str();
    let mut assumed = 2;
    for _ in 0..MAX_SUFFIX_ROUNDS {
        let reserved = cost(&suffix(format, assumed, assumed));
        if reserved >= options.limit {
            return Err(PaginationError::LimitTooSmall {
                limit: options.limit,
                reserved,
            });
        }

        let pages = pack(text, options.limit - reserved);
        let total = pages.len();
        if cost(&suffix(format, total, total)) <= reserved {
            let pages = check_count(pages, options.max_pages)?;
            return Ok(pages
                .into_iter()
                .enumerate()
                .map(|(i, page)| format!("{page}{}", suffix(format, i + 1, total)))
                .collect());
        }
        assumed = total;
    }

    Err(PaginationError::TooManyPages {
        needed: assumed,
        max: options.max_pages,
    })
}

fn check_count(pages: Vec<String>, max: usize) -> Result<Vec<String>, PaginationError> {
    if pages.len() > max {
        return Err(PaginationError::TooManyPages {
            needed: pages.len(),
            max,
        });
    }
    Ok(pages)
}

/// Greedily pack `text` into pages of at most `budget` units.
fn pack(text: &str, budget: usize) -> Vec<String> {
    let mut pages = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if cost(rest) <= budget {
            pages.push(rest.to_string());
            break;
        }

        let mut used = 0;
        let mut end = 0;
        for (idx, c) in rest.char_indices() {
            let c_cost = unit_cost(c).unwrap_or(1);
            if used + c_cost > budget {
                break;
            }
            used += c_cost;
            end = idx + c.len_utf8();
        }
        if end == 0 {
            // Budget smaller than a single extended character.
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let window = &rest[..end];
        let (page, next) = if let Some(pos) = window.rfind('\n').filter(|p| *p > 0) {
            (&window[..pos], &rest[pos..])
        } else if rest[end..].starts_with(char::is_whitespace) {
            (window, &rest[end..])
        } else if let Some(pos) = window.rfind(char::is_whitespace).filter(|p| *p > 0) {
            (&window[..pos], &rest[pos..])
        } else {
            (window, &rest[end..])
        };

        let page = page.trim_end();
        if !page.is_empty() {
            pages.push(page.to_string());
        }
        rest = next.trim_start();
    }

    pages
}

/// Remove a trailing continuation suffix produced with `format`, if present.
pub fn strip_page_suffix<'a>(page: &'a str, format: &str) -> &'a str {
    let pattern = regex::escape(format)
        .replace(r"\{i\}", r"\d+")
        .replace(r"\{n\}", r"\d+");
    match Regex::new(&format!("{pattern}$")) {
        Ok(re) => match re.find(page) {
            Some(m) => &page[..m.start()],
            None => page,
        },
        Err(_) => page,
    }
}
