// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shamba pages` command implementation.

use shamba_text::{PageOptions, PaginationError, encoded_len, sanitize, split_into_pages};

/// Render the pages `text` would be sent as, one block per page.
///
/// With `clean`, characters outside the GSM alphabet are replaced or dropped
/// first, as the outbound path does; otherwise they are an error.
pub fn render_pages(
    text: &str,
    options: &PageOptions,
    clean: bool,
) -> Result<String, PaginationError> {
    let mut out = String::new();
    let text = if clean {
        let sanitized = sanitize(text);
        if !sanitized.removed.is_empty() {
            let removed: String = sanitized.removed.iter().collect();
            out.push_str(&format!("dropped characters: {removed}\n"));
        }
        sanitized.text
    } else {
        text.to_string()
    };

    let pages = split_into_pages(&text, options)?;
    let total = pages.len();
    for (i, page) in pages.iter().enumerate() {
        let units = encoded_len(page)?;
        out.push_str(&format!(
            "--- page {}/{total} ({units}/{} units)\n{page}\n",
            i + 1,
            options.limit
        ));
    }
    Ok(out)
}
