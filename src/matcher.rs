//! Script tag extraction
//!
//! Scans file bodies line by line for `<script src="...">` elements and
//! records the JavaScript filename each one loads.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches a script element whose `src` ends in a `.js` file and captures the
/// filename after the last `/`.
pub static SCRIPT_SRC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<script\s+[^>]*src=["'][^"']*/([^"']+\.js)["']"#)
        .expect("Invalid SCRIPT_SRC_RE regex")
});

/// A JavaScript asset referenced from a file in the organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub repository: String,
    pub filepath: String,
    /// 1-based
    pub linenumber: usize,
    /// Trimmed source line, HTML escaped
    pub line: String,
    pub name: String,
}

/// Extract every asset referenced in `content`.
///
/// Each line is trimmed before matching; only matching lines are escaped.
pub fn extract(content: &str, pattern: &Regex, repo: &str, path: &str) -> Vec<Asset> {
    content
        .split('\n')
        .enumerate()
        .filter_map(|(index, line)| {
            let trimmed = line.trim();
            let caps = pattern.captures(trimmed)?;
            let name = caps.get(1)?.as_str();
            Some(Asset {
                repository: repo.to_string(),
                filepath: path.to_string(),
                linenumber: index + 1,
                line: escape_html(trimmed),
                name: name.to_string(),
            })
        })
        .collect()
}

/// Replace `& < > " '` with their HTML entities. Everything else is kept.
pub fn escape_html(unsafe_text: &str) -> String {
    let mut escaped = String::with_capacity(unsafe_text.len());
    for c in unsafe_text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
