//! Page metadata as scraped by a content script.
//!
//! The evaluator collects meta tags, headings and spans; this module turns
//! them into the bounded page text handed to the matcher.

use serde::{Deserialize, Serialize};

use crate::types::PageContent;

/// Characters kept from each heading.
pub const HEADING_CHAR_LIMIT: usize = 200;
/// Characters kept from each span.
pub const SPAN_CHAR_LIMIT: usize = 100;
/// Spans considered per page.
pub const SPAN_LIMIT: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    /// `name` or `property` attribute.
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub hostname: String,
    pub title: String,
    #[serde(default)]
    pub meta: Vec<MetaTag>,
    #[serde(default)]
    pub headings: Vec<String>,
    #[serde(default)]
    pub spans: Vec<String>,
}

impl PageMetadata {
    /// Meta pairs, headings and leading spans joined by spaces.
    pub fn page_text(&self) -> String {
        let meta = self
            .meta
            .iter()
            .filter(|m| !m.name.is_empty() && !m.content.is_empty())
            .map(|m| format!("{}:{}", m.name, m.content))
            .collect::<Vec<_>>()
            .join(" ");
        let headings = self
            .headings
            .iter()
            .map(|h| truncate_chars(h, HEADING_CHAR_LIMIT))
            .collect::<Vec<_>>()
            .join(" ");
        let spans = self
            .spans
            .iter()
            .take(SPAN_LIMIT)
            .map(|s| truncate_chars(s, SPAN_CHAR_LIMIT))
            .collect::<Vec<_>>()
            .join(" ");

        [meta, headings, spans].join(" ")
    }

    pub fn into_content(self) -> PageContent {
        let page_text = self.page_text();
        PageContent {
            hostname: self.hostname,
            title: self.title,
            page_text,
        }
    }
}

fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
