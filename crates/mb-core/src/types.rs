//! Shared data model.
//!
//! These types are the persisted records (snapshot, ignore map, report log)
//! and the request/response values exchanged with the page evaluator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Storage Keys
// =============================================================================

/// Stable keys of the three independently persisted records.
pub mod keys {
    pub const BLOCKLIST: &str = "mojublock_blocklist";
    pub const IGNORED_SITES: &str = "mojublock_ignored_sites";
    pub const REPORTED_LINKS: &str = "mojublock_reported_links";
}

/// Milliseconds in one day.
pub const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// How long an "ignore" exempts a site from keyword blocking.
pub const IGNORE_DURATION_MS: u64 = 7 * DAY_MS;

// =============================================================================
// Blocklist Snapshot
// =============================================================================

/// The active blocklist state. Always replaced as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlocklistSnapshot {
    /// Host fragments, matched by containment in either direction.
    pub url_list: Vec<String>,
    /// Case-insensitive regex sources, matched against the page corpus.
    pub word_list: Vec<String>,
    /// Epoch millis of the last successful refresh. `None` until the first one.
    pub last_update_time: Option<u64>,
}

impl BlocklistSnapshot {
    pub fn new(url_list: Vec<String>, word_list: Vec<String>, now: u64) -> Self {
        Self {
            url_list,
            word_list,
            last_update_time: Some(now),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url_list.is_empty() && self.word_list.is_empty()
    }
}

// =============================================================================
// Ignore Entries
// =============================================================================

/// Persisted ignore map: hostname -> absolute expiry (epoch millis).
pub type IgnoreMap = BTreeMap<String, u64>;

/// One active ignore exemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreEntry {
    pub hostname: String,
    pub expiry: u64,
}

// =============================================================================
// Reports
// =============================================================================

/// Why a page was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockReason {
    /// Hostname matched the URL blocklist. Not ignorable.
    Url,
    /// Page corpus matched a keyword pattern. Ignorable for a week.
    Word,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Url => "url",
            BlockReason::Word => "word",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Some(BlockReason::Url),
            "word" => Some(BlockReason::Word),
            _ => None,
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-submitted report of a blocked (or missed) page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub hostname: String,
    pub title: String,
    pub reason: BlockReason,
    /// Epoch millis when the report was filed.
    pub timestamp: u64,
    /// Free-form description of the reporting client (user agent, version).
    pub client_context: String,
}

// =============================================================================
// Evaluation
// =============================================================================

/// What the page evaluator hands to the matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub hostname: String,
    pub title: String,
    pub page_text: String,
}

impl PageContent {
    pub fn new(
        hostname: impl Into<String>,
        title: impl Into<String>,
        page_text: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            title: title.into(),
            page_text: page_text.into(),
        }
    }
}

/// Outcome of one page evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub blocked: bool,
    pub reason: Option<BlockReason>,
}

impl Verdict {
    pub const ALLOW: Verdict = Verdict {
        blocked: false,
        reason: None,
    };

    pub fn block(reason: BlockReason) -> Self {
        Self {
            blocked: true,
            reason: Some(reason),
        }
    }

    /// Only keyword blocks offer the "ignore" action.
    pub fn can_ignore(&self) -> bool {
        self.reason == Some(BlockReason::Word)
    }

    /// Description shown on the blocking overlay.
    pub fn message(&self, hostname: &str) -> Option<String> {
        match self.reason? {
            BlockReason::Url => Some("This website has been blocked due to its content.".to_string()),
            BlockReason::Word => Some(format!(
                "This website ({hostname}) contains content that matches our judol detection filters."
            )),
        }
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Summary of stored state for status displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub url_count: usize,
    pub word_count: usize,
    pub rejected_patterns: usize,
    pub last_update_time: Option<u64>,
    pub ignored_count: usize,
    pub report_count: usize,
}
