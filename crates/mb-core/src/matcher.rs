//! Core Matching Engine
//!
//! One pass per page, terminal on the first hit:
//! 1. URL list: containment in either direction against the hostname.
//!    URL blocks are never subject to ignore exemptions.
//! 2. Ignore check: an exempted hostname skips keyword matching.
//! 3. Keyword list: case-insensitive patterns against the page corpus.
//!
//! Empty lists never match, so missing data fails open.

use crate::blocklist::CompiledSnapshot;
use crate::types::{BlockReason, PageContent, Verdict};

/// Bidirectional containment between a hostname and a URL-list entry.
///
/// Deliberately loose: `sub.bad.com` and `bad.com.evil.org` both match the
/// entry `bad.com`, and so does the bare hostname `bad` because the entry
/// contains it. An empty hostname matches nothing, even though every entry
/// contains it: a page without a host is allowed rather than blocked by
/// any non-empty list.
#[inline]
pub fn url_matches(hostname: &str, entry: &str) -> bool {
    if hostname.is_empty() || entry.is_empty() {
        return false;
    }
    hostname.contains(entry) || entry.contains(hostname)
}

/// Lowercased `hostname title text`, the text keyword patterns run against.
pub fn build_corpus(hostname: &str, title: &str, page_text: &str) -> String {
    let mut corpus = String::with_capacity(hostname.len() + title.len() + page_text.len() + 2);
    corpus.push_str(hostname);
    corpus.push(' ');
    corpus.push_str(title);
    corpus.push(' ');
    corpus.push_str(page_text);
    corpus.to_lowercase()
}

/// Verdict plus the list entry that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult<'a> {
    pub verdict: Verdict,
    pub matched: Option<&'a str>,
}

impl<'a> MatchResult<'a> {
    fn allow() -> Self {
        Self {
            verdict: Verdict::ALLOW,
            matched: None,
        }
    }

    fn block(reason: BlockReason, entry: &'a str) -> Self {
        Self {
            verdict: Verdict::block(reason),
            matched: Some(entry),
        }
    }
}

/// The core matching engine over one snapshot.
pub struct Matcher<'a> {
    snapshot: &'a CompiledSnapshot,
}

impl<'a> Matcher<'a> {
    pub fn new(snapshot: &'a CompiledSnapshot) -> Self {
        Self { snapshot }
    }

    /// First URL-list entry related to `hostname`.
    pub fn match_url(&self, hostname: &str) -> Option<&'a str> {
        self.snapshot
            .url_list()
            .iter()
            .map(String::as_str)
            .find(|entry| url_matches(hostname, entry))
    }

    /// First keyword pattern found in the page corpus.
    pub fn match_words(&self, page: &PageContent) -> Option<&'a str> {
        let patterns = self.snapshot.patterns();
        if patterns.is_empty() {
            return None;
        }
        let corpus = build_corpus(&page.hostname, &page.title, &page.page_text);
        patterns.find_match(&corpus).map(|p| p.source())
    }

    /// Evaluate a page. `is_ignored` is consulted only when the URL list did
    /// not match, and an ignored hostname is allowed without keyword checks.
    pub fn evaluate<E>(
        &self,
        page: &PageContent,
        is_ignored: impl FnOnce(&str) -> Result<bool, E>,
    ) -> Result<MatchResult<'a>, E> {
        if let Some(entry) = self.match_url(&page.hostname) {
            return Ok(MatchResult::block(BlockReason::Url, entry));
        }

        if is_ignored(&page.hostname)? {
            return Ok(MatchResult::allow());
        }

        Ok(match self.match_words(page) {
            Some(pattern) => MatchResult::block(BlockReason::Word, pattern),
            None => MatchResult::allow(),
        })
    }
}
