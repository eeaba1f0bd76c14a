//! Engine facade
//!
//! [`Blocker`] wires the three stores and the matcher together and exposes
//! the operations a host calls: evaluate a page, ignore/remove/report a
//! site, refresh the lists. Every call is a plain request/response.

use std::sync::Arc;

use crate::blocklist::{BlocklistStore, ListFetcher, ListSources, RefreshReport};
use crate::clock::Clock;
use crate::error::{Result, StorageError};
use crate::ignore::IgnoreRegistry;
use crate::matcher::Matcher;
use crate::report::{ReportLog, ReportSink, DEFAULT_MAX_REPORTS};
use crate::storage::KeyValueStore;
use crate::types::{BlockReason, IgnoreEntry, PageContent, ReportRecord, Stats, Verdict, IGNORE_DURATION_MS};

/// Tunables for a [`Blocker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockerOptions {
    pub ignore_duration_ms: u64,
    /// Retention cap for the report log; `0` keeps everything.
    pub max_reports: usize,
}

impl Default for BlockerOptions {
    fn default() -> Self {
        Self {
            ignore_duration_ms: IGNORE_DURATION_MS,
            max_reports: DEFAULT_MAX_REPORTS,
        }
    }
}

pub struct Blocker {
    blocklist: BlocklistStore,
    ignores: IgnoreRegistry,
    reports: ReportLog,
    clock: Arc<dyn Clock>,
    report_sink: Option<Arc<dyn ReportSink>>,
}

impl Blocker {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(store, clock, BlockerOptions::default())
    }

    pub fn with_options(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, options: BlockerOptions) -> Self {
        Self {
            blocklist: BlocklistStore::new(Arc::clone(&store), Arc::clone(&clock)),
            ignores: IgnoreRegistry::with_duration(
                Arc::clone(&store),
                Arc::clone(&clock),
                options.ignore_duration_ms,
            ),
            reports: ReportLog::with_capacity(store, options.max_reports),
            clock,
            report_sink: None,
        }
    }

    /// Forward reports upstream after they are logged locally.
    pub fn with_report_sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    pub fn blocklist(&self) -> &BlocklistStore {
        &self.blocklist
    }

    pub fn ignores(&self) -> &IgnoreRegistry {
        &self.ignores
    }

    pub fn reports(&self) -> &ReportLog {
        &self.reports
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Decide whether a page should be blocked.
    pub fn evaluate(&self, page: &PageContent) -> Result<Verdict> {
        let snapshot = self.blocklist.read()?;
        let result = Matcher::new(&snapshot).evaluate(page, |host| self.ignores.is_ignored(host))?;

        if let (Some(reason), Some(entry)) = (result.verdict.reason, result.matched) {
            log::debug!("{} blocked ({reason}) by '{entry}'", page.hostname);
        }
        Ok(result.verdict)
    }

    /// [`Blocker::evaluate`] for evaluation pipelines: storage failures are
    /// logged and the page is allowed.
    pub fn evaluate_or_allow(&self, page: &PageContent) -> Verdict {
        self.evaluate(page).unwrap_or_else(|e| {
            log::warn!("Evaluation of {} failed, allowing: {e}", page.hostname);
            Verdict::ALLOW
        })
    }

    // =========================================================================
    // User Actions
    // =========================================================================

    /// Exempt a site from keyword blocking; returns the expiry.
    pub fn ignore_site(&self, hostname: &str) -> std::result::Result<u64, StorageError> {
        self.ignores.ignore(hostname)
    }

    pub fn remove_ignored(&self, hostname: &str) -> std::result::Result<bool, StorageError> {
        self.ignores.remove(hostname)
    }

    pub fn is_ignored(&self, hostname: &str) -> std::result::Result<bool, StorageError> {
        self.ignores.is_ignored(hostname)
    }

    /// Active ignore entries, purging expired ones first.
    pub fn list_ignored(&self) -> std::result::Result<Vec<IgnoreEntry>, StorageError> {
        self.ignores.sweep_and_list()
    }

    pub fn sweep_ignored(&self) -> std::result::Result<usize, StorageError> {
        self.ignores.sweep()
    }

    /// Log a report locally, then forward it upstream if a sink is set.
    /// Only the local write can fail the call.
    pub fn report_link(
        &self,
        hostname: &str,
        title: &str,
        reason: BlockReason,
        client_context: &str,
    ) -> std::result::Result<ReportRecord, StorageError> {
        let record = ReportRecord {
            hostname: hostname.to_string(),
            title: title.to_string(),
            reason,
            timestamp: self.clock.now_ms(),
            client_context: client_context.to_string(),
        };
        self.reports.append(record.clone())?;
        log::info!("Link reported: {hostname} ({reason})");

        if let Some(sink) = &self.report_sink {
            if let Err(e) = sink.submit(&record) {
                log::warn!("Upstream report submission failed: {e}");
            }
        }
        Ok(record)
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    pub fn refresh_lists(&self, fetcher: &dyn ListFetcher, sources: &ListSources) -> Result<RefreshReport> {
        self.blocklist.refresh(fetcher, sources)
    }

    /// Refresh for timers and other background callers: errors are logged
    /// and swallowed, the previous snapshot stays active.
    pub fn refresh_in_background(&self, fetcher: &dyn ListFetcher, sources: &ListSources) -> Option<RefreshReport> {
        match self.refresh_lists(fetcher, sources) {
            Ok(report) => Some(report),
            Err(e) => {
                log::warn!("Error updating blocklists: {e}");
                None
            }
        }
    }

    /// Refresh only if no snapshot has ever been stored.
    pub fn ensure_initialized(
        &self,
        fetcher: &dyn ListFetcher,
        sources: &ListSources,
    ) -> Result<Option<RefreshReport>> {
        if self.blocklist.is_initialized()? {
            return Ok(None);
        }
        self.refresh_lists(fetcher, sources).map(Some)
    }

    pub fn stats(&self) -> Result<Stats> {
        let snapshot = self.blocklist.read()?;
        Ok(Stats {
            url_count: snapshot.snapshot().url_list.len(),
            word_count: snapshot.snapshot().word_list.len(),
            rejected_patterns: snapshot.patterns().rejected().len(),
            last_update_time: snapshot.last_update_time(),
            ignored_count: self.ignores.list_active()?.len(),
            report_count: self.reports.len()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{Error, FetchError};
    use crate::storage::MemoryStore;
    use crate::types::DAY_MS;

    const T0: u64 = 1_700_000_000_000;

    struct FixedFetcher {
        url: std::result::Result<String, FetchError>,
        word: std::result::Result<String, FetchError>,
    }

    impl ListFetcher for FixedFetcher {
        fn fetch(&self, endpoint: &str) -> std::result::Result<String, FetchError> {
            if endpoint == "url" {
                self.url.clone()
            } else {
                self.word.clone()
            }
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        fail: bool,
        seen: Mutex<Vec<String>>,
    }

    impl ReportSink for RecordingSink {
        fn submit(&self, record: &ReportRecord) -> std::result::Result<(), FetchError> {
            self.seen.lock().unwrap().push(record.hostname.clone());
            if self.fail {
                Err(FetchError::Unreachable {
                    endpoint: "report".into(),
                    message: "down".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _: &str) -> std::result::Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("offline".into()))
        }
        fn set(&self, _: &str, _: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Unavailable("offline".into()))
        }
        fn remove(&self, _: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Unavailable("offline".into()))
        }
    }

    fn sources() -> ListSources {
        ListSources {
            url_blacklist_endpoint: "url".into(),
            word_blacklist_endpoint: "word".into(),
        }
    }

    fn blocker() -> (Arc<ManualClock>, Blocker) {
        let clock = Arc::new(ManualClock::new(T0));
        let blocker = Blocker::new(Arc::new(MemoryStore::new()), clock.clone());
        blocker.blocklist().install("bad.com\n", "judi\ntogel\n").unwrap();
        (clock, blocker)
    }

    #[test]
    fn url_and_word_verdicts() {
        let (_, blocker) = blocker();
        let url = blocker.evaluate(&PageContent::new("sub.bad.com", "", "")).unwrap();
        assert_eq!(url, Verdict::block(BlockReason::Url));

        let word = blocker
            .evaluate(&PageContent::new("news.example", "Situs Judi Online", ""))
            .unwrap();
        assert_eq!(word, Verdict::block(BlockReason::Word));

        let clean = blocker.evaluate(&PageContent::new("rust-lang.org", "Rust", "")).unwrap();
        assert_eq!(clean, Verdict::ALLOW);
    }

    #[test]
    fn ignore_suppresses_words_for_a_week_only() {
        let (clock, blocker) = blocker();
        let page = PageContent::new("news.example", "judi", "");
        blocker.ignore_site("news.example").unwrap();

        clock.set(T0 + 6 * DAY_MS);
        assert_eq!(blocker.evaluate(&page).unwrap(), Verdict::ALLOW);

        clock.set(T0 + 8 * DAY_MS);
        assert_eq!(blocker.evaluate(&page).unwrap(), Verdict::block(BlockReason::Word));
        assert!(blocker.list_ignored().unwrap().is_empty());
    }

    #[test]
    fn ignore_never_suppresses_url_blocks() {
        let (_, blocker) = blocker();
        blocker.ignore_site("bad.com").unwrap();
        assert_eq!(
            blocker.evaluate(&PageContent::new("bad.com", "", "")).unwrap(),
            Verdict::block(BlockReason::Url)
        );
    }

    #[test]
    fn report_survives_upstream_failure() {
        let clock = Arc::new(ManualClock::new(T0));
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let blocker = Blocker::new(Arc::new(MemoryStore::new()), clock).with_report_sink(sink.clone());

        let record = blocker
            .report_link("bad.com", "Bad", BlockReason::Url, "mojublock-test")
            .unwrap();
        assert_eq!(record.timestamp, T0);
        assert_eq!(sink.seen.lock().unwrap().as_slice(), ["bad.com".to_string()]);
        assert_eq!(blocker.reports().list().unwrap(), vec![record]);
    }

    #[test]
    fn storage_failure_surfaces_for_user_actions() {
        let blocker = Blocker::new(Arc::new(BrokenStore), Arc::new(ManualClock::new(T0)));
        assert!(blocker.ignore_site("a.com").is_err());
        assert!(blocker
            .report_link("a.com", "", BlockReason::Word, "ctx")
            .is_err());
        assert!(matches!(
            blocker.evaluate(&PageContent::new("a.com", "", "")),
            Err(Error::Storage(_))
        ));
        assert_eq!(
            blocker.evaluate_or_allow(&PageContent::new("a.com", "judi", "")),
            Verdict::ALLOW
        );
    }

    #[test]
    fn background_refresh_swallows_fetch_errors() {
        let (_, blocker) = blocker();
        let fetcher = FixedFetcher {
            url: Ok("other.com".into()),
            word: Err(FetchError::Status {
                endpoint: "word".into(),
                status: 503,
            }),
        };
        assert!(blocker.refresh_in_background(&fetcher, &sources()).is_none());
        assert_eq!(blocker.stats().unwrap().last_update_time, Some(T0));
        assert_eq!(blocker.blocklist().read().unwrap().url_list(), ["bad.com".to_string()]);
    }

    #[test]
    fn ensure_initialized_refreshes_once() {
        let clock = Arc::new(ManualClock::new(T0));
        let blocker = Blocker::new(Arc::new(MemoryStore::new()), clock);
        let fetcher = FixedFetcher {
            url: Ok("a.com".into()),
            word: Ok("b".into()),
        };
        assert!(blocker.ensure_initialized(&fetcher, &sources()).unwrap().is_some());
        assert!(blocker.ensure_initialized(&fetcher, &sources()).unwrap().is_none());
    }

    #[test]
    fn stats_summarise_state() {
        let (_, blocker) = blocker();
        blocker.ignore_site("x.com").unwrap();
        blocker.report_link("y.com", "", BlockReason::Word, "ctx").unwrap();
        let stats = blocker.stats().unwrap();
        assert_eq!(
            stats,
            Stats {
                url_count: 1,
                word_count: 2,
                rejected_patterns: 0,
                last_update_time: Some(T0),
                ignored_count: 1,
                report_count: 1,
            }
        );
    }
}
