//! Blocklist Store
//!
//! Holds the active [`BlocklistSnapshot`] and its compiled keyword set.
//! A refresh fetches both remote lists, and only when both succeed is the
//! new snapshot persisted and swapped in. Readers hold an `Arc` to the
//! snapshot they started with, so a concurrent refresh is never half-visible.

use std::sync::{Arc, Mutex, RwLock};

use crate::clock::Clock;
use crate::error::{FetchError, Result, StorageError};
use crate::list::{parse_list_with_stats, ParseStats};
use crate::patterns::PatternSet;
use crate::storage::{get_json, set_json, KeyValueStore};
use crate::types::{keys, BlocklistSnapshot};

// =============================================================================
// Sources
// =============================================================================

/// Where the two remote lists live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSources {
    pub url_blacklist_endpoint: String,
    pub word_blacklist_endpoint: String,
}

/// Retrieves raw list text. Implementations must give up after a bounded
/// time and report it as [`FetchError::Timeout`].
pub trait ListFetcher: Send + Sync {
    fn fetch(&self, endpoint: &str) -> std::result::Result<String, FetchError>;
}

// =============================================================================
// Compiled Snapshot
// =============================================================================

/// A snapshot together with its precompiled keyword patterns.
#[derive(Debug, Default)]
pub struct CompiledSnapshot {
    snapshot: BlocklistSnapshot,
    patterns: PatternSet,
}

impl CompiledSnapshot {
    pub fn compile(snapshot: BlocklistSnapshot) -> Self {
        let patterns = PatternSet::compile(&snapshot.word_list);
        Self { snapshot, patterns }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &BlocklistSnapshot {
        &self.snapshot
    }

    pub fn url_list(&self) -> &[String] {
        &self.snapshot.url_list
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    pub fn last_update_time(&self) -> Option<u64> {
        self.snapshot.last_update_time
    }
}

/// Summary of a successful refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub url_stats: ParseStats,
    pub word_stats: ParseStats,
    pub rejected_patterns: usize,
    pub last_update_time: u64,
}

// =============================================================================
// Store
// =============================================================================

pub struct BlocklistStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<CompiledSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl BlocklistStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The active snapshot, loading it from storage on first use.
    /// Returns an empty snapshot if none was ever stored.
    pub fn read(&self) -> std::result::Result<Arc<CompiledSnapshot>, StorageError> {
        if let Some(current) = self
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Ok(Arc::clone(current));
        }

        let mut slot = self.current.write().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = slot.as_ref() {
            return Ok(Arc::clone(current));
        }

        let compiled = match get_json::<BlocklistSnapshot>(self.store.as_ref(), keys::BLOCKLIST)? {
            Some(snapshot) => CompiledSnapshot::compile(snapshot),
            None => CompiledSnapshot::empty(),
        };
        let compiled = Arc::new(compiled);
        *slot = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Drop the in-memory copy so the next read reloads from storage.
    pub fn reload(&self) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Whether any refresh has ever succeeded.
    pub fn is_initialized(&self) -> std::result::Result<bool, StorageError> {
        Ok(self.read()?.last_update_time().is_some())
    }

    /// Fetch both lists and replace the snapshot.
    ///
    /// Concurrent refreshes are queued behind one another. If either fetch
    /// fails nothing is written and the previous snapshot stays active.
    pub fn refresh(&self, fetcher: &dyn ListFetcher, sources: &ListSources) -> Result<RefreshReport> {
        let _guard = self.refresh_lock.lock().unwrap_or_else(|e| e.into_inner());

        log::info!("Updating blocklists...");
        let url_text = fetcher.fetch(&sources.url_blacklist_endpoint)?;
        let word_text = fetcher.fetch(&sources.word_blacklist_endpoint)?;

        self.install_locked(&url_text, &word_text)
    }

    /// Replace the snapshot from already-fetched list text.
    pub fn install(&self, url_text: &str, word_text: &str) -> Result<RefreshReport> {
        let _guard = self.refresh_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.install_locked(url_text, word_text)
    }

    fn install_locked(&self, url_text: &str, word_text: &str) -> Result<RefreshReport> {
        let (url_list, url_stats) = parse_list_with_stats(url_text);
        let (word_list, word_stats) = parse_list_with_stats(word_text);
        let now = self.clock.now_ms();

        let snapshot = BlocklistSnapshot::new(url_list, word_list, now);
        set_json(self.store.as_ref(), keys::BLOCKLIST, &snapshot)?;

        let compiled = Arc::new(CompiledSnapshot::compile(snapshot));
        let rejected_patterns = compiled.patterns().rejected().len();
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(compiled);

        log::info!(
            "Blocklists updated - URLs: {}, Words: {} ({} rejected)",
            url_stats.entries,
            word_stats.entries,
            rejected_patterns
        );

        Ok(RefreshReport {
            url_stats,
            word_stats,
            rejected_patterns,
            last_update_time: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::clock::ManualClock;
    use crate::error::Error;
    use crate::storage::MemoryStore;

    struct StaticFetcher(HashMap<&'static str, std::result::Result<&'static str, FetchError>>);

    impl ListFetcher for StaticFetcher {
        fn fetch(&self, endpoint: &str) -> std::result::Result<String, FetchError> {
            match self.0.get(endpoint) {
                Some(Ok(text)) => Ok(text.to_string()),
                Some(Err(e)) => Err(e.clone()),
                None => Err(FetchError::Unreachable {
                    endpoint: endpoint.to_string(),
                    message: "no route".to_string(),
                }),
            }
        }
    }

    fn sources() -> ListSources {
        ListSources {
            url_blacklist_endpoint: "url".to_string(),
            word_blacklist_endpoint: "word".to_string(),
        }
    }

    fn new_store(clock: Arc<ManualClock>) -> (Arc<MemoryStore>, BlocklistStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = BlocklistStore::new(kv.clone(), clock);
        (kv, store)
    }

    #[test]
    fn empty_before_first_refresh() {
        let (_, store) = new_store(Arc::new(ManualClock::new(0)));
        let current = store.read().unwrap();
        assert!(current.snapshot().is_empty());
        assert_eq!(current.last_update_time(), None);
        assert!(!store.is_initialized().unwrap());
    }

    #[test]
    fn refresh_replaces_both_lists_and_timestamp() {
        let clock = Arc::new(ManualClock::new(1_000));
        let (kv, store) = new_store(clock);
        let fetcher = StaticFetcher(HashMap::from([
            ("url", Ok("# hosts\nbad.com\n")),
            ("word", Ok("judi\n(broken\n")),
        ]));

        let report = store.refresh(&fetcher, &sources()).unwrap();
        assert_eq!(report.url_stats.entries, 1);
        assert_eq!(report.word_stats.entries, 2);
        assert_eq!(report.rejected_patterns, 1);
        assert_eq!(report.last_update_time, 1_000);

        let current = store.read().unwrap();
        assert_eq!(current.url_list(), ["bad.com".to_string()]);
        assert_eq!(current.snapshot().word_list.len(), 2);
        assert_eq!(current.patterns().len(), 1);

        let persisted: BlocklistSnapshot = get_json(kv.as_ref(), keys::BLOCKLIST).unwrap().unwrap();
        assert_eq!(&persisted, current.snapshot());
    }

    #[test]
    fn failed_word_fetch_leaves_previous_snapshot() {
        let clock = Arc::new(ManualClock::new(1_000));
        let (_, store) = new_store(clock.clone());
        store.install("old.com", "oldword").unwrap();

        clock.advance(10_000);
        let fetcher = StaticFetcher(HashMap::from([
            ("url", Ok("new.com")),
            (
                "word",
                Err(FetchError::Timeout {
                    endpoint: "word".to_string(),
                }),
            ),
        ]));

        let err = store.refresh(&fetcher, &sources()).unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::Timeout { .. })));

        let current = store.read().unwrap();
        assert_eq!(current.url_list(), ["old.com".to_string()]);
        assert_eq!(current.snapshot().word_list, vec!["oldword".to_string()]);
        assert_eq!(current.last_update_time(), Some(1_000));
    }

    #[test]
    fn snapshot_survives_restart() {
        let clock = Arc::new(ManualClock::new(5));
        let kv = Arc::new(MemoryStore::new());
        BlocklistStore::new(kv.clone(), clock.clone())
            .install("a.com\nb.com", "judi")
            .unwrap();

        let restarted = BlocklistStore::new(kv, clock);
        let current = restarted.read().unwrap();
        assert_eq!(current.url_list().len(), 2);
        assert_eq!(current.patterns().len(), 1);
        assert!(restarted.is_initialized().unwrap());
    }

    #[test]
    fn reader_keeps_its_snapshot_across_a_refresh() {
        let (_, store) = new_store(Arc::new(ManualClock::new(0)));
        store.install("first.com", "").unwrap();
        let held = store.read().unwrap();

        store.install("second.com", "").unwrap();
        assert_eq!(held.url_list(), ["first.com".to_string()]);
        assert_eq!(store.read().unwrap().url_list(), ["second.com".to_string()]);
    }

    /// Numbers every fetch and records the peak number of fetches in flight.
    struct SlowFetcher {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ListFetcher for SlowFetcher {
        fn fetch(&self, endpoint: &str) -> std::result::Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(match endpoint {
                "url" => format!("host{n}.com\n"),
                _ => format!("word{n}\n"),
            })
        }
    }

    #[test]
    fn concurrent_refreshes_are_queued() {
        let (_, store) = new_store(Arc::new(ManualClock::new(5)));
        let fetcher = SlowFetcher {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        };

        std::thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| store.refresh(&fetcher, &sources()).unwrap());
            }
        });

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
        assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);

        // Both lists of the surviving snapshot come from the same refresh.
        let current = store.read().unwrap();
        let url_gen: usize = current.url_list()[0]
            .trim_start_matches("host")
            .trim_end_matches(".com")
            .parse()
            .unwrap();
        assert_eq!(current.snapshot().word_list, vec![format!("word{}", url_gen + 1)]);
    }
}
