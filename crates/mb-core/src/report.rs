//! Report Log
//!
//! Append-only record of user reports. The local append is the durable side
//! effect; forwarding to an upstream endpoint is best-effort and handled by a
//! [`ReportSink`] outside this log.

use std::sync::{Arc, Mutex};

use crate::error::{FetchError, StorageError};
use crate::storage::{get_json, set_json, KeyValueStore};
use crate::types::{keys, ReportRecord};

/// Default retention: the most recent thousand reports.
pub const DEFAULT_MAX_REPORTS: usize = 1000;

/// Upstream destination for reports.
pub trait ReportSink: Send + Sync {
    fn submit(&self, record: &ReportRecord) -> Result<(), FetchError>;
}

pub struct ReportLog {
    store: Arc<dyn KeyValueStore>,
    max_reports: usize,
    write_lock: Mutex<()>,
}

impl ReportLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, DEFAULT_MAX_REPORTS)
    }

    /// `max_reports == 0` keeps every report.
    pub fn with_capacity(store: Arc<dyn KeyValueStore>, max_reports: usize) -> Self {
        Self {
            store,
            max_reports,
            write_lock: Mutex::new(()),
        }
    }

    /// Append a report, dropping the oldest ones beyond the retention cap.
    pub fn append(&self, record: ReportRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut reports = self.list()?;
        reports.push(record);

        if self.max_reports > 0 && reports.len() > self.max_reports {
            let excess = reports.len() - self.max_reports;
            reports.drain(..excess);
            log::debug!("Report log over capacity, dropped {excess} oldest");
        }

        set_json(self.store.as_ref(), keys::REPORTED_LINKS, &reports)
    }

    /// All stored reports, oldest first.
    pub fn list(&self) -> Result<Vec<ReportRecord>, StorageError> {
        Ok(get_json(self.store.as_ref(), keys::REPORTED_LINKS)?.unwrap_or_default())
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.list()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::BlockReason;

    fn record(host: &str, ts: u64) -> ReportRecord {
        ReportRecord {
            hostname: host.to_string(),
            title: "Situs Judi".to_string(),
            reason: BlockReason::Word,
            timestamp: ts,
            client_context: "test".to_string(),
        }
    }

    #[test]
    fn appends_in_order_without_dedup() {
        let log = ReportLog::new(Arc::new(MemoryStore::new()));
        log.append(record("a.com", 1)).unwrap();
        log.append(record("a.com", 2)).unwrap();
        let reports = log.list().unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].timestamp, 1);
        assert_eq!(reports[1].timestamp, 2);
    }

    #[test]
    fn retention_drops_oldest() {
        let log = ReportLog::with_capacity(Arc::new(MemoryStore::new()), 2);
        for ts in 1..=3 {
            log.append(record("a.com", ts)).unwrap();
        }
        let stamps: Vec<u64> = log.list().unwrap().iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![2, 3]);
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let log = ReportLog::with_capacity(Arc::new(MemoryStore::new()), 0);
        for ts in 0..50 {
            log.append(record("a.com", ts)).unwrap();
        }
        assert_eq!(log.len().unwrap(), 50);
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let log = Arc::new(ReportLog::new(Arc::new(MemoryStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || log.append(record(&format!("s{i}.com"), i)).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len().unwrap(), 8);
    }
}
