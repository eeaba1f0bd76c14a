//! Ignore Registry
//!
//! Time-bounded exemptions from keyword blocking, keyed by hostname.
//! Reads are pure; purging expired entries is the separate [`IgnoreRegistry::sweep`]
//! operation. Every write is a read-modify-write of the whole map performed
//! under one lock, so two tabs ignoring different hosts never lose an update.

use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::error::StorageError;
use crate::storage::{get_json, set_json, KeyValueStore};
use crate::types::{keys, IgnoreEntry, IgnoreMap, IGNORE_DURATION_MS};

/// An entry is expired once its expiry instant has been reached.
#[inline]
pub fn is_expired(expiry: u64, now: u64) -> bool {
    expiry <= now
}

pub struct IgnoreRegistry {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    duration_ms: u64,
    write_lock: Mutex<()>,
}

impl IgnoreRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_duration(store, clock, IGNORE_DURATION_MS)
    }

    pub fn with_duration(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, duration_ms: u64) -> Self {
        Self {
            store,
            clock,
            duration_ms,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<IgnoreMap, StorageError> {
        Ok(get_json(self.store.as_ref(), keys::IGNORED_SITES)?.unwrap_or_default())
    }

    fn save(&self, map: &IgnoreMap) -> Result<(), StorageError> {
        set_json(self.store.as_ref(), keys::IGNORED_SITES, map)
    }

    fn update<R>(&self, f: impl FnOnce(&mut IgnoreMap, u64) -> (R, bool)) -> Result<R, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut map = self.load()?;
        let (result, changed) = f(&mut map, self.clock.now_ms());
        if changed {
            self.save(&map)?;
        }
        Ok(result)
    }

    /// Whether `hostname` currently has an unexpired exemption.
    pub fn is_ignored(&self, hostname: &str) -> Result<bool, StorageError> {
        let now = self.clock.now_ms();
        Ok(self
            .load()?
            .get(hostname)
            .is_some_and(|&expiry| !is_expired(expiry, now)))
    }

    /// Exempt `hostname` until now + the ignore duration. Re-ignoring
    /// restarts the window rather than extending it.
    pub fn ignore(&self, hostname: &str) -> Result<u64, StorageError> {
        let expiry = self.update(|map, now| {
            let expiry = now.saturating_add(self.duration_ms);
            map.insert(hostname.to_string(), expiry);
            (expiry, true)
        })?;
        log::info!("{hostname} ignored until {expiry}");
        Ok(expiry)
    }

    /// Delete the exemption for `hostname`. Idempotent.
    pub fn remove(&self, hostname: &str) -> Result<bool, StorageError> {
        self.update(|map, _| {
            let removed = map.remove(hostname).is_some();
            (removed, removed)
        })
    }

    /// Purge expired entries, returning how many were removed.
    pub fn sweep(&self) -> Result<usize, StorageError> {
        let purged = self.update(|map, now| {
            let before = map.len();
            map.retain(|_, &mut expiry| !is_expired(expiry, now));
            let purged = before - map.len();
            (purged, purged > 0)
        })?;
        if purged > 0 {
            log::debug!("Swept {purged} expired ignore entries");
        }
        Ok(purged)
    }

    /// Unexpired entries, sorted by hostname. Does not write.
    pub fn list_active(&self) -> Result<Vec<IgnoreEntry>, StorageError> {
        let now = self.clock.now_ms();
        Ok(self
            .load()?
            .into_iter()
            .filter(|&(_, expiry)| !is_expired(expiry, now))
            .map(|(hostname, expiry)| IgnoreEntry { hostname, expiry })
            .collect())
    }

    /// Sweep, then list: the management view.
    pub fn sweep_and_list(&self) -> Result<Vec<IgnoreEntry>, StorageError> {
        self.sweep()?;
        self.list_active()
    }
}
