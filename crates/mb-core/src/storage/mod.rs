//! Key-value persistence abstraction
//!
//! The engine persists three records under stable string keys (see
//! [`crate::types::keys`]). Everything above this module depends only on
//! [`KeyValueStore`], so hosts can back it with browser storage, files, or
//! memory.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;

/// A string-keyed store of whole records.
///
/// `set` must replace the record atomically: a concurrent `get` observes
/// either the old or the new value, never a mix.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and deserialize a JSON record.
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            }),
    }
}

/// Serialize and write a JSON record.
pub fn set_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn json_helpers_round_trip() {
        let store = MemoryStore::new();
        let mut map = BTreeMap::new();
        map.insert("a.com".to_string(), 5u64);
        set_json(&store, "k", &map).unwrap();
        let back: BTreeMap<String, u64> = get_json(&store, "k").unwrap().unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        let value: Option<Vec<String>> = get_json(&store, "absent").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn malformed_record_is_corrupt_error() {
        let store = MemoryStore::new();
        store.set("k", "{not json").unwrap();
        let err = get_json::<Vec<String>>(&store, "k").unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == "k"));
    }
}
