use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::StorageError;

use super::KeyValueStore;

/// In-process store. Used by tests and by the wasm bindings, where the
/// host page owns real persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.remove(key);
        Ok(())
    }
}
