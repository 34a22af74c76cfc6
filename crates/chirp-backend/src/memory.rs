use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::store::{KeyValueStore, StorageError};

/// In-process store. Backs tests and single-process deployments.
///
/// Writes to keys under an injected failure prefix are rejected, which lets
/// callers exercise the all-or-nothing paths above the storage tier.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
    failing_prefixes: Mutex<Vec<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent put/delete whose key starts with `prefix`.
    pub fn fail_writes_with_prefix(&self, prefix: impl Into<Vec<u8>>) {
        if let Ok(mut prefixes) = self.failing_prefixes.lock() {
            prefixes.push(prefix.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut prefixes) = self.failing_prefixes.lock() {
            prefixes.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(key))
            .unwrap_or(false)
    }

    fn check_writable(&self, key: &[u8]) -> Result<(), StorageError> {
        let prefixes = self
            .failing_prefixes
            .lock()
            .map_err(|e| StorageError::Connection(format!("store lock poisoned: {}", e)))?;
        if prefixes.iter().any(|p| key.starts_with(p)) {
            return Err(StorageError::Rejected(format!(
                "writes to {} are failing",
                String::from_utf8_lossy(key)
            )));
        }
        Ok(())
    }

    fn with_entries<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut BTreeMap<Vec<u8>, Vec<u8>>) -> Result<T, StorageError>,
    {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(format!("store lock poisoned: {}", e)))?;
        f(&mut entries)
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.with_entries(|entries| {
            entries.insert(key.to_vec(), value.to_vec());
            Ok(())
        })
    }

    fn get(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>, StorageError> {
        self.with_entries(|entries| Ok(keys.iter().map(|k| entries.get(k).cloned()).collect()))
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.check_writable(key)?;
        self.with_entries(|entries| match entries.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound),
        })
    }
}
