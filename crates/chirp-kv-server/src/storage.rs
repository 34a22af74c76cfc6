use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Result, anyhow};

/// The storage tier's data: a flat map of opaque keys to opaque values.
#[derive(Default)]
pub struct KvStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow!("KV lock poisoned: {}", e))?;
        entries.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| anyhow!("KV lock poisoned: {}", e))?;
        Ok(entries.get(key).cloned())
    }

    /// Returns false if the key was absent.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| anyhow!("KV lock poisoned: {}", e))?;
        Ok(entries.remove(key).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
