//! In-process store for tests and hosts without persistence.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::storage::{CacheEntry, OptionStore, TransientStore};

/// Both stores kept in memory. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transients: Mutex<HashMap<String, CacheEntry>>,
    options: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transients, expired ones included.
    pub fn transient_count(&self) -> usize {
        self.transients.lock().map(|t| t.len()).unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::storage("memory store lock poisoned"))
}

impl TransientStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut transients = lock(&self.transients)?;
        match transients.get(key) {
            Some(entry) if entry.is_expired() => {
                transients.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        lock(&self.transients)?.insert(key.to_string(), CacheEntry::new(value.clone(), ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        lock(&self.transients)?.remove(key);
        Ok(())
    }

    fn purge(&self, prefix: &str) -> Result<usize> {
        let mut transients = lock(&self.transients)?;
        let before = transients.len();
        transients.retain(|key, _| !key.starts_with(prefix));
        Ok(before - transients.len())
    }
}

impl OptionStore for MemoryStore {
    fn get_option(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.options)?.get(key).cloned())
    }

    fn set_option(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.options)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_option(&self, key: &str) -> Result<()> {
        lock(&self.options)?.remove(key);
        Ok(())
    }
}
