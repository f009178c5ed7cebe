//! Read-through result cache with a persistence health flag.
//!
//! A miss computes the value and stores it. If the store rejects the write,
//! the key is deleted and the write retried once. A final failure marks the
//! cache as degraded; while degraded, misses return
//! [`AppError::CacheUnavailable`] instead of calling the API, so a broken
//! store cannot turn every page view into a remote call. The next
//! successful store clears the flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::storage::{OptionStore, TransientStore};
use crate::utils::KEY_PREFIX;

/// Option holding the persisted health flag (`yes`/`no`).
pub const CACHE_HEALTH_OPTION: &str = "urwc_map_cache_is_working";

/// Shared "persistence is failing" flag. Clones share the same cell.
#[derive(Debug, Clone, Default)]
pub struct CacheHealth {
    degraded: Arc<AtomicBool>,
}

impl CacheHealth {
    /// A healthy flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the flag persisted by a previous process.
    pub fn restore(options: &dyn OptionStore) -> Self {
        let health = Self::new();
        match options.get_option(CACHE_HEALTH_OPTION) {
            Ok(Some(value)) if value == "no" => {
                log::warn!("Cache marked as not working by a previous run");
                health.set_degraded(true);
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not read cache health: {}", e),
        }
        health
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::Relaxed);
    }
}

/// Result of one store attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// First write succeeded
    Stored,
    /// First write failed, delete + second write succeeded
    StoredOnRetry,
    /// Both writes failed
    Failed,
}

impl StoreOutcome {
    pub fn is_stored(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Fingerprint-keyed cache over a [`TransientStore`].
#[derive(Clone)]
pub struct ResponseCache {
    transients: Arc<dyn TransientStore>,
    options: Arc<dyn OptionStore>,
    health: CacheHealth,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(
        transients: Arc<dyn TransientStore>,
        options: Arc<dyn OptionStore>,
        health: CacheHealth,
        ttl: Duration,
    ) -> Self {
        Self {
            transients,
            options,
            health,
            ttl,
        }
    }

    pub fn health(&self) -> &CacheHealth {
        &self.health
    }

    /// Return the cached value for `key`, or compute, store and return it.
    ///
    /// Errors from `compute` are returned as-is and never cached. A value
    /// that was computed is returned even if storing it failed.
    pub fn get_or_compute<T, F>(&self, key: &str, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        if let Some(hit) = self.lookup(key) {
            return Ok(hit);
        }

        if self.health.is_degraded() {
            log::warn!("Cache degraded, refusing remote call for {}", key);
            return Err(AppError::CacheUnavailable);
        }

        let value = compute()?;
        match serde_json::to_value(&value) {
            Ok(json) => {
                self.store(key, &json);
            }
            Err(e) => log::error!("Could not serialize {} for caching: {}", key, e),
        }
        Ok(value)
    }

    fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let stored = match self.transients.get(key) {
            Ok(stored) => stored?,
            Err(e) => {
                log::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_value(stored) {
            Ok(value) => {
                log::debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                log::warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store with a single delete-and-retry, then record the outcome.
    pub fn store(&self, key: &str, value: &Value) -> StoreOutcome {
        let outcome = match self.transients.set(key, value, self.ttl) {
            Ok(()) => StoreOutcome::Stored,
            Err(first) => {
                log::warn!("Cache write failed for {}: {}. Retrying once.", key, first);
                if let Err(e) = self.transients.delete(key) {
                    log::debug!("Delete before retry failed for {}: {}", key, e);
                }
                match self.transients.set(key, value, self.ttl) {
                    Ok(()) => StoreOutcome::StoredOnRetry,
                    Err(second) => {
                        log::error!("Cache write failed twice for {}: {}", key, second);
                        StoreOutcome::Failed
                    }
                }
            }
        };

        self.record(outcome);
        outcome
    }

    fn record(&self, outcome: StoreOutcome) {
        let degraded = !outcome.is_stored();
        if self.health.is_degraded() != degraded {
            log::info!(
                "Cache health changed: {}",
                if degraded { "degraded" } else { "working" }
            );
        }
        self.health.set_degraded(degraded);

        let flag = if degraded { "no" } else { "yes" };
        if let Err(e) = self.options.set_option(CACHE_HEALTH_OPTION, flag) {
            log::warn!("Could not persist cache health: {}", e);
        }
    }

    /// Delete every entry this crate has written.
    pub fn purge(&self) -> Result<usize> {
        let removed = self.transients.purge(KEY_PREFIX)?;
        log::info!("Cache purged: {} entries", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;
    use std::cell::Cell;
    use std::sync::atomic::AtomicUsize;

    /// Memory store whose next `failures` writes fail.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicUsize,
        read_fails: bool,
    }

    impl FlakyStore {
        fn failing(failures: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures: AtomicUsize::new(failures),
                read_fails: false,
            }
        }
    }

    impl TransientStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Value>> {
            if self.read_fails {
                return Err(AppError::storage("read failed"));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(AppError::storage("disk full"));
            }
            self.inner.set(key, value, ttl)
        }

        fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key)
        }

        fn purge(&self, prefix: &str) -> Result<usize> {
            self.inner.purge(prefix)
        }
    }

    fn cache_with(store: Arc<dyn TransientStore>, options: Arc<MemoryStore>) -> ResponseCache {
        let health = CacheHealth::restore(options.as_ref());
        ResponseCache::new(store, options, health, Duration::from_secs(60))
    }

    #[test]
    fn test_hit_skips_compute() {
        let options = Arc::new(MemoryStore::new());
        let cache = cache_with(Arc::new(MemoryStore::new()), options);
        let calls = Cell::new(0);

        for _ in 0..2 {
            let value: u32 = cache
                .get_or_compute("urwc_k", || {
                    calls.set(calls.get() + 1);
                    Ok(7)
                })
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_compute_error_is_not_cached() {
        let options = Arc::new(MemoryStore::new());
        let cache = cache_with(Arc::new(MemoryStore::new()), options);

        let err = cache
            .get_or_compute::<u32, _>("urwc_k", || Err(AppError::empty("No matches found")))
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyResult(_)));

        let value: u32 = cache.get_or_compute("urwc_k", || Ok(3)).unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_single_failure_is_retried() {
        let options = Arc::new(MemoryStore::new());
        let store = Arc::new(FlakyStore::failing(1));
        let cache = cache_with(store.clone(), options.clone());

        assert_eq!(cache.store("urwc_k", &json!(1)), StoreOutcome::StoredOnRetry);
        assert!(!cache.health().is_degraded());
        assert_eq!(store.inner.get("urwc_k").unwrap(), Some(json!(1)));
        assert_eq!(
            options.get_option(CACHE_HEALTH_OPTION).unwrap().as_deref(),
            Some("yes")
        );
    }

    #[test]
    fn test_double_failure_degrades_and_blocks_remote_calls() {
        let options = Arc::new(MemoryStore::new());
        let cache = cache_with(Arc::new(FlakyStore::failing(2)), options.clone());

        // The computed value is still returned.
        let value: u32 = cache.get_or_compute("urwc_a", || Ok(5)).unwrap();
        assert_eq!(value, 5);
        assert!(cache.health().is_degraded());
        assert_eq!(
            options.get_option(CACHE_HEALTH_OPTION).unwrap().as_deref(),
            Some("no")
        );

        let called = Cell::new(false);
        let err = cache
            .get_or_compute::<u32, _>("urwc_b", || {
                called.set(true);
                Ok(1)
            })
            .unwrap_err();
        assert!(matches!(err, AppError::CacheUnavailable));
        assert!(!called.get());
    }

    #[test]
    fn test_degraded_flag_survives_restart_and_clears_on_success() {
        let options = Arc::new(MemoryStore::new());
        options.set_option(CACHE_HEALTH_OPTION, "no").unwrap();

        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(store.clone(), options.clone());
        assert!(cache.health().is_degraded());

        // Hits are still served while degraded.
        store.set("urwc_hit", &json!(9), Duration::from_secs(60)).unwrap();
        let value: u32 = cache.get_or_compute("urwc_hit", || Ok(0)).unwrap();
        assert_eq!(value, 9);

        assert_eq!(cache.store("urwc_new", &json!(1)), StoreOutcome::Stored);
        assert!(!cache.health().is_degraded());
    }

    #[test]
    fn test_health_is_shared_between_clones() {
        let options = Arc::new(MemoryStore::new());
        let cache = cache_with(Arc::new(FlakyStore::failing(2)), options);
        let other = cache.clone();

        cache.store("urwc_k", &json!(1));
        assert!(other.health().is_degraded());
    }

    #[test]
    fn test_read_error_counts_as_miss() {
        let options = Arc::new(MemoryStore::new());
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::new(),
            failures: AtomicUsize::new(0),
            read_fails: true,
        });
        let cache = cache_with(store, options);

        let value: u32 = cache.get_or_compute("urwc_k", || Ok(4)).unwrap();
        assert_eq!(value, 4);
    }

    #[test]
    fn test_unreadable_entry_is_recomputed() {
        let options = Arc::new(MemoryStore::new());
        let store = Arc::new(MemoryStore::new());
        store
            .set("urwc_k", &json!("not a number"), Duration::from_secs(60))
            .unwrap();
        let cache = cache_with(store, options);

        let value: u32 = cache.get_or_compute("urwc_k", || Ok(2)).unwrap();
        assert_eq!(value, 2);
    }

    #[test]
    fn test_purge_removes_only_prefixed_keys() {
        let options = Arc::new(MemoryStore::new());
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(store.clone(), options);

        cache.store("urwc_a", &json!(1));
        store.set("foreign", &json!(2), Duration::from_secs(60)).unwrap();

        assert_eq!(cache.purge().unwrap(), 1);
        assert_eq!(store.get("foreign").unwrap(), Some(json!(2)));
    }
}
