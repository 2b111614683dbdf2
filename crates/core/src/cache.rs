//! # Query Cache
//!
//! Bounded LRU memoization of `(SQL text, bound params) -> ResultSet`.
//!
//! The lock only covers map bookkeeping. Store round trips in
//! [`QueryCache::get_or_execute`] run with the lock released, so a slow query
//! never blocks hits on other keys. Two concurrent misses on the same key both
//! reach the store and both insert the same immutable result.
//!
//! Only successful results are cached. Empty results are cached for a limited
//! horizon (`not_found_ttl`), since the backing data is append-only history
//! but a missing day may still be loaded later.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use sheetlink_common::config::CacheSettings;
use tracing::debug;

use crate::value::{QueryKey, ResultSet, SharedResultSet};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: NonZeroUsize,
    /// Lifetime of cached empty results; zero disables caching them.
    pub not_found_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: NonZeroUsize::new(128).unwrap_or(NonZeroUsize::MIN),
            not_found_ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            ..Self::default()
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            capacity: NonZeroUsize::new(settings.capacity).unwrap_or(NonZeroUsize::MIN),
            not_found_ttl: Duration::from_secs(settings.not_found_ttl_secs),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: SharedResultSet,
    inserted_at: Instant,
}

pub struct QueryCache {
    config: CacheConfig,
    entries: Mutex<LruCache<QueryKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    pub fn new(config: CacheConfig) -> Self {
        debug!(
            target: "cache",
            enabled = config.enabled,
            capacity = config.capacity.get(),
            not_found_ttl_secs = config.not_found_ttl.as_secs(),
            "Initializing query cache"
        );
        Self {
            entries: Mutex::new(LruCache::new(config.capacity)),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<QueryKey, CacheEntry>> {
        // Entries are immutable; a panic mid-insert cannot leave a torn value.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up `key`, refreshing its recency on a hit.
    pub fn get(&self, key: &QueryKey) -> Option<SharedResultSet> {
        if !self.config.enabled {
            return None;
        }

        let found = {
            let mut entries = self.lock();
            let expired = matches!(
                entries.get(key),
                Some(entry) if entry.result.is_empty()
                    && entry.inserted_at.elapsed() >= self.config.not_found_ttl
            );
            if expired {
                entries.pop(key);
                None
            } else {
                entries.get(key).map(|entry| entry.result.clone())
            }
        };

        match found {
            Some(result) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(target: "cache", sql = key.sql(), "Cache hit");
                Some(result)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a successful result, evicting the least recently used entry
    /// when full.
    pub fn put(&self, key: QueryKey, result: SharedResultSet) {
        if !self.config.enabled {
            return;
        }
        if result.is_empty() && self.config.not_found_ttl.is_zero() {
            return;
        }

        let entry = CacheEntry {
            result,
            inserted_at: Instant::now(),
        };
        let evicted = self.lock().push(key.clone(), entry);

        if let Some((evicted_key, _)) = evicted {
            if evicted_key != key {
                debug!(target: "cache", sql = evicted_key.sql(), "Evicted cache entry");
            }
        }
    }

    /// Return the cached result for `key` or run `execute` and cache what it
    /// returns. Errors pass through and are never cached.
    pub fn get_or_execute<F>(&self, key: QueryKey, execute: F) -> sheetlink_error::Result<SharedResultSet>
    where
        F: FnOnce(&QueryKey) -> sheetlink_error::Result<ResultSet>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let result = Arc::new(execute(&key)?);
        self.put(key, result.clone());
        Ok(result)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.config.enabled,
            entry_count: self.lock().len(),
            capacity: self.config.capacity.get(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entry_count: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}
