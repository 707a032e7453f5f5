//! # TTL Cache
//!
//! Shared key-value cache with per-entry expiry. Used for event-id
//! deduplication, listener cursors, and cached head heights. TTL-only: no
//! LRU, no size bound. Reads and writes are atomic per key.

use std::time::{Duration, Instant};

use dashmap::DashMap;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// A concurrent TTL cache.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given default entry lifetime.
    pub fn new(default_ttl_ms: u64) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl: Duration::from_millis(default_ttl_ms),
        }
    }

    /// Look up a live entry. Expired entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            if Instant::now() < entry.expires_at {
                return Some(entry.value.clone());
            }
        }
        // Entry expired between insert and this read.
        self.entries.remove(key);
        None
    }

    /// True if a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert with the default TTL, replacing any prior entry.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL, replacing any prior entry.
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Remove an entry, returning its value if it was still live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(key)
            .filter(|(_, entry)| now < entry.expires_at)
            .map(|(_, entry)| entry.value)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| now < entry.expires_at);
    }

    /// Number of entries currently stored (live or not yet purged).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
