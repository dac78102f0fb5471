//! In-memory tier with LRU eviction

use crate::cache::{
    entry::{estimate_or_default, CacheEntry, FixedSizeEstimator, SizeEstimator},
    tier::TierBackend,
    types::{CacheKey, CacheValue, TierLevel, TierStats},
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Bounded in-memory tier.
///
/// This implementation provides:
/// - Thread-safe async access via one RwLock per tier
/// - Entry-count bound enforced by evicting before inserting
/// - Pure recency LRU with constant-time touch, insert and remove
/// - Advisory size tracking through a pluggable [`SizeEstimator`]
pub struct MemoryTier<V> {
    level: TierLevel,
    capacity: usize,
    estimator: Arc<dyn SizeEstimator<V>>,
    store: RwLock<TierStore<V>>,
}

/// Internal tier storage
struct TierStore<V> {
    /// Entries in recency order, least recently touched at the tail.
    /// Unbounded; the tier enforces its own capacity so it can count evictions.
    entries: LruCache<CacheKey, CacheEntry<V>>,

    /// Sum of size estimates
    current_size_bytes: usize,

    evictions: u64,
    expirations: u64,
}

impl<V> TierStore<V> {
    fn remove_entry(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.release(&entry);
                true
            }
            None => false,
        }
    }

    fn release(&mut self, entry: &CacheEntry<V>) {
        self.current_size_bytes = self
            .current_size_bytes
            .saturating_sub(entry.metadata.size_bytes);
    }
}

impl<V: CacheValue> MemoryTier<V> {
    /// Create a tier using the default fixed size estimate
    pub fn new(level: TierLevel, capacity: usize) -> Self {
        Self::with_estimator(level, capacity, Arc::new(FixedSizeEstimator::default()))
    }

    /// Create a tier with a custom size estimator
    pub fn with_estimator(
        level: TierLevel,
        capacity: usize,
        estimator: Arc<dyn SizeEstimator<V>>,
    ) -> Self {
        debug!("Initializing {} tier with capacity {}", level, capacity);

        Self {
            level,
            capacity,
            estimator,
            store: RwLock::new(TierStore {
                entries: LruCache::unbounded(),
                current_size_bytes: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    /// Keys in eviction order, least recently touched first
    pub async fn lru_order(&self) -> Vec<CacheKey> {
        let store = self.store.read().await;
        store.entries.iter().rev().map(|(key, _)| key.clone()).collect()
    }
}

#[async_trait]
impl<V: CacheValue> TierBackend<V> for MemoryTier<V> {
    fn level(&self) -> TierLevel {
        self.level
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    async fn lookup(&self, key: &str) -> Result<Option<CacheEntry<V>>> {
        let store = self.store.read().await;
        Ok(store.entries.peek(key).cloned())
    }

    async fn touch(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut store = self.store.write().await;

        // get_mut moves the entry to the head of the recency list
        match store.entries.get_mut(key) {
            Some(entry) => {
                entry.mark_accessed(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn put(&self, mut entry: CacheEntry<V>) -> Result<Option<CacheKey>> {
        entry.metadata.size_bytes = estimate_or_default(self.estimator.as_ref(), &entry.value);
        let key = entry.key.clone();
        let size = entry.metadata.size_bytes;

        let mut store = self.store.write().await;

        if let Some(existing) = store.entries.get_mut(&key) {
            // Replacement: same key, no eviction
            let old_size = std::mem::replace(existing, entry).metadata.size_bytes;
            store.current_size_bytes = store.current_size_bytes.saturating_sub(old_size) + size;
            debug!("Replaced entry in {} tier: {}", self.level, key);
            return Ok(None);
        }

        let mut evicted = None;
        while store.entries.len() >= self.capacity {
            let Some((victim, old)) = store.entries.pop_lru() else {
                break;
            };
            debug!("Evicting entry from {} tier: {}", self.level, victim);
            store.release(&old);
            store.evictions += 1;
            evicted = Some(victim);
        }

        store.entries.put(key, entry);
        store.current_size_bytes += size;

        Ok(evicted)
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let mut store = self.store.write().await;
        Ok(store.remove_entry(key))
    }

    async fn clear(&self) -> Result<usize> {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.current_size_bytes = 0;

        Ok(count)
    }

    async fn len(&self) -> Result<usize> {
        let store = self.store.read().await;
        Ok(store.entries.len())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut store = self.store.write().await;

        let expired_keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            store.remove_entry(key);
        }
        store.expirations += expired_keys.len() as u64;

        if !expired_keys.is_empty() {
            debug!(
                "Swept {} expired entries from {} tier",
                expired_keys.len(),
                self.level
            );
        }

        Ok(expired_keys.len())
    }

    async fn stats(&self) -> Result<TierStats> {
        let store = self.store.read().await;

        Ok(TierStats {
            tier: self.level,
            entries: store.entries.len(),
            capacity: self.capacity,
            size_bytes: store.current_size_bytes,
            evictions: store.evictions,
            expirations: store.expirations,
        })
    }
}
