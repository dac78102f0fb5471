//! Cache entry and size estimation

use crate::cache::expiry::ExpiryChecker;
use crate::cache::types::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Size substituted when a value cannot be measured
pub const DEFAULT_SIZE_ESTIMATE: usize = 1024;

/// Estimates the in-memory footprint of a cached value.
///
/// Estimates are advisory and only feed metrics. Returning `None` makes the
/// tier fall back to [`DEFAULT_SIZE_ESTIMATE`].
pub trait SizeEstimator<V>: Send + Sync {
    fn estimate(&self, value: &V) -> Option<usize>;
}

/// Reports the same size for every value
#[derive(Debug, Clone, Copy)]
pub struct FixedSizeEstimator(pub usize);

impl Default for FixedSizeEstimator {
    fn default() -> Self {
        Self(DEFAULT_SIZE_ESTIMATE)
    }
}

impl<V> SizeEstimator<V> for FixedSizeEstimator {
    fn estimate(&self, _value: &V) -> Option<usize> {
        Some(self.0)
    }
}

/// Measures the length of the value's JSON encoding
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSizeEstimator;

impl<V: Serialize> SizeEstimator<V> for JsonSizeEstimator {
    fn estimate(&self, value: &V) -> Option<usize> {
        serde_json::to_vec(value).ok().map(|bytes| bytes.len())
    }
}

/// Adapts a closure into a [`SizeEstimator`]
pub struct SizeFn<F>(pub F);

impl<V, F> SizeEstimator<V> for SizeFn<F>
where
    F: Fn(&V) -> Option<usize> + Send + Sync,
{
    fn estimate(&self, value: &V) -> Option<usize> {
        (self.0)(value)
    }
}

/// Run an estimator, substituting the default on failure
pub fn estimate_or_default<V>(estimator: &dyn SizeEstimator<V>, value: &V) -> usize {
    estimator.estimate(value).unwrap_or(DEFAULT_SIZE_ESTIMATE)
}

/// A cache entry with TTL and access metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The cache key
    pub key: CacheKey,

    /// The cached value
    pub value: V,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

impl<V> CacheEntry<V> {
    /// Create a new entry inserted at `now`
    pub fn new(key: CacheKey, value: V, ttl: Option<Duration>, now: DateTime<Utc>) -> Self {
        Self {
            key,
            value,
            metadata: CacheMetadata {
                inserted_at: now,
                last_accessed_at: now,
                access_count: 0,
                ttl,
                size_bytes: 0, // Filled in by the tier on insert
            },
        }
    }

    /// Set the size estimate
    pub fn with_size(mut self, size_bytes: usize) -> Self {
        self.metadata.size_bytes = size_bytes;
        self
    }

    /// Check if the entry has expired at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        ExpiryChecker::is_expired(self, now)
    }

    /// Instant after which the entry is no longer valid
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.metadata.ttl?).ok()?;
        self.metadata.inserted_at.checked_add_signed(ttl)
    }

    /// Get time until expiration, `None` if already expired or without TTL
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Option<Duration> {
        let expires_at = self.expires_at()?;
        (expires_at - now).to_std().ok()
    }

    /// Mark the entry as accessed (updates access time and count).
    ///
    /// The access time never moves backwards, even if `now` does.
    pub fn mark_accessed(&mut self, now: DateTime<Utc>) {
        if now > self.metadata.last_accessed_at {
            self.metadata.last_accessed_at = now;
        }
        self.metadata.access_count += 1;
    }

    /// Get the age of the entry
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.metadata.inserted_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

impl<V: Clone> CacheEntry<V> {
    /// Copy the value into a fresh entry inserted at `now` with the same TTL.
    ///
    /// Used for promotion: the TTL window restarts in the receiving tier.
    pub fn fresh_copy(&self, now: DateTime<Utc>) -> Self {
        CacheEntry::new(self.key.clone(), self.value.clone(), self.metadata.ttl, now)
            .with_size(self.metadata.size_bytes)
    }
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    /// When the entry was written into its tier
    pub inserted_at: DateTime<Utc>,

    /// Last access time (for LRU tracking)
    pub last_accessed_at: DateTime<Utc>,

    /// Number of successful reads
    pub access_count: u64,

    /// Time-to-live measured from insertion, `None` never expires
    pub ttl: Option<Duration>,

    /// Approximate size of the value in bytes
    pub size_bytes: usize,
}
