//! The storage contract each tier of the ladder fulfils
//!
//! Orchestration, promotion and sweeping only talk to tiers through
//! [`TierBackend`], so a tier can be an in-memory map, a disk store or a
//! remote service without the orchestrator noticing.

use crate::cache::entry::CacheEntry;
use crate::cache::types::{CacheKey, CacheValue, TierLevel, TierStats};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One bounded key/value store in the fast-to-slow ladder.
///
/// Implementations must keep `len() <= capacity()` once any call returns,
/// evicting the least recently touched entry before inserting a new key.
/// Each call is atomic with respect to other calls on the same tier.
#[async_trait]
pub trait TierBackend<V: CacheValue>: Send + Sync {
    /// Which rung of the ladder this tier occupies
    fn level(&self) -> TierLevel;

    /// Maximum number of entries
    fn capacity(&self) -> usize;

    /// Read an entry without touching its access metadata
    async fn lookup(&self, key: &str) -> Result<Option<CacheEntry<V>>>;

    /// Record a successful read. Returns `false` if the key is gone.
    async fn touch(&self, key: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Insert or replace an entry. Returns the key evicted to make room, if any.
    async fn put(&self, entry: CacheEntry<V>) -> Result<Option<CacheKey>>;

    /// Remove a key. Returns `true` if it was present.
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Remove every entry. Returns how many were dropped.
    async fn clear(&self) -> Result<usize>;

    /// Number of entries currently stored
    async fn len(&self) -> Result<usize>;

    /// Remove every entry expired at `now`. Returns how many were dropped.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize>;

    /// Current statistics
    async fn stats(&self) -> Result<TierStats>;
}
