//! Tiered lookup, promotion and write-through

use crate::cache::{
    clock::{Clock, SystemClock},
    config::CacheConfig,
    entry::{CacheEntry, FixedSizeEstimator, SizeEstimator},
    metrics::{HealthReport, LookupOutcome, MetricsCollector, MetricsSnapshot},
    scheduler::{sweep_tiers, CleanupScheduler},
    store::MemoryTier,
    tier::TierBackend,
    types::{CacheKey, CacheValue, TierLevel},
};
use crate::error::{CacheError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Public entry point of the cache.
///
/// Owns three tiers (fast, medium, slow) and coordinates them:
/// - `get` probes tiers in order and copies a hit into every faster tier
/// - `set` writes the value into all three tiers independently
/// - a [`CleanupScheduler`] sweeps expired entries in the background
///
/// Tier calls are made one at a time; no operation holds two tier locks.
pub struct CacheOrchestrator<V: CacheValue> {
    config: CacheConfig,
    tiers: Vec<Arc<dyn TierBackend<V>>>,
    clock: Arc<dyn Clock>,
    metrics: MetricsCollector,
    scheduler: CleanupScheduler,
}

impl<V: CacheValue> CacheOrchestrator<V> {
    /// Create a cache with in-memory tiers and the system clock
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building a cache with custom clock, estimator or tier backends
    pub fn builder(config: CacheConfig) -> CacheOrchestratorBuilder<V> {
        CacheOrchestratorBuilder::new(config)
    }

    /// Look a key up, fastest tier first.
    ///
    /// A hit is touched in the tier that served it and copied into every
    /// faster tier with a fresh TTL window. Expired entries, tier failures and
    /// timed-out lookups all count as a miss for that tier.
    pub async fn get(&self, key: &str) -> Option<V> {
        let started = Instant::now();
        let now = self.clock.now();

        for (index, tier) in self.tiers.iter().enumerate() {
            let level = TierLevel::ALL[index];

            let entry = match self.lookup_in(tier.as_ref(), level, key).await {
                Ok(Some(entry)) if !entry.is_expired(now) => entry,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Lookup of {} in {} tier failed: {}", key, level, e);
                    continue;
                }
            };

            if let Err(e) = tier.touch(key, now).await {
                warn!("Touch of {} in {} tier failed: {}", key, level, e);
            }

            for faster in &self.tiers[..index] {
                match faster.put(entry.fresh_copy(now)).await {
                    Ok(_) => debug!("Promoted {} from {} to {} tier", key, level, faster.level()),
                    Err(e) => warn!("Promotion of {} into {} tier failed: {}", key, faster.level(), e),
                }
            }

            self.metrics
                .record(LookupOutcome::Hit(level), started.elapsed())
                .await;
            debug!("Cache hit in {} tier: {}", level, key);
            return Some(entry.value);
        }

        self.metrics.record(LookupOutcome::Miss, started.elapsed()).await;
        debug!("Cache miss: {}", key);
        None
    }

    /// Check whether any tier holds a live entry, without touching it or
    /// counting a query
    pub async fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();

        for (index, tier) in self.tiers.iter().enumerate() {
            if let Ok(Some(entry)) = self.lookup_in(tier.as_ref(), TierLevel::ALL[index], key).await {
                if !entry.is_expired(now) {
                    return true;
                }
            }
        }

        false
    }

    /// Write a value into every tier with the default TTL
    pub async fn set(&self, key: impl Into<CacheKey>, value: V) -> Result<()> {
        let ttl = self.config.ttl_with_jitter();
        self.set_with_ttl(key, value, Some(ttl)).await
    }

    /// Write a value into every tier with an explicit TTL (`None` never expires).
    ///
    /// Each tier evicts independently. A tier that rejects the write is logged
    /// and skipped; the call only fails if no tier accepted it.
    pub async fn set_with_ttl(
        &self,
        key: impl Into<CacheKey>,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let key = key.into();
        let now = self.clock.now();
        let mut stored = 0;

        for tier in &self.tiers {
            let entry = CacheEntry::new(key.clone(), value.clone(), ttl, now);
            match tier.put(entry).await {
                Ok(evicted) => {
                    stored += 1;
                    if let Some(evicted) = evicted {
                        debug!("Writing {} evicted {} from {} tier", key, evicted, tier.level());
                    }
                }
                Err(e) => warn!("Write of {} into {} tier failed: {}", key, tier.level(), e),
            }
        }

        if stored == 0 {
            return Err(CacheError::WriteFailed { key });
        }

        debug!("Stored {} in {}/{} tiers", key, stored, self.tiers.len());
        Ok(())
    }

    /// Remove a key from every tier.
    ///
    /// Returns `true` if any tier held it. Every tier is attempted; if one
    /// fails, the first failure is returned after the others are done.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut found = false;
        let mut first_error = None;

        for tier in &self.tiers {
            match tier.remove(key).await {
                Ok(removed) => found |= removed,
                Err(e) => {
                    warn!("Delete of {} from {} tier failed: {}", key, tier.level(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Deleted {}: {}", key, found);
                Ok(found)
            }
        }
    }

    /// Empty every tier. Metrics are kept.
    pub async fn clear(&self) -> Result<()> {
        let mut cleared = 0;
        let mut first_error = None;

        for tier in &self.tiers {
            match tier.clear().await {
                Ok(count) => cleared += count,
                Err(e) => {
                    warn!("Clear of {} tier failed: {}", tier.level(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        info!("Cleared {} entries from cache", cleared);
        first_error.map_or(Ok(()), Err)
    }

    /// Run one expiry sweep now. Returns how many entries were removed.
    pub async fn sweep_expired(&self) -> usize {
        sweep_tiers(&self.tiers, self.clock.now()).await
    }

    /// Number of entries in one tier
    pub async fn tier_len(&self, level: TierLevel) -> Result<usize> {
        self.tiers[level.index()].len().await
    }

    /// Copy of the current metrics, including per-tier statistics
    pub async fn get_metrics(&self) -> MetricsSnapshot {
        let mut snapshot = self.metrics.snapshot().await;

        for tier in &self.tiers {
            match tier.stats().await {
                Ok(stats) => snapshot.tiers.push(stats),
                Err(e) => warn!("Stats of {} tier unavailable: {}", tier.level(), e),
            }
        }

        snapshot
    }

    /// Health derived from hit rate and latency
    pub async fn get_health(&self) -> HealthReport {
        self.metrics.health(self.clock.now()).await
    }

    /// Zero the hit/miss counters
    pub async fn reset_metrics(&self) {
        self.metrics.reset().await;
    }

    /// Stop background sweeping. The cache stays usable; safe to call repeatedly.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    /// Whether background sweeping is active
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Configuration the cache was built with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn lookup_in(
        &self,
        tier: &dyn TierBackend<V>,
        level: TierLevel,
        key: &str,
    ) -> Result<Option<CacheEntry<V>>> {
        match self.config.tier_timeout {
            Some(limit) => tokio::time::timeout(limit, tier.lookup(key))
                .await
                .map_err(|_| CacheError::TierTimeout {
                    tier: level.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => tier.lookup(key).await,
        }
    }
}

/// Builder for [`CacheOrchestrator`]
pub struct CacheOrchestratorBuilder<V: CacheValue> {
    config: CacheConfig,
    clock: Option<Arc<dyn Clock>>,
    estimator: Option<Arc<dyn SizeEstimator<V>>>,
    tiers: [Option<Arc<dyn TierBackend<V>>>; 3],
}

impl<V: CacheValue> CacheOrchestratorBuilder<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            clock: None,
            estimator: None,
            tiers: [None, None, None],
        }
    }

    /// Use a specific time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Size estimator for the default in-memory tiers
    pub fn size_estimator(mut self, estimator: Arc<dyn SizeEstimator<V>>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Replace the backend of one tier
    pub fn tier(mut self, level: TierLevel, backend: Arc<dyn TierBackend<V>>) -> Self {
        self.tiers[level.index()] = Some(backend);
        self
    }

    /// Validate the configuration and start the cache.
    ///
    /// Fails with [`CacheError::InvalidConfig`] on a bad configuration, a tier
    /// backend whose level or capacity disagrees with its slot, or when auto
    /// cleanup is enabled outside a tokio runtime.
    pub fn build(self) -> Result<CacheOrchestrator<V>> {
        self.config.validate()?;

        if self.config.enable_auto_cleanup && tokio::runtime::Handle::try_current().is_err() {
            return Err(CacheError::InvalidConfig(
                "enable_auto_cleanup requires a running tokio runtime".to_string(),
            ));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let estimator = self
            .estimator
            .unwrap_or_else(|| Arc::new(FixedSizeEstimator::default()));
        let capacities = self.config.capacities();

        let mut tiers: Vec<Arc<dyn TierBackend<V>>> = Vec::with_capacity(3);
        for (level, custom) in TierLevel::ALL.into_iter().zip(self.tiers) {
            let tier: Arc<dyn TierBackend<V>> = match custom {
                Some(backend) if backend.level() != level => {
                    return Err(CacheError::InvalidConfig(format!(
                        "backend for the {} tier reports level {}",
                        level,
                        backend.level()
                    )));
                }
                Some(backend) if backend.capacity() != capacities[level.index()] => {
                    return Err(CacheError::InvalidConfig(format!(
                        "backend for the {} tier has capacity {}, configured {}",
                        level,
                        backend.capacity(),
                        capacities[level.index()]
                    )));
                }
                Some(backend) => backend,
                None => Arc::new(MemoryTier::with_estimator(
                    level,
                    capacities[level.index()],
                    estimator.clone(),
                )),
            };
            tiers.push(tier);
        }

        let scheduler = if self.config.enable_auto_cleanup {
            CleanupScheduler::start(tiers.clone(), clock.clone(), self.config.cleanup_interval)
        } else {
            CleanupScheduler::stopped(self.config.cleanup_interval)
        };

        info!(
            "Initialized tiered cache (capacities: {:?}, default ttl: {:?})",
            capacities, self.config.default_ttl
        );

        Ok(CacheOrchestrator {
            metrics: MetricsCollector::new(&self.config),
            config: self.config,
            tiers,
            clock,
            scheduler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;

    fn config(fast: usize, medium: usize, slow: usize) -> CacheConfig {
        CacheConfig::builder()
            .capacities(fast, medium, slow)
            .default_ttl(Duration::from_secs(60))
            .enable_auto_cleanup(false)
            .build()
    }

    fn cache_with_clock(config: CacheConfig) -> (CacheOrchestrator<i32>, ManualClock) {
        let clock = ManualClock::new();
        let cache = CacheOrchestrator::builder(config)
            .clock(Arc::new(clock.clone()))
            .build()
            .unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn test_basic_set_and_get() {
        let (cache, _) = cache_with_clock(config(10, 10, 10));

        cache.set("a", 1).await.unwrap();
        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get("b").await, None);

        let metrics = cache.get_metrics().await;
        assert_eq!(metrics.fast_hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.tiers.len(), 3);
    }

    #[tokio::test]
    async fn test_set_writes_every_tier() {
        let (cache, _) = cache_with_clock(config(10, 10, 10));
        cache.set("a", 1).await.unwrap();

        for level in TierLevel::ALL {
            assert_eq!(cache.tier_len(level).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_promotion_from_medium() {
        let (cache, _) = cache_with_clock(config(2, 10, 10));

        cache.set("a", 1).await.unwrap();
        cache.set("b", 2).await.unwrap();
        cache.set("c", 3).await.unwrap();

        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get_metrics().await.medium_hits, 1);

        assert_eq!(cache.get("a").await, Some(1));
        assert_eq!(cache.get_metrics().await.fast_hits, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let (cache, clock) = cache_with_clock(config(10, 10, 10));

        cache
            .set_with_ttl("a", 1, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.get("a").await, None);
        assert!(!cache.contains("a").await);
        // Not removed on read
        assert_eq!(cache.tier_len(TierLevel::Fast).await.unwrap(), 1);

        assert_eq!(cache.sweep_expired().await, 3);
        assert_eq!(cache.tier_len(TierLevel::Slow).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_contains_does_not_count() {
        let (cache, _) = cache_with_clock(config(10, 10, 10));
        cache.set("a", 1).await.unwrap();

        assert!(cache.contains("a").await);
        assert_eq!(cache.get_metrics().await.total_queries, 0);
    }

    #[tokio::test]
    async fn test_clear_keeps_metrics() {
        let (cache, _) = cache_with_clock(config(10, 10, 10));
        cache.set("a", 1).await.unwrap();
        cache.get("a").await;

        cache.clear().await.unwrap();
        assert_eq!(cache.get("a").await, None);

        let metrics = cache.get_metrics().await;
        assert_eq!(metrics.fast_hits, 1);
        assert_eq!(metrics.misses, 1);

        cache.reset_metrics().await;
        assert_eq!(cache.get_metrics().await.total_queries, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_fast() {
        let result = CacheOrchestrator::<i32>::new(config(0, 10, 10));
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_auto_cleanup_needs_runtime() {
        let config = CacheConfig::default();
        let result = CacheOrchestrator::<i32>::new(config);
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_backend_level_mismatch() {
        let wrong: Arc<dyn TierBackend<i32>> = Arc::new(MemoryTier::new(TierLevel::Slow, 5));
        let result = CacheOrchestrator::builder(config(1, 1, 1))
            .tier(TierLevel::Fast, wrong)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_backend_capacity_mismatch() {
        let oversized: Arc<dyn TierBackend<i32>> = Arc::new(MemoryTier::new(TierLevel::Medium, 50));
        let result = CacheOrchestrator::builder(config(1, 5, 10))
            .tier(TierLevel::Medium, oversized)
            .build();
        assert!(matches!(result, Err(CacheError::InvalidConfig(msg)) if msg.contains("capacity")));

        let matching: Arc<dyn TierBackend<i32>> = Arc::new(MemoryTier::new(TierLevel::Medium, 5));
        assert!(CacheOrchestrator::builder(config(1, 5, 10))
            .tier(TierLevel::Medium, matching)
            .build()
            .is_ok());
    }
}
