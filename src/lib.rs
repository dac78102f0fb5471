//! # Ouroboros Cache (ouroboros-cache)
//!
//! A three-tier write-through cache for async Rust services.
//!
//! ## Features
//!
//! - Fast, medium and slow tiers, each a bounded LRU store
//! - Write-through on `set`, promotion into faster tiers on `get`
//! - Insertion-relative TTL with a cancellable background sweep
//! - Hit/miss metrics with healthy/degraded/unhealthy derivation
//! - Injectable clock for deterministic expiry tests
//! - Pluggable tier backends behind an async trait
//!
//! ## Basic Usage
//!
//! ```no_run
//! use ouroboros_cache::{CacheConfig, CacheOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache: CacheOrchestrator<String> = CacheOrchestrator::new(CacheConfig::default())?;
//!
//!     cache.set("greeting", "hello".to_string()).await?;
//!     assert_eq!(cache.get("greeting").await.as_deref(), Some("hello"));
//!
//!     let health = cache.get_health().await;
//!     println!("Status: {}", health.status);
//!
//!     cache.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Findings Store
//!
//! [`FindingsStore`] shows how a consumer rides on the cache: TTLs scale with
//! importance, and empty queries leave negative markers.
//!
//! ```no_run
//! use ouroboros_cache::{CacheConfig, CacheOrchestrator, Finding, FindingsConfig, FindingsStore, Importance};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(CacheOrchestrator::new(CacheConfig::default())?);
//!     let store = FindingsStore::new(cache, FindingsConfig::default())?;
//!
//!     let finding = Finding::new("hit rate below 50%", "ops");
//!     store.store(finding, Importance::from_score(0.8)).await?;
//!
//!     let results = store
//!         .search("disk latency", |_query| async { Ok::<_, anyhow::Error>(Vec::new()) })
//!         .await?;
//!     assert!(results.is_empty());
//!     assert!(store.is_known_miss("disk latency").await);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod findings;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheEntry, CacheKey, CacheOrchestrator,
    CacheOrchestratorBuilder, CacheValue, Clock, HealthReport, HealthStatus, HealthThresholds,
    ManualClock, MemoryTier, MetricsSnapshot, SystemClock, TierBackend, TierLevel, TierStats,
};
pub use error::{CacheError, Result};
pub use findings::{Finding, FindingsConfig, FindingsStore, FindingsValue, Importance};
