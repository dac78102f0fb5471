//! # Tiered Cache Engine
//!
//! This module implements a three-tier key/value cache: a fast tier in front
//! of a medium and a slow one (memory, disk and network in storage terms).
//!
//! ## Features
//!
//! - **Write-Through**: `set` stores the value in every tier independently
//! - **Read Promotion**: a hit in a slower tier is copied into all faster tiers
//! - **LRU Eviction**: each tier is bounded by entry count and evicts the least
//!   recently touched entry before inserting
//! - **TTL Expiration**: measured from insertion, never extended by reads
//! - **Background Sweep**: a cancellable task removes expired entries
//! - **Metrics & Health**: per-tier hit counters, rolling latency, derived health
//! - **Pluggable Backends**: every tier sits behind [`TierBackend`]
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_cache::cache::{CacheConfig, CacheOrchestrator};
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder()
//!     .capacities(100, 1_000, 10_000)
//!     .default_ttl(Duration::from_secs(600))
//!     .build();
//!
//! let cache = CacheOrchestrator::new(config)?;
//!
//! cache.set("query:123", "cached response".to_string()).await?;
//!
//! if let Some(value) = cache.get("query:123").await {
//!     println!("Cache hit: {}", value);
//! }
//!
//! cache.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod entry;
pub mod expiry;
pub mod metrics;
pub mod orchestrator;
pub mod scheduler;
pub mod store;
pub mod tier;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheConfigBuilder, HealthThresholds, MAX_TTL};
pub use entry::{
    CacheEntry, CacheMetadata, FixedSizeEstimator, JsonSizeEstimator, SizeEstimator, SizeFn,
    DEFAULT_SIZE_ESTIMATE,
};
pub use expiry::ExpiryChecker;
pub use metrics::{HealthDetails, HealthReport, HealthStatus, LookupOutcome, MetricsSnapshot};
pub use orchestrator::{CacheOrchestrator, CacheOrchestratorBuilder};
pub use scheduler::CleanupScheduler;
pub use store::MemoryTier;
pub use tier::TierBackend;
pub use types::{CacheKey, CacheValue, TierLevel, TierStats};
