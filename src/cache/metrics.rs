//! Hit/miss accounting and health derivation

use crate::cache::config::{CacheConfig, HealthThresholds};
use crate::cache::types::{TierLevel, TierStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::RwLock;

/// Result of one orchestrated lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// Served by the given tier
    Hit(TierLevel),
    /// No tier held a valid entry
    Miss,
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Hit rate and latency inside the healthy thresholds
    Healthy,
    /// Inside the degraded thresholds only
    Degraded,
    /// Outside every threshold
    Unhealthy,
}

impl HealthStatus {
    /// Derive a status from a hit rate and average latency
    pub fn evaluate(hit_rate: f64, average_response_time_ms: f64, thresholds: &HealthThresholds) -> Self {
        if hit_rate >= thresholds.healthy_hit_rate
            && average_response_time_ms <= thresholds.healthy_max_response_ms
        {
            HealthStatus::Healthy
        } else if hit_rate >= thresholds.degraded_hit_rate
            && average_response_time_ms <= thresholds.degraded_max_response_ms
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Health status plus the numbers it was derived from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub details: HealthDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDetails {
    pub hit_rate: f64,
    pub average_response_time_ms: f64,
    pub total_queries: u64,
    /// `false` when health evaluation is switched off in the config
    pub metrics_enabled: bool,
    pub checked_at: DateTime<Utc>,
}

/// Immutable copy of the cache metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub fast_hits: u64,
    pub medium_hits: u64,
    pub slow_hits: u64,
    pub misses: u64,
    pub total_queries: u64,
    pub average_response_time_ms: f64,

    /// (fast + medium + slow hits) / total queries, 0 without queries
    pub hit_rate: f64,

    /// total hits * assumed saving per hit
    pub estimated_savings_ms: f64,

    /// Per-tier statistics, filled by the orchestrator
    pub tiers: Vec<TierStats>,
}

impl MetricsSnapshot {
    /// Hits across all tiers
    pub fn total_hits(&self) -> u64 {
        self.fast_hits + self.medium_hits + self.slow_hits
    }

    /// Hits served by one tier
    pub fn hits_for(&self, tier: TierLevel) -> u64 {
        match tier {
            TierLevel::Fast => self.fast_hits,
            TierLevel::Medium => self.medium_hits,
            TierLevel::Slow => self.slow_hits,
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Metrics {{ hits: {}/{}/{}, misses: {}, hit_rate: {:.2}%, avg: {:.3}ms }}",
            self.fast_hits,
            self.medium_hits,
            self.slow_hits,
            self.misses,
            self.hit_rate * 100.0,
            self.average_response_time_ms
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    fast_hits: u64,
    medium_hits: u64,
    slow_hits: u64,
    misses: u64,
    total_queries: u64,
    average_response_time_ms: f64,
}

impl Counters {
    fn total_hits(&self) -> u64 {
        self.fast_hits + self.medium_hits + self.slow_hits
    }

    fn hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.total_hits() as f64 / self.total_queries as f64
        }
    }
}

/// Collects per-tier hit counters and a rolling mean of lookup latency
pub struct MetricsCollector {
    counters: RwLock<Counters>,
    thresholds: HealthThresholds,
    saving_per_hit_ms: f64,
    enabled: bool,
}

impl MetricsCollector {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            counters: RwLock::new(Counters::default()),
            thresholds: config.health.clone(),
            saving_per_hit_ms: config.assumed_saving_per_hit_ms,
            enabled: config.enable_metrics,
        }
    }

    /// Record one completed lookup
    pub async fn record(&self, outcome: LookupOutcome, elapsed: Duration) {
        let sample_ms = elapsed.as_secs_f64() * 1000.0;
        let mut c = self.counters.write().await;

        match outcome {
            LookupOutcome::Hit(TierLevel::Fast) => c.fast_hits += 1,
            LookupOutcome::Hit(TierLevel::Medium) => c.medium_hits += 1,
            LookupOutcome::Hit(TierLevel::Slow) => c.slow_hits += 1,
            LookupOutcome::Miss => c.misses += 1,
        }
        c.total_queries += 1;
        c.average_response_time_ms +=
            (sample_ms - c.average_response_time_ms) / c.total_queries as f64;
    }

    /// Copy the current counters out
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let c = self.counters.read().await;

        MetricsSnapshot {
            fast_hits: c.fast_hits,
            medium_hits: c.medium_hits,
            slow_hits: c.slow_hits,
            misses: c.misses,
            total_queries: c.total_queries,
            average_response_time_ms: c.average_response_time_ms,
            hit_rate: c.hit_rate(),
            estimated_savings_ms: c.total_hits() as f64 * self.saving_per_hit_ms,
            tiers: Vec::new(),
        }
    }

    /// Derive health. With metrics disabled this always reports healthy.
    pub async fn health(&self, now: DateTime<Utc>) -> HealthReport {
        let c = self.counters.read().await;
        let hit_rate = c.hit_rate();

        let status = if self.enabled {
            HealthStatus::evaluate(hit_rate, c.average_response_time_ms, &self.thresholds)
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            details: HealthDetails {
                hit_rate,
                average_response_time_ms: c.average_response_time_ms,
                total_queries: c.total_queries,
                metrics_enabled: self.enabled,
                checked_at: now,
            },
        }
    }

    /// Zero every counter
    pub async fn reset(&self) {
        *self.counters.write().await = Counters::default();
    }
}
