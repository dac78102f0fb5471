//! Configuration for the tiered cache

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Prefix for environment overrides read by [`CacheConfig::from_env`]
pub const ENV_PREFIX: &str = "OUROBOROS_CACHE_";

/// Longest TTL or sweep interval a configuration may carry (about 100 years)
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Thresholds used to derive [`HealthStatus`](crate::cache::HealthStatus) from metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Minimum hit rate (0.0 - 1.0) to report healthy
    pub healthy_hit_rate: f64,

    /// Maximum average response time to report healthy
    pub healthy_max_response_ms: f64,

    /// Minimum hit rate (0.0 - 1.0) to report degraded rather than unhealthy
    pub degraded_hit_rate: f64,

    /// Maximum average response time to report degraded rather than unhealthy
    pub degraded_max_response_ms: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            healthy_hit_rate: 0.7,
            healthy_max_response_ms: 100.0,
            degraded_hit_rate: 0.5,
            degraded_max_response_ms: 200.0,
        }
    }
}

/// Configuration for the three-tier cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries in the fast (memory) tier
    pub fast_capacity: usize,

    /// Maximum number of entries in the medium (disk) tier
    pub medium_capacity: usize,

    /// Maximum number of entries in the slow (network) tier
    pub slow_capacity: usize,

    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0) applied to `default_ttl` only.
    /// 0.0 disables jitter.
    pub ttl_jitter: f64,

    /// Interval between background sweeps of expired entries
    pub cleanup_interval: Duration,

    /// Start the background sweep at construction
    pub enable_auto_cleanup: bool,

    /// Enable health evaluation. Counters are tracked either way.
    pub enable_metrics: bool,

    /// Abandon a tier lookup after this long and treat it as a miss
    pub tier_timeout: Option<Duration>,

    /// Health derivation thresholds
    pub health: HealthThresholds,

    /// Latency assumed to be saved by each hit, used for `estimated_savings_ms`
    pub assumed_saving_per_hit_ms: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fast_capacity: 1_000,
            medium_capacity: 10_000,
            slow_capacity: 100_000,
            // 1 hour default TTL
            default_ttl: Duration::from_secs(3600),
            ttl_jitter: 0.0,
            // Sweep every 5 minutes
            cleanup_interval: Duration::from_secs(300),
            enable_auto_cleanup: true,
            enable_metrics: true,
            tier_timeout: None,
            health: HealthThresholds::default(),
            assumed_saving_per_hit_ms: 100.0,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for (name, capacity) in [
            ("fast_capacity", self.fast_capacity),
            ("medium_capacity", self.medium_capacity),
            ("slow_capacity", self.slow_capacity),
        ] {
            if capacity == 0 {
                return Err(CacheError::InvalidConfig(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        for (name, duration) in [
            ("default_ttl", self.default_ttl),
            ("cleanup_interval", self.cleanup_interval),
        ] {
            if duration.is_zero() {
                return Err(CacheError::InvalidConfig(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
            if duration > MAX_TTL {
                return Err(CacheError::InvalidConfig(format!(
                    "{} must not exceed {:?}",
                    name, MAX_TTL
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::InvalidConfig(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        if matches!(self.tier_timeout, Some(t) if t.is_zero()) {
            return Err(CacheError::InvalidConfig(
                "tier_timeout must be greater than 0 when set".to_string(),
            ));
        }

        if self.assumed_saving_per_hit_ms < 0.0 {
            return Err(CacheError::InvalidConfig(
                "assumed_saving_per_hit_ms must not be negative".to_string(),
            ));
        }

        let h = &self.health;
        if !(0.0..=1.0).contains(&h.healthy_hit_rate) || !(0.0..=1.0).contains(&h.degraded_hit_rate)
        {
            return Err(CacheError::InvalidConfig(
                "health hit rate thresholds must be between 0.0 and 1.0".to_string(),
            ));
        }

        if h.degraded_hit_rate > h.healthy_hit_rate
            || h.degraded_max_response_ms < h.healthy_max_response_ms
        {
            return Err(CacheError::InvalidConfig(
                "degraded thresholds must be looser than healthy thresholds".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate the default TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.default_ttl;
        }

        let base_secs = self.default_ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(0.001);

        Duration::try_from_secs_f64(final_secs)
            .map(|ttl| ttl.min(MAX_TTL))
            .unwrap_or(self.default_ttl)
    }

    /// Capacities in tier order: fast, medium, slow
    pub fn capacities(&self) -> [usize; 3] {
        [self.fast_capacity, self.medium_capacity, self.slow_capacity]
    }

    /// Load configuration from the environment (and a `.env` file if present).
    ///
    /// Unset variables keep their defaults. Recognized variables, all prefixed
    /// with `OUROBOROS_CACHE_`: `FAST_CAPACITY`, `MEDIUM_CAPACITY`,
    /// `SLOW_CAPACITY`, `DEFAULT_TTL_MS`, `CLEANUP_INTERVAL_MS`,
    /// `ENABLE_METRICS`, `TIER_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let mut builder = CacheConfig::builder();

        if let Some(v) = parse_var::<usize>(&read, "FAST_CAPACITY")? {
            builder = builder.fast_capacity(v);
        }
        if let Some(v) = parse_var::<usize>(&read, "MEDIUM_CAPACITY")? {
            builder = builder.medium_capacity(v);
        }
        if let Some(v) = parse_var::<usize>(&read, "SLOW_CAPACITY")? {
            builder = builder.slow_capacity(v);
        }
        if let Some(v) = parse_var::<u64>(&read, "DEFAULT_TTL_MS")? {
            builder = builder.default_ttl(Duration::from_millis(v));
        }
        if let Some(v) = parse_var::<u64>(&read, "CLEANUP_INTERVAL_MS")? {
            builder = builder.cleanup_interval(Duration::from_millis(v));
        }
        if let Some(v) = parse_var::<bool>(&read, "ENABLE_METRICS")? {
            builder = builder.enable_metrics(v);
        }
        if let Some(v) = parse_var::<u64>(&read, "TIER_TIMEOUT_MS")? {
            builder = builder.tier_timeout(Duration::from_millis(v));
        }

        let config = builder.build();
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T: FromStr>(read: &impl Fn(&str) -> Option<String>, suffix: &str) -> Result<Option<T>> {
    match read(suffix) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            CacheError::InvalidConfig(format!("{}{} has invalid value '{}'", ENV_PREFIX, suffix, raw))
        }),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    fast_capacity: Option<usize>,
    medium_capacity: Option<usize>,
    slow_capacity: Option<usize>,
    default_ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
    cleanup_interval: Option<Duration>,
    enable_auto_cleanup: Option<bool>,
    enable_metrics: Option<bool>,
    tier_timeout: Option<Duration>,
    health: Option<HealthThresholds>,
    assumed_saving_per_hit_ms: Option<f64>,
}

impl CacheConfigBuilder {
    /// Set the fast tier capacity
    pub fn fast_capacity(mut self, capacity: usize) -> Self {
        self.fast_capacity = Some(capacity);
        self
    }

    /// Set the medium tier capacity
    pub fn medium_capacity(mut self, capacity: usize) -> Self {
        self.medium_capacity = Some(capacity);
        self
    }

    /// Set the slow tier capacity
    pub fn slow_capacity(mut self, capacity: usize) -> Self {
        self.slow_capacity = Some(capacity);
        self
    }

    /// Set all three tier capacities at once
    pub fn capacities(self, fast: usize, medium: usize, slow: usize) -> Self {
        self.fast_capacity(fast)
            .medium_capacity(medium)
            .slow_capacity(slow)
    }

    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Enable or disable health evaluation
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Set the per-tier lookup timeout
    pub fn tier_timeout(mut self, timeout: Duration) -> Self {
        self.tier_timeout = Some(timeout);
        self
    }

    /// Set health thresholds
    pub fn health(mut self, thresholds: HealthThresholds) -> Self {
        self.health = Some(thresholds);
        self
    }

    /// Set the latency assumed saved by each hit
    pub fn assumed_saving_per_hit_ms(mut self, ms: f64) -> Self {
        self.assumed_saving_per_hit_ms = Some(ms);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            fast_capacity: self.fast_capacity.unwrap_or(defaults.fast_capacity),
            medium_capacity: self.medium_capacity.unwrap_or(defaults.medium_capacity),
            slow_capacity: self.slow_capacity.unwrap_or(defaults.slow_capacity),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            enable_auto_cleanup: self
                .enable_auto_cleanup
                .unwrap_or(defaults.enable_auto_cleanup),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
            tier_timeout: self.tier_timeout.or(defaults.tier_timeout),
            health: self.health.unwrap_or(defaults.health),
            assumed_saving_per_hit_ms: self
                .assumed_saving_per_hit_ms
                .unwrap_or(defaults.assumed_saving_per_hit_ms),
        }
    }
}

/// Preset configurations for common use cases
impl CacheConfig {
    /// Short-lived data that changes quickly
    pub fn realtime() -> Self {
        Self {
            default_ttl: Duration::from_secs(300), // 5 minutes
            cleanup_interval: Duration::from_secs(30),
            ttl_jitter: 0.15,
            ..Default::default()
        }
    }

    /// Memory-constrained environments
    pub fn small() -> Self {
        Self {
            fast_capacity: 100,
            medium_capacity: 1_000,
            slow_capacity: 5_000,
            default_ttl: Duration::from_secs(1800), // 30 minutes
            ..Default::default()
        }
    }

    /// Large deployments with deep slow tiers
    pub fn large() -> Self {
        Self {
            fast_capacity: 10_000,
            medium_capacity: 250_000,
            slow_capacity: 1_000_000,
            default_ttl: Duration::from_secs(7200), // 2 hours
            cleanup_interval: Duration::from_secs(600),
            ..Default::default()
        }
    }
}
