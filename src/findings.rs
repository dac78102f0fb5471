//! Findings store riding on the tiered cache
//!
//! Records are cached with a TTL scaled by their importance, and queries that
//! came back empty leave a short-lived negative marker so the next identical
//! query can skip the expensive downstream search. From the cache's point of
//! view both are ordinary entries.

use crate::cache::{CacheKey, CacheOrchestrator, MAX_TTL};
use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Namespace of negative markers
pub const NEGATIVE_NAMESPACE: &str = "neg";

/// A stored finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub content: String,
    pub category: String,
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    /// Create a finding with a fresh id
    pub fn new(content: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            category: category.into(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Attach a metadata pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(value: &str) -> Result<Self> {
        Ok(serde_json::from_str(value)?)
    }
}

/// What the findings store keeps in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingsValue {
    Record(Finding),
    /// "this query found nothing"
    NegativeMarker,
}

/// Importance level assigned upstream, scaling the base TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
    Transient,
}

impl Importance {
    /// Multiplier applied to the base TTL
    pub fn importance_factor(self) -> f64 {
        match self {
            Importance::Critical => 4.0,
            Importance::High => 2.0,
            Importance::Medium => 1.0,
            Importance::Low => 0.5,
            Importance::Transient => 0.1,
        }
    }

    /// Map an upstream classification score in [0, 1] to a level
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.9 => Importance::Critical,
            s if s >= 0.7 => Importance::High,
            s if s >= 0.4 => Importance::Medium,
            s if s >= 0.2 => Importance::Low,
            _ => Importance::Transient,
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Importance::Critical => write!(f, "critical"),
            Importance::High => write!(f, "high"),
            Importance::Medium => write!(f, "medium"),
            Importance::Low => write!(f, "low"),
            Importance::Transient => write!(f, "transient"),
        }
    }
}

/// Cache key builder: `namespace:identifier`
pub struct CacheKeyBuilder {
    namespace: String,
    identifier: String,
}

impl CacheKeyBuilder {
    /// Create a new cache key builder
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            identifier: String::new(),
        }
    }

    /// Set the primary identifier
    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = id.into();
        self
    }

    /// Build the cache key
    pub fn build(self) -> CacheKey {
        format!("{}:{}", self.namespace, self.identifier)
    }
}

/// Configuration for the findings store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsConfig {
    /// TTL for a finding of medium importance
    pub base_ttl: Duration,

    /// TTL of negative markers
    pub negative_ttl: Duration,

    /// Namespace of finding keys
    pub key_prefix: String,
}

impl FindingsConfig {
    /// Reject TTLs the cache cannot represent and prefixes that clash with
    /// negative markers
    pub fn validate(&self) -> Result<()> {
        for (name, ttl) in [("base_ttl", self.base_ttl), ("negative_ttl", self.negative_ttl)] {
            if ttl.is_zero() || ttl > MAX_TTL {
                return Err(CacheError::InvalidConfig(format!(
                    "{} must be between 0 and {:?}",
                    name, MAX_TTL
                )));
            }
        }

        if self.key_prefix.is_empty() || self.key_prefix == NEGATIVE_NAMESPACE {
            return Err(CacheError::InvalidConfig(format!(
                "key_prefix must be non-empty and differ from '{}'",
                NEGATIVE_NAMESPACE
            )));
        }

        Ok(())
    }
}

impl Default for FindingsConfig {
    fn default() -> Self {
        Self {
            base_ttl: Duration::from_secs(3600),
            negative_ttl: Duration::from_secs(300),
            key_prefix: "finding".to_string(),
        }
    }
}

/// Findings store backed by an injected cache
pub struct FindingsStore {
    cache: Arc<CacheOrchestrator<FindingsValue>>,
    config: FindingsConfig,
}

impl FindingsStore {
    /// Wrap a cache. Fails with [`CacheError::InvalidConfig`] on a bad config.
    pub fn new(
        cache: Arc<CacheOrchestrator<FindingsValue>>,
        config: FindingsConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self { cache, config })
    }

    /// Get the underlying cache instance
    pub fn inner(&self) -> Arc<CacheOrchestrator<FindingsValue>> {
        self.cache.clone()
    }

    /// TTL a finding of the given importance is cached for, capped at [`MAX_TTL`]
    pub fn ttl_for(&self, importance: Importance) -> Duration {
        Duration::try_from_secs_f64(
            self.config.base_ttl.as_secs_f64() * importance.importance_factor(),
        )
        .ok()
        .map_or(MAX_TTL, |ttl| ttl.min(MAX_TTL))
    }

    /// Key a finding is stored under
    pub fn content_key(&self, id: &str) -> CacheKey {
        CacheKeyBuilder::new(&self.config.key_prefix)
            .identifier(id)
            .build()
    }

    /// Cache a finding. Returns the key it was stored under.
    pub async fn store(&self, finding: Finding, importance: Importance) -> Result<CacheKey> {
        let key = self.content_key(&finding.id);
        let ttl = self.ttl_for(importance);

        debug!("Storing finding {} ({}, ttl {:?})", finding.id, importance, ttl);
        self.cache
            .set_with_ttl(key.clone(), FindingsValue::Record(finding), Some(ttl))
            .await?;

        Ok(key)
    }

    /// Fetch a cached finding by id
    pub async fn get(&self, id: &str) -> Option<Finding> {
        match self.cache.get(&self.content_key(id)).await {
            Some(FindingsValue::Record(finding)) => Some(finding),
            _ => None,
        }
    }

    /// Drop a cached finding
    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.cache.delete(&self.content_key(id)).await
    }

    /// Trim, lowercase and collapse whitespace
    pub fn normalize_query(query: &str) -> String {
        query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Stable key of the negative marker for a query
    pub fn negative_key(query: &str) -> CacheKey {
        let digest = Sha256::digest(Self::normalize_query(query).as_bytes());
        let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();

        CacheKeyBuilder::new(NEGATIVE_NAMESPACE)
            .identifier(hash)
            .build()
    }

    /// Remember that a query found nothing
    pub async fn record_miss(&self, query: &str) -> Result<()> {
        self.cache
            .set_with_ttl(
                Self::negative_key(query),
                FindingsValue::NegativeMarker,
                Some(self.config.negative_ttl),
            )
            .await
    }

    /// Whether a live negative marker exists for a query
    pub async fn is_known_miss(&self, query: &str) -> bool {
        matches!(
            self.cache.get(&Self::negative_key(query)).await,
            Some(FindingsValue::NegativeMarker)
        )
    }

    /// Drop the negative marker for a query
    pub async fn forget_miss(&self, query: &str) -> Result<bool> {
        self.cache.delete(&Self::negative_key(query)).await
    }

    /// Run a downstream search unless the query is a known miss.
    ///
    /// An empty result leaves a negative marker. Downstream errors are
    /// returned as-is and never leave a marker.
    pub async fn search<F, Fut, E>(
        &self,
        query: &str,
        downstream: F,
    ) -> std::result::Result<Vec<Finding>, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = std::result::Result<Vec<Finding>, E>>,
    {
        if self.is_known_miss(query).await {
            debug!("Skipping search for known miss: {}", query);
            return Ok(Vec::new());
        }

        let results = downstream(query.to_string()).await?;

        if results.is_empty() {
            if let Err(e) = self.record_miss(query).await {
                warn!("Failed to record negative marker for '{}': {}", query, e);
            }
        }

        Ok(results)
    }
}
