//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type
pub type CacheKey = String;

/// Bound for values stored in the cache.
///
/// Values are copied on read and on promotion, and cross task boundaries.
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> CacheValue for T {}

/// Position of a tier in the fast-to-slow ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierLevel {
    /// Tier 0: memory
    Fast,

    /// Tier 1: disk
    Medium,

    /// Tier 2: network
    Slow,
}

impl TierLevel {
    /// All tiers in lookup order
    pub const ALL: [TierLevel; 3] = [TierLevel::Fast, TierLevel::Medium, TierLevel::Slow];

    /// Index of this tier in the ladder
    pub fn index(self) -> usize {
        match self {
            TierLevel::Fast => 0,
            TierLevel::Medium => 1,
            TierLevel::Slow => 2,
        }
    }

    /// Storage medium this tier stands in for
    pub fn medium_name(self) -> &'static str {
        match self {
            TierLevel::Fast => "memory",
            TierLevel::Medium => "disk",
            TierLevel::Slow => "network",
        }
    }

    /// Tiers that sit in front of this one
    pub fn faster_tiers(self) -> &'static [TierLevel] {
        &Self::ALL[..self.index()]
    }
}

impl fmt::Display for TierLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.medium_name())
    }
}

/// Point-in-time statistics for one tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStats {
    /// Which tier these numbers describe
    pub tier: TierLevel,

    /// Entries currently stored
    pub entries: usize,

    /// Configured capacity
    pub capacity: usize,

    /// Sum of per-entry size estimates
    pub size_bytes: usize,

    /// Entries removed to make room for new ones
    pub evictions: u64,

    /// Entries removed by expiry sweeps
    pub expirations: u64,
}

impl TierStats {
    /// Empty statistics for a tier
    pub fn empty(tier: TierLevel, capacity: usize) -> Self {
        Self {
            tier,
            entries: 0,
            capacity,
            size_bytes: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    /// Fraction of capacity in use
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.entries as f64 / self.capacity as f64
        }
    }
}

impl fmt::Display for TierStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TierStats {{ tier: {}, entries: {}/{}, size: {} bytes, evictions: {}, expirations: {} }}",
            self.tier,
            self.entries,
            self.capacity,
            self.size_bytes,
            self.evictions,
            self.expirations
        )
    }
}
