//! Error types for cache operations
//!
//! This module defines the error type shared by the tier backends, the
//! orchestrator and the findings store.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A tier backend failed to serve a request
    #[error("Tier '{tier}' backend error: {message}")]
    TierBackend { tier: String, message: String },

    /// A tier backend did not answer within the configured timeout
    #[error("Tier '{tier}' timed out after {timeout_ms}ms")]
    TierTimeout { tier: String, timeout_ms: u64 },

    /// Every tier rejected a write-through
    #[error("Write failed for key '{key}': no tier accepted the entry")]
    WriteFailed { key: String },

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}
