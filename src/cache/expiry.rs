//! TTL expiry predicate

use crate::cache::entry::CacheEntry;
use chrono::{DateTime, Utc};

/// Decides whether an entry is still valid.
///
/// TTL is measured from insertion, not from the last access: reading an
/// entry never extends its lifetime.
pub struct ExpiryChecker;

impl ExpiryChecker {
    /// `false` for entries without a TTL, otherwise `now - inserted_at > ttl`
    pub fn is_expired<V>(entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        let Some(ttl) = entry.metadata.ttl else {
            return false;
        };

        // A TTL too large for chrono never elapses
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };

        now - entry.metadata.inserted_at > ttl
    }
}
