//! Stored item type
//!
//! Values are arbitrary decoded JSON trees; `serde_json::Value` round-trips
//! exactly through the WAL and snapshot formats, so it is used directly
//! rather than a parallel tagged-union type.

use serde::{Deserialize, Serialize};

/// Dynamic JSON value stored in the cache.
pub type Value = serde_json::Value;

/// A stored value plus its absolute expiration.
///
/// `expires_at` is nanoseconds since the Unix epoch and is strictly
/// positive for every live item; an item with `expires_at` at or before
/// the current time is logically absent and must not be served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The stored value
    pub value: Value,
    /// Absolute expiration, nanoseconds since the Unix epoch
    pub expires_at: i64,
}

impl Item {
    /// Create a new item.
    pub fn new(value: Value, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// Check whether this item is expired at the given instant.
    ///
    /// Strict comparison: an item whose expiration equals `now` is live.
    #[inline]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}
