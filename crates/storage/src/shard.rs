//! Guarded bucket of the KV map
//!
//! A `Shard` maps keys to items under a single `parking_lot::RwLock`.
//! Shards know nothing about TTL policy: expiry evaluation belongs to
//! callers, which pass the current time into the sampling sweep. The shard
//! lock is never held across I/O.

use hearth_core::Item;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use xxhash_rust::xxh32::xxh32;

/// Fixed number of shards partitioning the keyspace.
pub const SHARD_COUNT: usize = 32;

/// Compute which shard a key lives in.
///
/// Stable non-cryptographic 32-bit hash modulo the shard count; the result
/// is deterministic across calls and across runs.
#[inline]
pub fn shard_index(key: &str) -> usize {
    xxh32(key.as_bytes(), 0) as usize % SHARD_COUNT
}

/// One independent bucket of the keyspace.
///
/// Reads take the lock shared and clone the item out; TTL checks happen
/// after the lock is released.
#[derive(Debug, Default)]
pub struct Shard {
    items: RwLock<FxHashMap<String, Item>>,
}

impl Shard {
    /// Create a new empty shard.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(FxHashMap::default()),
        }
    }

    /// Point read. Clones the item out under the read lock.
    ///
    /// No TTL evaluation happens here; an expired item is returned as-is
    /// and the caller decides whether to serve it.
    pub fn get(&self, key: &str) -> Option<Item> {
        self.items.read().get(key).cloned()
    }

    /// Point write. Replaces any existing item for the key.
    pub fn insert(&self, key: String, item: Item) {
        self.items.write().insert(key, item);
    }

    /// Delete a key. Returns the removed item if it existed.
    pub fn remove(&self, key: &str) -> Option<Item> {
        self.items.write().remove(key)
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Check if the shard holds no entries.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Copy out every entry that is live at `now`.
    ///
    /// Used by the snapshotter: runs under the shard read lock so writers
    /// block only for the duration of the copy, never for disk I/O.
    pub fn collect_live(&self, now: i64, out: &mut std::collections::HashMap<String, Item>) {
        let items = self.items.read();
        for (key, item) in items.iter() {
            if !item.is_expired_at(now) {
                out.insert(key.clone(), item.clone());
            }
        }
    }

    /// Bounded eviction sweep.
    ///
    /// Visits at most `limit` entries under the write lock (iteration order
    /// unspecified) and removes those expired at `now`. Returns how many
    /// entries were removed.
    pub fn sweep_expired(&self, now: i64, limit: usize) -> usize {
        let mut items = self.items.write();

        let doomed: Vec<String> = items
            .iter()
            .take(limit)
            .filter(|(_, item)| item.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            items.remove(key);
        }
        doomed.len()
    }
}
