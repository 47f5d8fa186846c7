//! Sharded in-memory storage for Hearth
//!
//! The keyspace is partitioned across a fixed number of independent shards,
//! each guarded by its own readers-writer lock. Shard selection is a stable
//! non-cryptographic hash, so a key lives in exactly one shard for the
//! lifetime of the process and writers to different shards never contend.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod shard;

pub use shard::{shard_index, Shard, SHARD_COUNT};
