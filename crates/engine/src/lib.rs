//! KV engine for Hearth
//!
//! `KvStore` orchestrates the sharded in-memory map, the write-ahead log,
//! periodic snapshotting, TTL eviction workers, and cache-aside population
//! from an optional upstream origin.
//!
//! # Lifecycle
//!
//! ```text
//! NEW -> LOADED -> RUNNING -> CLOSING -> CLOSED
//! ```
//!
//! `KvStore::open` performs directory creation, snapshot load, WAL replay
//! and WAL open (NEW -> LOADED). `start` spawns the workers
//! (LOADED -> RUNNING). `close` stops the workers, writes a final snapshot
//! and closes the WAL (RUNNING -> CLOSING -> CLOSED).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod store;
pub mod upstream;
mod workers;

pub use config::KvConfig;
pub use store::KvStore;
pub use upstream::UpstreamClient;
