//! KV storage orchestrator
//!
//! Owns the shards, the WAL, the optional upstream client and the two
//! periodic workers. All externally visible KV operations live here.
//!
//! # Locking
//!
//! Lock order, top-down: snapshot gate, then shard lock, then WAL mutex.
//! The snapshot gate is used inversely to intuition: writers hold it
//! shared (so concurrent sets proceed in parallel), the snapshotter holds
//! it exclusively for its freeze phase only. Readers never touch the gate.

use crate::config::KvConfig;
use crate::upstream::UpstreamClient;
use crate::workers::{spawn_periodic, Shutdown};
use hearth_core::{expiry_for_ttl, now_nanos, Item, Result, Value};
use hearth_durability::{snapshot, Wal, WalEntry, WalOp};
use hearth_storage::{shard_index, Shard, SHARD_COUNT};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Entries examined per shard by one janitor pass.
pub const JANITOR_SAMPLE: usize = 20;

/// Lifecycle state of the storage process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Loaded,
    Running,
    Closing,
    Closed,
}

/// Sharded, WAL-backed KV store with TTL eviction and cache-aside fetch.
pub struct KvStore {
    shards: Vec<Shard>,
    wal: Wal,
    snapshot_gate: RwLock<()>,
    config: KvConfig,
    upstream: Option<UpstreamClient>,
    state: Mutex<State>,
    shutdown: Arc<Shutdown>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl KvStore {
    /// Open the store: create the data directory, load the snapshot,
    /// replay the WAL on top, and open the WAL for appending.
    ///
    /// Startup errors here are fatal to the process; there is no degraded
    /// mode without a journal.
    pub fn open(config: KvConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let shards: Vec<Shard> = (0..SHARD_COUNT).map(|_| Shard::new()).collect();
        let upstream = if config.upstream_enabled() {
            Some(UpstreamClient::new(config.upstream_url.clone())?)
        } else {
            None
        };

        let store = Self {
            shards,
            wal: Wal::open(config.wal_path())?,
            snapshot_gate: RwLock::new(()),
            config,
            upstream,
            state: Mutex::new(State::Loaded),
            shutdown: Arc::new(Shutdown::new()),
            workers: Mutex::new(Vec::new()),
        };

        store.load_from_disk();
        Ok(store)
    }

    /// Spawn the TTL janitor and the snapshotter.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if *state != State::Loaded {
            return;
        }
        *state = State::Running;
        drop(state);

        let mut workers = self.workers.lock();

        if self.config.cleanup_interval_secs > 0 {
            let store = Arc::clone(self);
            workers.push(spawn_periodic(
                "hearth-janitor",
                Duration::from_secs(self.config.cleanup_interval_secs as u64),
                Arc::clone(&self.shutdown),
                move || {
                    store.run_janitor_pass();
                },
            ));
        }

        if self.config.snapshotter_enabled() {
            let store = Arc::clone(self);
            workers.push(spawn_periodic(
                "hearth-snapshotter",
                Duration::from_secs(self.config.save_interval_secs as u64),
                Arc::clone(&self.shutdown),
                move || {
                    if let Err(err) = store.create_snapshot() {
                        error!(%err, "periodic snapshot failed");
                    }
                },
            ));
        } else {
            info!("snapshot interval is not positive, auto-save disabled");
        }
    }

    /// Look up a key.
    ///
    /// The shard read lock covers only the map lookup; the expiry check
    /// runs after the lock is dropped. A miss (absent or expired) falls
    /// through to the upstream origin when one is configured.
    pub fn get(&self, key: &str) -> Option<Item> {
        let item = self.shards[shard_index(key)].get(key);

        if let Some(item) = item {
            if !item.is_expired_at(now_nanos()) {
                return Some(item);
            }
            // Expired: treat as absent, the janitor collects it later
        }

        if self.upstream.is_some() {
            info!(key, "miss, fetching from upstream");
            return self.fetch_from_upstream(key);
        }
        None
    }

    /// Write a key with the given TTL in seconds.
    ///
    /// TTL above zero expires that many seconds from now; zero or below
    /// stores the value effectively forever. A WAL append failure is
    /// logged and swallowed: the in-memory write still happens, trading
    /// durability for availability.
    pub fn set(&self, key: &str, value: Value, ttl_seconds: i64) {
        let _gate = self.snapshot_gate.read();

        let expires_at = expiry_for_ttl(ttl_seconds);
        let entry = WalEntry::set(key.to_string(), value.clone(), expires_at);
        if let Err(err) = self.wal.append(&entry) {
            error!(%err, key, "wal append failed, write is in-memory only");
        }

        self.shards[shard_index(key)].insert(key.to_string(), Item::new(value, expires_at));
        debug!(key, ttl_seconds, "set");
    }

    /// Take a consistent snapshot of live entries and persist it.
    ///
    /// The exclusive gate blocks new sets but not reads while the live
    /// entries are copied and the WAL is truncated. The file write itself
    /// happens after the gate is released; if it fails the previous
    /// snapshot remains authoritative and the fresh WAL keeps
    /// accumulating, so the next cycle converges.
    pub fn create_snapshot(&self) -> Result<()> {
        let started = Instant::now();

        let frozen = {
            let _gate = self.snapshot_gate.write();
            let now = now_nanos();

            let mut entries = HashMap::new();
            for shard in &self.shards {
                shard.collect_live(now, &mut entries);
            }

            self.wal.truncate()?;
            entries
        };

        snapshot::write(&self.config.snapshot_path(), &frozen)?;
        debug!(
            entries = frozen.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "snapshot complete"
        );
        Ok(())
    }

    /// One full janitor pass: every shard in fixed order, at most
    /// [`JANITOR_SAMPLE`] entries examined per shard. Returns the number
    /// of expired entries removed.
    ///
    /// No `del` WAL entries are emitted; expired entries are filtered on
    /// replay anyway.
    pub fn run_janitor_pass(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            removed += shard.sweep_expired(now_nanos(), JANITOR_SAMPLE);
        }
        if removed > 0 {
            debug!(removed, "janitor removed expired entries");
        }
        removed
    }

    /// Stop the workers, write a final snapshot, and close the WAL.
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            match *state {
                State::Loaded | State::Running => *state = State::Closing,
                State::Closing | State::Closed => return Ok(()),
            }
        }

        self.shutdown.signal();
        for handle in self.workers.lock().drain(..) {
            let _ = handle.join();
        }

        if let Err(err) = self.create_snapshot() {
            error!(%err, "final snapshot failed");
        }
        self.wal.close()?;

        *self.state.lock() = State::Closed;
        info!("kv store closed");
        Ok(())
    }

    /// Number of entries currently held, expired ones included.
    pub fn entry_count(&self) -> usize {
        self.shards.iter().map(Shard::len).sum()
    }

    // ------------------------------------------------------------------
    // Recovery
    // ------------------------------------------------------------------

    /// Load the snapshot as base state, then replay the WAL on top.
    ///
    /// Corruption is not fatal: an unreadable snapshot means an empty base
    /// state, and a corrupt WAL record stops replay with everything before
    /// it retained. The next truncation-then-snapshot cycle recovers.
    fn load_from_disk(&self) {
        let now = now_nanos();

        let from_snapshot = snapshot::load(&self.config.snapshot_path(), now, |key, item| {
            self.restore(key, item.value, item.expires_at);
        })
        .unwrap_or_else(|err| {
            error!(%err, "snapshot load failed, starting from empty base state");
            0
        });

        let from_wal = Wal::replay(&self.config.wal_path(), |entry| match entry.op {
            WalOp::Set => self.restore(entry.key, entry.value, entry.expires_at),
            WalOp::Del => {
                self.shards[shard_index(&entry.key)].remove(&entry.key);
            }
        })
        .unwrap_or_else(|err| {
            error!(%err, "wal replay stopped early, earlier records retained");
            0
        });

        info!(from_snapshot, from_wal, "kv store loaded");
    }

    /// Apply a recovered entry, dropping it when already expired.
    ///
    /// A zero expiration comes from legacy snapshots and is normalized to
    /// the far-future sentinel so the in-memory invariant holds.
    fn restore(&self, key: String, value: Value, expires_at: i64) {
        let expires_at = if expires_at == 0 {
            expiry_for_ttl(0)
        } else {
            expires_at
        };
        if now_nanos() > expires_at {
            return;
        }
        self.shards[shard_index(&key)].insert(key, Item::new(value, expires_at));
    }

    // ------------------------------------------------------------------
    // Upstream
    // ------------------------------------------------------------------

    /// Cache-aside population: fetch, store under the default upstream
    /// TTL, then re-read local state so the caller sees exactly what got
    /// cached. Every upstream failure is a plain miss.
    fn fetch_from_upstream(&self, key: &str) -> Option<Item> {
        let upstream = self.upstream.as_ref()?;
        let started = Instant::now();

        let value = match upstream.fetch(key) {
            Ok(value) => value,
            Err(err) => {
                debug!(key, %err, "upstream miss");
                return None;
            }
        };

        self.set(key, value, self.config.default_upstream_ttl_secs);
        debug!(
            key,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upstream fetch succeeded"
        );

        let item = self.shards[shard_index(key)].get(key)?;
        if item.is_expired_at(now_nanos()) {
            return None;
        }
        Some(item)
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("entries", &self.entry_count())
            .field("upstream", &self.upstream.is_some())
            .field("data_dir", &self.config.data_dir)
            .finish()
    }
}
