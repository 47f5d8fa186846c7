//! KV engine configuration

use std::path::{Path, PathBuf};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "kv.json";
/// WAL file name inside the data directory.
pub const WAL_FILE: &str = "kv.json.wal";

/// Configuration for the KV engine.
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Root directory for the snapshot and WAL files
    pub data_dir: PathBuf,
    /// Snapshot interval in seconds; zero or negative disables the snapshotter
    pub save_interval_secs: i64,
    /// TTL janitor interval in seconds
    pub cleanup_interval_secs: i64,
    /// Upstream origin base URL; empty disables cache-aside fetch
    pub upstream_url: String,
    /// TTL in seconds applied to values populated from upstream
    pub default_upstream_ttl_secs: i64,
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            save_interval_secs: 30,
            cleanup_interval_secs: 10,
            upstream_url: String::new(),
            default_upstream_ttl_secs: 60,
        }
    }
}

impl KvConfig {
    /// Path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// Path of the WAL file.
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(WAL_FILE)
    }

    /// Whether upstream cache-aside fetch is enabled.
    pub fn upstream_enabled(&self) -> bool {
        !self.upstream_url.is_empty()
    }

    /// Whether the periodic snapshotter should run.
    pub fn snapshotter_enabled(&self) -> bool {
        self.save_interval_secs > 0 && !self.data_dir.as_os_str().is_empty()
    }

    /// Configuration rooted at the given directory, other options default.
    pub fn at(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}
