//! Command-line configuration

use clap::Parser;
use hearth_engine::KvConfig;
use std::path::PathBuf;

/// In-process KV cache and pub/sub server.
#[derive(Parser, Debug, Clone)]
#[clap(name = "hearth", version, about, long_about = None)]
pub struct Args {
    /// Port to bind the HTTP server to.
    #[clap(long, env = "HEARTH_PORT", default_value = "4000")]
    pub port: u16,

    /// Log level (0=error, 1=info, 2=debug).
    #[clap(long = "log-level", env = "HEARTH_LOG_LEVEL", default_value = "1")]
    pub log_level: u8,

    /// Directory for KV persistence.
    #[clap(long = "kv-data-dir", env = "HEARTH_KV_DATA_DIR", default_value = "./data")]
    pub kv_data_dir: PathBuf,

    /// Interval in seconds between snapshots; zero or less disables auto-save.
    #[clap(long = "kv-save-interval", env = "HEARTH_KV_SAVE_INTERVAL", default_value = "30")]
    pub kv_save_interval: i64,

    /// Interval in seconds between expired-key sweeps.
    #[clap(
        long = "kv-cleanup-interval",
        env = "HEARTH_KV_CLEANUP_INTERVAL",
        default_value = "10"
    )]
    pub kv_cleanup_interval: i64,

    /// Upstream origin base URL for cache-aside fetch; empty disables it.
    #[clap(long = "kv-upstream-url", env = "HEARTH_KV_UPSTREAM_URL", default_value = "")]
    pub kv_upstream_url: String,

    /// TTL in seconds for values populated from upstream.
    #[clap(long = "kv-upstream-ttl", env = "HEARTH_KV_UPSTREAM_TTL", default_value = "60")]
    pub kv_upstream_ttl: i64,

    /// WebSocket ticket TTL in seconds.
    #[clap(long = "ws-ticket-ttl", env = "HEARTH_WS_TICKET_TTL", default_value = "15")]
    pub ws_ticket_ttl: i64,
}

impl Args {
    /// KV engine configuration derived from the flags.
    pub fn kv_config(&self) -> KvConfig {
        KvConfig {
            data_dir: self.kv_data_dir.clone(),
            save_interval_secs: self.kv_save_interval,
            cleanup_interval_secs: self.kv_cleanup_interval,
            upstream_url: self.kv_upstream_url.clone(),
            default_upstream_ttl_secs: self.kv_upstream_ttl,
        }
    }
}
