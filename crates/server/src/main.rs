use clap::Parser;
use hearth_engine::KvStore;
use hearth_server::Args;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting tracing default failed");

    info!("hearth starting");

    // The engine is synchronous (blocking file and upstream I/O), so it is
    // opened before the async runtime exists and closed after it stops.
    let store = Arc::new(KvStore::open(args.kv_config())?);
    store.start();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(hearth_server::run(Arc::clone(&store), args));

    info!("stopping kv store");
    if let Err(err) = store.close() {
        error!(%err, "kv store close failed");
    }
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    result
}
