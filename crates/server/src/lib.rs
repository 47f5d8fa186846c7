//! HTTP surface of Hearth
//!
//! Routes, handlers and the serve loop. The KV engine is synchronous and
//! is driven through the blocking pool; the pub/sub hub runs as a task on
//! the same runtime as the server.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod kv;
mod pubsub;
mod ws;

pub use config::Args;

use anyhow::Context;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use hearth_engine::KvStore;
use hearth_pubsub::{Hub, HubHandle, TicketStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The KV engine
    pub store: Arc<KvStore>,
    /// Sending side of the hub's inbound channels
    pub hub: HubHandle,
    /// One-time connection tickets
    pub tickets: Arc<TicketStore>,
    /// TTL applied to newly issued tickets
    pub ticket_ttl_secs: i64,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/kv/get", get(kv::get_value))
        .route("/kv/set", post(kv::set_value))
        .route("/pubsub/ticket", post(pubsub::create_ticket))
        .route("/pubsub/publish", post(pubsub::publish))
        .route("/ws", get(ws::upgrade))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    debug!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "http request"
    );
    response
}

/// Run the server until shutdown is signalled.
///
/// Spawns the hub event loop, binds the listener and serves. Returns once
/// a ctrl-c arrives and in-flight connections have drained; the caller is
/// responsible for closing the store afterwards.
pub async fn run(store: Arc<KvStore>, args: Args) -> anyhow::Result<()> {
    let (hub, handle) = Hub::new();
    tokio::spawn(hub.run());

    let state = AppState {
        store,
        hub: handle,
        tickets: Arc::new(TicketStore::new()),
        ticket_ttl_secs: args.ws_ticket_ttl,
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port))
        .await
        .context("binding to port")?;
    info!(port = args.port, "ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
