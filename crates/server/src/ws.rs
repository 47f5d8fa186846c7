//! WebSocket session transport
//!
//! Admission happens before the upgrade: the one-time ticket is redeemed
//! first, fixing the session's channel set. After the upgrade two pumps
//! share the split socket: the reader enforces the liveness deadline and
//! discards inbound frames, the writer drains the bounded send queue and
//! emits periodic pings. Teardown converges in the upgrade task so the
//! transport is torn down exactly once.

use crate::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use hearth_pubsub::{HubHandle, Message, Session, TicketInfo};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Maximum inbound frame size; clients only ever send control traffic.
pub const READ_LIMIT: usize = 512;
/// How long a connection may stay silent before the reader gives up.
pub const PONG_WAIT: Duration = Duration::from_secs(60);
/// Per-write deadline.
pub const WRITE_WAIT: Duration = Duration::from_secs(10);
/// Ping cadence; must stay under [`PONG_WAIT`] (9/10 of it).
pub const PING_PERIOD: Duration = Duration::from_secs(54);

#[derive(Debug, Deserialize)]
pub(crate) struct WsParams {
    #[serde(default)]
    ticket: String,
}

/// `GET /ws?ticket=...` upgrade endpoint.
///
/// The ticket check runs before the upgrade negotiation so a missing or
/// bad ticket is answered with a plain status, not a failed handshake.
pub(crate) async fn upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if params.ticket.is_empty() {
        return (StatusCode::UNAUTHORIZED, "Missing ticket").into_response();
    }

    let Some(info) = state.tickets.validate(&params.ticket) else {
        return (StatusCode::FORBIDDEN, "Invalid or expired ticket").into_response();
    };

    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "WebSocket upgrade required").into_response();
    };

    let hub = state.hub.clone();
    ws.max_message_size(READ_LIMIT)
        .on_upgrade(move |socket| handle_socket(socket, hub, info))
}

async fn handle_socket(socket: WebSocket, hub: HubHandle, info: TicketInfo) {
    let (session, queue) = Session::new(info.user_id, info.channels);
    let id = session.id();
    debug!(
        id,
        user_id = session.user_id(),
        channels = ?session.channels(),
        "ws connected"
    );
    hub.register(session);

    let (sink, stream) = socket.split();
    let mut writer = tokio::spawn(write_pump(sink, queue));
    let mut reader = tokio::spawn(read_pump(stream));

    // Whichever pump finishes first ends the session: the other pump is
    // cancelled, both socket halves drop, and unregistration happens once.
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
    hub.unregister(id);
    debug!(id, "ws disconnected");
}

/// Read and discard inbound frames, enforcing the liveness deadline.
///
/// The deadline extends on each pong; anything else (including silence)
/// eventually ends the session.
async fn read_pump(mut stream: SplitStream<WebSocket>) {
    let mut deadline = Instant::now() + PONG_WAIT;
    loop {
        match tokio::time::timeout_at(deadline, stream.next()).await {
            // Deadline passed without a frame
            Err(_) => break,
            // Stream ended or transport error
            Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(frame))) => match frame {
                WsMessage::Pong(_) => deadline = Instant::now() + PONG_WAIT,
                WsMessage::Close(_) => break,
                // Data frames are read so control frames keep flowing,
                // then dropped
                _ => {}
            },
        }
    }
}

/// Drain the send queue to the socket and keep the connection alive.
async fn write_pump(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut queue: mpsc::Receiver<Message>,
) {
    let mut ping = tokio::time::interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);

    loop {
        tokio::select! {
            maybe = queue.recv() => match maybe {
                Some(message) => {
                    let Ok(text) = serde_json::to_string(&message) else {
                        break;
                    };
                    match tokio::time::timeout(WRITE_WAIT, sink.send(WsMessage::Text(text))).await {
                        Ok(Ok(())) => {}
                        // Write error or deadline exceeded
                        _ => break,
                    }
                }
                None => {
                    // Queue closed by the hub: say goodbye properly
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: "".into(),
                    };
                    let _ = tokio::time::timeout(
                        WRITE_WAIT,
                        sink.send(WsMessage::Close(Some(frame))),
                    )
                    .await;
                    break;
                }
            },
            _ = ping.tick() => {
                match tokio::time::timeout(WRITE_WAIT, sink.send(WsMessage::Ping(Vec::new()))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
        }
    }
}
