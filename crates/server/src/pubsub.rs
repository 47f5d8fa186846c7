//! Pub/sub HTTP handlers: ticket issuance and publishing

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hearth_pubsub::Message;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct TicketRequest {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    channels: Vec<String>,
}

/// `POST /pubsub/ticket` with body `{user_id, channels}`.
pub(crate) async fn create_ticket(State(state): State<AppState>, body: String) -> Response {
    let Ok(request) = serde_json::from_str::<TicketRequest>(&body) else {
        return (StatusCode::BAD_REQUEST, "Bad JSON").into_response();
    };

    let token = state
        .tickets
        .create(request.user_id, request.channels, state.ticket_ttl_secs);

    Json(json!({"ticket": token})).into_response()
}

/// `POST /pubsub/publish` with body `{channel, data}`.
///
/// The message is handed to the hub's inbound channel; delivery to
/// subscribers is asynchronous and best-effort.
pub(crate) async fn publish(State(state): State<AppState>, body: String) -> Response {
    let Ok(message) = serde_json::from_str::<Message>(&body) else {
        return (StatusCode::BAD_REQUEST, "Bad JSON").into_response();
    };

    state.hub.publish(message);
    Json(json!({"ok": true})).into_response()
}
