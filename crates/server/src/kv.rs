//! KV HTTP handlers

use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use hearth_core::Value;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub(crate) struct GetParams {
    #[serde(default)]
    key: String,
}

/// `GET /kv/get?key=...`
///
/// The lookup (and a possible blocking upstream fetch) runs on the
/// blocking pool so a slow origin never stalls the async workers.
pub(crate) async fn get_value(
    State(state): State<AppState>,
    Query(params): Query<GetParams>,
) -> Response {
    if params.key.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing key").into_response();
    }

    let store = state.store.clone();
    let key = params.key;
    let item = tokio::task::spawn_blocking(move || store.get(&key))
        .await
        .unwrap_or(None);

    match item {
        Some(item) => Json(item.value).into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SetRequest {
    key: String,
    value: Value,
    #[serde(default)]
    ttl: i64,
}

/// `POST /kv/set` with body `{key, value, ttl}`.
pub(crate) async fn set_value(State(state): State<AppState>, body: String) -> Response {
    let Ok(request) = serde_json::from_str::<SetRequest>(&body) else {
        return (StatusCode::BAD_REQUEST, "Bad JSON").into_response();
    };

    let store = state.store.clone();
    let done = tokio::task::spawn_blocking(move || {
        store.set(&request.key, request.value, request.ttl);
    })
    .await;

    match done {
        Ok(()) => Json(json!({"success": true})).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response(),
    }
}
