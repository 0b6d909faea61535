//! HTTP routes.
//!
//! `/ws` upgrades to the chat protocol. `/health` reports live counters and
//! `/` is a plain-text placeholder.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use roomcast_core::Environment;
use serde::Serialize;

use crate::{SharedState, transport::run_connection};

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running
    pub status: String,
    /// Seconds since the server started
    pub uptime_secs: u64,
    /// Open WebSocket connections known to the relay
    pub connections: usize,
    /// Live rooms, the default room included
    pub rooms: usize,
}

pub(crate) fn router(state: Arc<SharedState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

async fn index() -> &'static str {
    "roomcast relay: connect a WebSocket client to /ws\n"
}

async fn health(State(state): State<Arc<SharedState>>) -> Json<HealthResponse> {
    let driver = state.driver.lock().await;
    let uptime = driver.env().now().saturating_duration_since(state.started_at);

    Json(HealthResponse {
        status: "ok".into(),
        uptime_secs: uptime.as_secs(),
        connections: driver.connection_count(),
        rooms: driver.room_count(),
    })
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<SharedState>>) -> Response {
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| run_connection(socket, state))
}
