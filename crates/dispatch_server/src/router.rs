use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;
use crate::ws;

/// - `GET /ws` -- dispatch WebSocket
/// - `GET /health` -- liveness plus connection and driver counts
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_dispatch))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let connections = state.service().registry().len();
    match state.store().len() {
        Ok(drivers) => Json(json!({
            "status": "ok",
            "connections": connections,
            "drivers": drivers,
        }))
        .into_response(),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded", "error": error.to_string() })),
        )
            .into_response(),
    }
}
