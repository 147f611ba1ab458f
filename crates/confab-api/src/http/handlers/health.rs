//! Liveness and readiness probes.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::state::AppState;

/// `GET /` - banner for anyone poking the root.
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "confab gateway is running" }))
}

/// `GET /health` - readiness, gated on session store connectivity.
pub async fn health_check(State(state): State<AppState>) -> Response {
    match state.sessions.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "store": "connected" })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
