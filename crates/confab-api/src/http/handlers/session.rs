//! Session lifecycle endpoints.
//!
//! - `POST /chat/start_session` - resolve or mint the caller's live session
//! - `POST /chat/end_session` - tear the caller's session down
//!
//! Both require an API key. Starting is idempotent within the session TTL:
//! a second call returns the same session key and whatever history it has
//! accumulated, so clients can reconnect without losing context.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::json;

use confab_types::chat::Turn;

use crate::http::error::ApiError;
use crate::http::extractors::auth::Authenticated;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_key: String,
    pub user_id: String,
    pub user_name: String,
    pub status: String,
    pub conversation_history: Vec<Turn>,
    pub websocket_url: String,
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    pub user_id: String,
}

/// `POST /chat/start_session`
pub async fn start_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, ApiError> {
    let session = state
        .sessions
        .get_or_create(&body.user_id, &body.user_name)
        .await?;

    let websocket_url = format!(
        "{}/ws/{}",
        state.config.server.public_base_url, body.user_id
    );

    Ok(Json(StartSessionResponse {
        session_key: session.session_key,
        user_id: body.user_id,
        user_name: body.user_name,
        status: "Session started successfully".to_string(),
        conversation_history: session.history,
        websocket_url,
    }))
}

/// `POST /chat/end_session`
pub async fn end_session(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(body): Json<EndSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.sessions.delete_session(&body.user_id).await? {
        Ok(Json(json!({ "message": "Session ended successfully" })))
    } else {
        Err(ApiError::SessionNotFound)
    }
}
