//! Application error type mapping to HTTP status codes.
//!
//! Every error renders as `{"error": <message>}` with a status chosen by
//! variant. The streaming path does not come through here; WebSocket
//! failures are reported as error frames on the socket itself.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use confab_types::error::{GatewayError, StoreError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or mismatched API key.
    Unauthorized,
    /// The user has no live session to act on.
    SessionNotFound,
    /// Failure from the session or generation pipeline.
    Gateway(GatewayError),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError::Gateway(e)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Gateway(GatewayError::Store(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized API Key".to_string())
            }
            ApiError::SessionNotFound => {
                (StatusCode::NOT_FOUND, "No active session found".to_string())
            }
            ApiError::Gateway(e @ GatewayError::BudgetExceeded { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            ApiError::Gateway(e @ GatewayError::ProvidersExhausted) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Gateway(e @ GatewayError::Store(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
            ApiError::Gateway(e @ GatewayError::Upstream(_)) => {
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Gateway(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use confab_types::llm::LlmError;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_renders_the_pinned_message() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Unauthorized API Key" })
        );
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let response = ApiError::SessionNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "No active session found" })
        );
    }

    #[test]
    fn gateway_errors_map_to_their_statuses() {
        let cases = [
            (
                GatewayError::BudgetExceeded {
                    token_count: 200_000,
                    limit: 150_000,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                GatewayError::ProvidersExhausted,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::Store(StoreError::Connection("refused".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::Upstream(LlmError::AuthenticationFailed),
                StatusCode::BAD_GATEWAY,
            ),
            (
                GatewayError::LockContention {
                    session_key: "user:u1:s1".to_string(),
                    attempts: 3,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = ApiError::Gateway(error).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
