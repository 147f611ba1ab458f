//! API key authentication extractor.
//!
//! Extracts the key from either:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! and compares it against the single configured gateway key. Every failure
//! mode renders the same 401 body; callers learn nothing about which part
//! of the check failed.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::http::error::ApiError;
use crate::state::AppState;

/// Authenticated request marker. Extracting this validates the API key.
pub struct Authenticated;

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = extract_api_key(parts).ok_or(ApiError::Unauthorized)?;

        // An unconfigured key rejects everything rather than letting every
        // caller through.
        let expected = state.config.auth.api_key.as_str();
        if expected.is_empty() || presented != expected {
            return Err(ApiError::Unauthorized);
        }

        Ok(Authenticated)
    }
}

/// Extract the API key from request headers.
fn extract_api_key(parts: &Parts) -> Option<String> {
    if let Some(auth) = parts.headers.get("authorization") {
        if let Ok(auth_str) = auth.to_str() {
            if let Some(key) = auth_str.strip_prefix("Bearer ") {
                return Some(key.trim().to_string());
            }
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        if let Ok(key_str) = key.to_str() {
            return Some(key_str.trim().to_string());
        }
    }

    None
}
