//! Overload classification for failover decisions.
//!
//! Only capacity problems justify switching providers; auth failures, bad
//! requests, and rate limits would fail the same way anywhere and are
//! terminal. Classification is three-tiered because overload surfaces
//! inconsistently upstream: a typed error, a JSON error body smuggled
//! through a message string, or just the marker substring in free text.

use confab_types::llm::LlmError;

/// Whether this error means the provider is out of capacity.
pub fn is_overload_error(error: &LlmError) -> bool {
    if matches!(error, LlmError::Overloaded(_)) {
        return true;
    }

    let text = match error {
        LlmError::Provider { message } => message,
        LlmError::Stream(message) | LlmError::Deserialization(message) => message,
        _ => return false,
    };

    if let Ok(body) = serde_json::from_str::<serde_json::Value>(text) {
        if body["error"]["type"] == "overloaded_error" {
            return true;
        }
    }

    text.contains("overloaded_error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_overload_is_overload() {
        assert!(is_overload_error(&LlmError::Overloaded(
            "Overloaded".to_string()
        )));
    }

    #[test]
    fn structured_error_body_is_recognized() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert!(is_overload_error(&LlmError::Provider {
            message: body.to_string(),
        }));
    }

    #[test]
    fn marker_substring_in_free_text_is_recognized() {
        assert!(is_overload_error(&LlmError::Stream(
            "upstream replied with overloaded_error mid-stream".to_string(),
        )));
    }

    #[test]
    fn structured_body_with_other_type_is_not_overload() {
        let body =
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#;
        assert!(!is_overload_error(&LlmError::Provider {
            message: body.to_string(),
        }));
    }

    #[test]
    fn rate_limit_is_terminal() {
        assert!(!is_overload_error(&LlmError::RateLimited {
            retry_after_ms: Some(1_000),
        }));
    }

    #[test]
    fn auth_failure_is_terminal() {
        assert!(!is_overload_error(&LlmError::AuthenticationFailed));
    }
}
