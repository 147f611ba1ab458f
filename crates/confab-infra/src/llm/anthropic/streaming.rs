//! SSE handling for Anthropic streaming responses.
//!
//! A streaming response is a sequence of named SSE events:
//! `message_start`, then per content block `content_block_start`,
//! repeated `content_block_delta`, `content_block_stop`, then
//! `message_delta` (final usage) and `message_stop`. `ping` keepalives
//! and `error` events can appear anywhere in the sequence.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use confab_types::llm::{LlmError, StreamEvent, TokenUsage};

use super::types::{
    AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ErrorPayload, MessageDeltaPayload,
    MessageStartPayload,
};

const API_VERSION: &str = "2023-06-01";

/// Token counts accumulated across the event sequence.
///
/// `message_start` carries the input count, `message_delta` the final
/// output count. Only once both ends have reported does a snapshot exist.
#[derive(Default)]
struct UsageTracker {
    input_tokens: u32,
    output_tokens: u32,
    reported: bool,
}

impl UsageTracker {
    fn snapshot(&self) -> Option<TokenUsage> {
        self.reported.then_some(TokenUsage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        })
    }
}

/// Issue the streaming request and adapt the SSE events.
///
/// HTTP-level failures surface as the first (and only) item of the
/// returned stream.
pub fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.clone();

    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .header("x-api-key", api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            Err(match status.as_u16() {
                401 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited { retry_after_ms: None },
                529 => LlmError::Overloaded(error_body),
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            })?;
        } else {
            let mut usage = UsageTracker::default();
            let mut events = response.bytes_stream().eventsource();
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
                let mut finished = false;
                for mapped in map_sse_event(&event.event, &event.data, &mut usage)? {
                    if matches!(mapped, StreamEvent::MessageStop) {
                        finished = true;
                    }
                    yield mapped;
                }
                if finished {
                    break;
                }
            }
        }
    })
}

/// Map one SSE event to zero or more stream events.
///
/// Usage is withheld until `message_stop`, so it lands exactly once and
/// only on complete generations.
fn map_sse_event(
    event: &str,
    data: &str,
    usage: &mut UsageTracker,
) -> Result<Vec<StreamEvent>, LlmError> {
    match event {
        "message_start" => {
            let payload: MessageStartPayload = parse(data)?;
            if let Some(counts) = payload.message.usage {
                usage.input_tokens = counts.input_tokens;
            }
            Ok(vec![StreamEvent::MessageStart {
                message_id: payload.message.id,
            }])
        }
        "content_block_delta" => {
            let payload: ContentBlockDeltaPayload = parse(data)?;
            Ok(match payload.delta {
                AnthropicDelta::TextDelta { text } => vec![StreamEvent::TextDelta { text }],
                AnthropicDelta::ThinkingDelta { thinking } => {
                    vec![StreamEvent::Thinking { text: thinking }]
                }
                AnthropicDelta::Other => Vec::new(),
            })
        }
        "message_delta" => {
            let payload: MessageDeltaPayload = parse(data)?;
            usage.output_tokens = payload.usage.output_tokens;
            if payload.usage.input_tokens > 0 {
                usage.input_tokens = payload.usage.input_tokens;
            }
            usage.reported = true;
            Ok(Vec::new())
        }
        "message_stop" => {
            let mut mapped = Vec::new();
            if let Some(snapshot) = usage.snapshot() {
                mapped.push(StreamEvent::Usage(snapshot));
            }
            mapped.push(StreamEvent::MessageStop);
            Ok(mapped)
        }
        "error" => Err(map_error_event(data)),
        "ping" | "content_block_start" | "content_block_stop" => Ok(Vec::new()),
        other => {
            tracing::debug!(event = other, "ignoring unknown stream event");
            Ok(Vec::new())
        }
    }
}

fn map_error_event(data: &str) -> LlmError {
    match serde_json::from_str::<ErrorPayload>(data) {
        Ok(payload) if payload.error.error_type == "overloaded_error" => {
            LlmError::Overloaded(payload.error.message)
        }
        // Keep the raw body so overload classification can still inspect it.
        _ => LlmError::Provider {
            message: data.to_string(),
        },
    }
}

fn parse<T: serde::de::DeserializeOwned>(data: &str) -> Result<T, LlmError> {
    serde_json::from_str(data).map_err(|e| LlmError::Deserialization(format!("event payload: {e}")))
}
