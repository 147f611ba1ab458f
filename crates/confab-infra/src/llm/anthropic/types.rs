//! Wire types for the Anthropic Messages API.
//!
//! Request bodies we serialize and the SSE event payloads we deserialize.
//! Fields the gateway never reads are left out; serde skips unknown JSON
//! keys on deserialization.

use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicMessage {
    pub role: String,
    pub content: String,
}

/// Payload of the `message_start` SSE event.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartPayload {
    pub message: MessageStartBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartBody {
    pub id: String,
    pub usage: Option<AnthropicUsage>,
}

/// Payload of a `content_block_delta` SSE event.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockDeltaPayload {
    pub delta: AnthropicDelta,
}

/// Delta kinds inside a content block.
///
/// Tool-use and signature deltas deserialize to [`AnthropicDelta::Other`]
/// and are dropped; the gateway requests neither.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

/// Payload of the `message_delta` SSE event, carrying final usage.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaPayload {
    pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Payload of an `error` SSE event.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub error: AnthropicApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicApiError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}
