//! Outbound streaming frame envelope for duplex channels.
//!
//! Every unit the gateway pushes to a connected client is one JSON object
//! `{ message_id, type, data }`. A generation emits exactly one
//! `message_start`, then `streaming` frames carrying incremental text deltas,
//! then exactly one terminal frame (`message_stop` or `error`).

use serde::{Deserialize, Serialize};

use std::fmt;

/// Discriminator for the frame envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    MessageStart,
    Streaming,
    MessageStop,
    Error,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::MessageStart => write!(f, "message_start"),
            FrameType::Streaming => write!(f, "streaming"),
            FrameType::MessageStop => write!(f, "message_stop"),
            FrameType::Error => write!(f, "error"),
        }
    }
}

/// One discrete JSON-enveloped unit sent over a duplex channel.
///
/// `message_id` is the provider's message id, stable across every frame of
/// one generation. Error frames raised before an id is known omit the key
/// entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFrame {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message_id: Option<String>,
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub data: String,
}

impl StreamFrame {
    /// Opening frame of a generation. `data` is empty.
    pub fn message_start(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            frame_type: FrameType::MessageStart,
            data: String::new(),
        }
    }

    /// Incremental text delta.
    pub fn streaming(message_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            frame_type: FrameType::Streaming,
            data: delta.into(),
        }
    }

    /// Terminal frame of a successful generation.
    pub fn message_stop(message_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            frame_type: FrameType::MessageStop,
            data: data.into(),
        }
    }

    /// Terminal error frame. `message_id` is `None` when the failure happened
    /// before the provider assigned one.
    pub fn error(message_id: Option<String>, data: impl Into<String>) -> Self {
        Self {
            message_id,
            frame_type: FrameType::Error,
            data: data.into(),
        }
    }
}
