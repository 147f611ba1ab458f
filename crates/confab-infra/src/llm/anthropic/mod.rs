//! Anthropic Messages API provider.
//!
//! Talks to `POST /v1/messages` with `stream: true` and converts the SSE
//! event sequence into [`confab_types::llm::StreamEvent`]s.

pub mod client;
pub mod streaming;
pub mod types;

pub use client::AnthropicProvider;
