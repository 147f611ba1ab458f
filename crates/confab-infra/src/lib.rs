//! Infrastructure layer for the confab gateway.
//!
//! Contains implementations of the seams defined in `confab-core`: session
//! store backends (in-memory and Redis), the Anthropic and OpenAI-compatible
//! provider adapters, and configuration loading.

pub mod config;
pub mod llm;
pub mod store;
