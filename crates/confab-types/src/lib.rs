//! Shared domain types for the confab gateway.
//!
//! This crate contains the core domain types used across the gateway:
//! conversation turns, session keys, streaming frames, provider stream
//! events, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod frame;
pub mod llm;
