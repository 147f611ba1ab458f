//! Observability for the Confab gateway.
//!
//! Tracing subscriber setup (structured logging, optional OpenTelemetry
//! export) and the GenAI semantic-convention attribute names used to
//! instrument LLM calls.

pub mod genai_attrs;
pub mod tracing_setup;
