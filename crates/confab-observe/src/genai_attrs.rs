//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! These follow the OTel GenAI Semantic Conventions specification for
//! consistent LLM call instrumentation across the codebase. The constants
//! are attribute keys for [`record_usage`] and direct
//! `OpenTelemetrySpanExt::set_attribute` calls.
//!
//! Span naming convention: `"{operation} {provider}"` (e.g., `"gen_ai.chat"`
//! with `gen_ai.system = "anthropic"`)

use tracing_opentelemetry::OpenTelemetrySpanExt;

// --- Required attributes ---

/// The name of the operation being performed (e.g., "chat").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "anthropic").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

// --- Recommended attributes ---

/// The model ID requested (e.g., "claude-3-7-sonnet-20250219").
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// The sampling temperature for the request.
pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

/// The maximum number of output tokens requested.
pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The unique response/message ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

// --- Provider name values ---

/// Anthropic provider identifier.
pub const PROVIDER_ANTHROPIC: &str = "anthropic";

/// OpenAI-compatible provider identifier.
pub const PROVIDER_OPENAI_COMPATIBLE: &str = "openai_compatible";

/// Attach reported token counts to a span as GenAI usage attributes.
///
/// No-op unless the OpenTelemetry layer is active on the subscriber.
pub fn record_usage(span: &tracing::Span, input_tokens: u32, output_tokens: u32) {
    span.set_attribute(GEN_AI_USAGE_INPUT_TOKENS, i64::from(input_tokens));
    span.set_attribute(GEN_AI_USAGE_OUTPUT_TOKENS, i64::from(output_tokens));
}
