//! Streaming LLM provider abstraction.

use std::pin::Pin;

use futures_util::Stream;

use confab_types::llm::{CompletionRequest, LlmError, StreamEvent};

/// A provider that streams a completion for a conversation.
///
/// Implementations live behind trait objects so the failover pair can mix
/// provider families through one interface. Failures surface as `Err` items
/// in the returned stream rather than from `stream` itself, so callers hold
/// a uniform stream no matter when the provider fails.
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and failover decisions.
    fn name(&self) -> &str;

    /// Open a completion stream for the request.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>>;
}
