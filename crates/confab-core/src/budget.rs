//! Prompt size check applied before any provider work.

use confab_types::error::GatewayError;
use confab_types::llm::CompletionRequest;

/// Estimate the prompt size of a request in tokens: one token per four
/// characters of content, rounded up. Counts characters, not bytes, so
/// multibyte text is not penalized.
pub fn estimate_prompt_tokens(request: &CompletionRequest) -> usize {
    let mut chars = 0;
    for turn in &request.messages {
        chars += turn.content.chars().count();
    }
    if let Some(system) = &request.system {
        chars += system.chars().count();
    }
    chars.div_ceil(4)
}

/// Upper bound on the estimated prompt size of a single request.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    limit: usize,
}

impl TokenBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Reject the request if its estimated prompt size exceeds the limit.
    /// A request exactly at the limit passes.
    pub fn check(&self, request: &CompletionRequest) -> Result<(), GatewayError> {
        let token_count = estimate_prompt_tokens(request);
        if token_count > self.limit {
            tracing::warn!(token_count, limit = self.limit, "prompt over token budget");
            return Err(GatewayError::BudgetExceeded {
                token_count,
                limit: self.limit,
            });
        }
        Ok(())
    }
}
