//! Error taxonomy for the confab gateway.
//!
//! `StoreError` covers the backing key-value store; `GatewayError` is the
//! request-level taxonomy surfaced by the pipeline. Provider-side errors
//! live in [`crate::llm::LlmError`].

use crate::llm::LlmError;

/// Failures of the backing session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store is unreachable or refused the connection.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A command against a reachable store failed.
    #[error("store operation failed: {0}")]
    Operation(String),

    /// A stored history failed to parse. Recovered by resetting to an empty
    /// history; never propagated past the session service.
    #[error("malformed session state: {0}")]
    MalformedState(String),
}

/// Request-level failures surfaced by the gateway pipeline.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The assembled prompt exceeds the configured token ceiling. Raised
    /// before any upstream call.
    #[error("query of {token_count} tokens exceeds the token limit of {limit}")]
    BudgetExceeded { token_count: usize, limit: usize },

    /// The post-stream history append lost the lock race after all retries.
    /// Non-fatal for the connection: the answer already streamed, only
    /// persistence failed.
    #[error("could not acquire session lock for '{session_key}' after {attempts} attempts")]
    LockContention { session_key: String, attempts: u32 },

    /// Non-overload provider failure. Terminal for the request; the
    /// secondary is not consulted.
    #[error("upstream provider failed: {0}")]
    Upstream(#[source] LlmError),

    /// Primary overloaded and the secondary failed too. The display text is
    /// the exact user-facing message; underlying causes are logged only.
    #[error("Both services are currently experiencing high demand. Please try again in a few minutes.")]
    ProvidersExhausted,

    /// Backing-store failure wrapped for the request path.
    #[error(transparent)]
    Store(#[from] StoreError),
}
