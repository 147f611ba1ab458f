//! Primary/secondary failover for streamed generations.
//!
//! The primary provider serves every request. Only when it fails with an
//! overload (classified by [`is_overload_error`]) does the same request go
//! to the secondary, as a fresh generation with its own frame sequence. A
//! non-overload primary failure is returned as-is: retrying elsewhere would
//! not help, and the caller owns how to report it. Once failover has
//! happened there is no third tier, so any secondary failure is reported as
//! exhaustion; its cause is logged, never shown to the user.

use tracing::{Instrument, info_span};

use confab_types::error::GatewayError;
use confab_types::llm::CompletionRequest;

use crate::llm::overload::is_overload_error;
use crate::llm::provider::LlmProvider;
use crate::relay::{FrameSink, RelayOutcome, relay};

pub struct FailoverOrchestrator {
    primary: Box<dyn LlmProvider>,
    secondary: Box<dyn LlmProvider>,
}

impl FailoverOrchestrator {
    pub fn new(primary: Box<dyn LlmProvider>, secondary: Box<dyn LlmProvider>) -> Self {
        Self { primary, secondary }
    }

    /// Stream an answer for the request onto the sink, failing over to the
    /// secondary provider if the primary is overloaded.
    ///
    /// When the secondary fails too, for any reason, the result is
    /// [`GatewayError::ProvidersExhausted`], whose rendering is the
    /// user-facing high-demand notice.
    pub async fn generate<Sk>(
        &self,
        request: CompletionRequest,
        sink: &Sk,
    ) -> Result<RelayOutcome, GatewayError>
    where
        Sk: FrameSink + ?Sized,
    {
        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.system = self.primary.name(),
            gen_ai.request.stream = true,
        );
        let primary_err = match relay(self.primary.stream(request.clone()), sink)
            .instrument(span)
            .await
        {
            Ok(outcome) => return Ok(outcome),
            Err(err) if is_overload_error(&err) => err,
            Err(err) => {
                tracing::error!(
                    provider = self.primary.name(),
                    error = %err,
                    "primary provider failed"
                );
                return Err(GatewayError::Upstream(err));
            }
        };

        tracing::warn!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            error = %primary_err,
            "primary provider overloaded, failing over"
        );

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.system = self.secondary.name(),
            gen_ai.request.stream = true,
        );
        match relay(self.secondary.stream(request), sink)
            .instrument(span)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                tracing::error!(
                    secondary = self.secondary.name(),
                    error = %err,
                    "secondary provider failed after failover"
                );
                Err(GatewayError::ProvidersExhausted)
            }
        }
    }
}
