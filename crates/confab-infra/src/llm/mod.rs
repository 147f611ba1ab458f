//! LLM provider implementations.
//!
//! Concrete implementations of the [`LlmProvider`] trait defined in
//! `confab-core`: the Anthropic Messages API with SSE streaming, and an
//! OpenAI-compatible adapter used for the xAI secondary.
//!
//! [`create_provider`] constructs the right adapter from a
//! [`ProviderConfig`]; [`build_failover`] assembles the primary/secondary
//! pair the gateway runs with.

pub mod anthropic;
pub mod openai_compat;

use secrecy::SecretString;

use confab_core::llm::failover::FailoverOrchestrator;
use confab_core::llm::provider::LlmProvider;
use confab_types::config::{ProviderConfig, ProvidersConfig};
use confab_types::llm::{LlmError, ProviderKind};

use self::anthropic::AnthropicProvider;
use self::openai_compat::OpenAiCompatibleProvider;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Create a provider from its configuration.
///
/// # Errors
///
/// Returns [`LlmError::AuthenticationFailed`] when the config carries no
/// API key (neither from file nor environment).
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    if config.api_key.is_empty() {
        return Err(LlmError::AuthenticationFailed);
    }

    match config.kind {
        ProviderKind::Anthropic => {
            let secret = SecretString::from(config.api_key.clone());
            let mut provider = AnthropicProvider::new(secret, config.model.clone())
                .with_max_tokens(config.max_tokens)
                .with_temperature(config.temperature);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        ProviderKind::OpenAiCompatible => {
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_OPENAI_BASE_URL);
            let provider =
                OpenAiCompatibleProvider::new(&config.api_key, base_url, config.model.clone())
                    .with_max_tokens(config.max_tokens)
                    .with_temperature(config.temperature);
            Ok(Box::new(provider))
        }
    }
}

/// Assemble the failover pair from the providers config.
pub fn build_failover(config: &ProvidersConfig) -> Result<FailoverOrchestrator, LlmError> {
    let primary = create_provider(&config.primary)?;
    let secondary = create_provider(&config.secondary)?;
    Ok(FailoverOrchestrator::new(primary, secondary))
}
