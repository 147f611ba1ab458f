//! Anthropic Messages API client.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::SecretString;

use confab_core::llm::provider::LlmProvider;
use confab_types::llm::{CompletionRequest, LlmError, StreamEvent};

use super::streaming::create_anthropic_stream;
use super::types::{AnthropicMessage, AnthropicRequest};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 7_024;

// NOTE: this struct intentionally does NOT derive Debug. The api_key field
// is a SecretString, and while secrecy redacts its Debug output, omitting
// the derive keeps the whole client out of debug logs.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f64>,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Override the API base URL (proxies, test servers).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let messages = request
            .messages
            .iter()
            .map(|turn| AnthropicMessage {
                role: turn.role.to_string(),
                content: turn.content.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages,
            system: request.system.clone(),
            stream: true,
            temperature: self.temperature,
        }
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let body = self.to_anthropic_request(&request);
        let url = self.url("/v1/messages");
        create_anthropic_stream(&self.client, &url, body, &self.api_key)
    }
}
