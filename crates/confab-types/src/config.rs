//! Gateway configuration types.
//!
//! `GatewayConfig` represents the top-level `confab.toml`. Every field has a
//! default matching observed production tuning, so an empty or missing file
//! yields a runnable (in-memory, single-key-auth) gateway. Secrets in the
//! file are plain strings; the loader in `confab-infra` prefers environment
//! variables, and provider adapters wrap keys in `secrecy::SecretString` at
//! construction.

use serde::{Deserialize, Serialize};

use crate::llm::ProviderKind;

/// Top-level configuration for the confab gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Bind address and the externally visible base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL advertised to clients in `websocket_url`
    /// (e.g. `wss://gateway.example.com`). Scheme included.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_public_base_url() -> String {
    "ws://localhost:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: default_public_base_url(),
        }
    }
}

/// Static bearer-key authentication for session-lifecycle endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The single accepted API key. `CONFAB_API_KEY` overrides this.
    #[serde(default)]
    pub api_key: String,
}

/// Which session-store backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

/// Session store selection and durability tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// Connection URL for the redis backend; ignored by the memory backend.
    #[serde(default = "default_store_url")]
    pub url: String,
    /// TTL applied to the session key at creation.
    #[serde(default = "default_session_ttl_seconds")]
    pub session_ttl_seconds: u64,
    /// Re-arm the TTL on every locked append. Off by default: the TTL
    /// anchors to session creation.
    #[serde(default)]
    pub refresh_ttl_on_append: bool,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_store_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_session_ttl_seconds() -> u64 {
    86_400
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
            session_ttl_seconds: default_session_ttl_seconds(),
            refresh_ttl_on_append: false,
        }
    }
}

/// Distributed-lock tuning for the locked history append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Acquisition attempts before giving up with lock contention.
    #[serde(default = "default_lock_attempts")]
    pub attempts: u32,
    /// Lease on the lock key; an expired lease is self-healing.
    #[serde(default = "default_lock_lease_ms")]
    pub lease_ms: u64,
    /// Base for the exponential sleep between failed attempts
    /// (`base * 2^attempt`).
    #[serde(default = "default_lock_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

fn default_lock_attempts() -> u32 {
    3
}

fn default_lock_lease_ms() -> u64 {
    2_000
}

fn default_lock_backoff_base_ms() -> u64 {
    200
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            attempts: default_lock_attempts(),
            lease_ms: default_lock_lease_ms(),
            backoff_base_ms: default_lock_backoff_base_ms(),
        }
    }
}

/// Pre-flight token ceiling for assembled prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_max_prompt_tokens")]
    pub max_prompt_tokens: u32,
}

fn default_max_prompt_tokens() -> u32 {
    150_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: default_max_prompt_tokens(),
        }
    }
}

/// One upstream provider slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    /// Plain-text key from the file; the loader prefers the provider's
    /// environment variable and never logs either.
    #[serde(default)]
    pub api_key: String,
    /// Override the adapter's default endpoint (required for
    /// OpenAI-compatible vendors other than OpenAI itself).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_provider_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
}

fn default_provider_max_tokens() -> u32 {
    7_024
}

/// Primary/secondary provider pair for the failover orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_primary")]
    pub primary: ProviderConfig,
    #[serde(default = "default_secondary")]
    pub secondary: ProviderConfig,
}

fn default_primary() -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::Anthropic,
        model: "claude-3-7-sonnet-20250219".to_string(),
        api_key: String::new(),
        base_url: None,
        max_tokens: default_provider_max_tokens(),
        temperature: Some(0.0),
    }
}

fn default_secondary() -> ProviderConfig {
    ProviderConfig {
        kind: ProviderKind::OpenAiCompatible,
        model: "grok-3-mini-fast-beta".to_string(),
        api_key: String::new(),
        base_url: Some("https://api.x.ai/v1".to_string()),
        max_tokens: default_provider_max_tokens(),
        temperature: Some(0.2),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
        }
    }
}
