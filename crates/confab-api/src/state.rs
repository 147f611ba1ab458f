//! Shared application state for the gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use confab_core::budget::TokenBudget;
use confab_core::llm::failover::FailoverOrchestrator;
use confab_core::registry::ConnectionRegistry;
use confab_core::session::lock::SessionLock;
use confab_core::session::service::SessionService;
use confab_infra::store::SessionStoreBackend;
use confab_types::config::GatewayConfig;

pub type ConcreteSessionService = SessionService<SessionStoreBackend>;
pub type ConcreteSessionLock = SessionLock<SessionStoreBackend>;

/// State shared across all request handlers. Cheap to clone: every field is
/// an `Arc` or a handle over one.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub sessions: ConcreteSessionService,
    pub lock: ConcreteSessionLock,
    pub registry: Arc<ConnectionRegistry>,
    pub orchestrator: Arc<FailoverOrchestrator>,
    pub budget: TokenBudget,
}

impl AppState {
    /// Initialize all services from a resolved config.
    ///
    /// Fails fast when the store is unreachable or a provider has no API
    /// key; a gateway that cannot answer anything should not start.
    pub async fn init(config: GatewayConfig) -> anyhow::Result<Self> {
        let store = confab_infra::store::connect(&config.store)
            .await
            .context("failed to connect session store")?;

        let sessions = SessionService::new(
            store.clone(),
            Duration::from_secs(config.store.session_ttl_seconds),
        );
        let lock = SessionLock::new(
            store,
            sessions.clone(),
            config.lock.clone(),
            config.store.refresh_ttl_on_append,
        );

        let orchestrator = confab_infra::llm::build_failover(&config.providers)
            .context("failed to build LLM providers")?;

        if config.auth.api_key.is_empty() {
            tracing::warn!("auth.api_key is empty; session endpoints will reject every request");
        }

        Ok(Self {
            budget: TokenBudget::new(config.budget.max_prompt_tokens as usize),
            config: Arc::new(config),
            sessions,
            lock,
            registry: Arc::new(ConnectionRegistry::new()),
            orchestrator: Arc::new(orchestrator),
        })
    }
}
