//! Session store backends.
//!
//! [`MemorySessionStore`] is the default and needs nothing external. The
//! Redis backend lives behind the `redis-backend` feature and is selected
//! through the same [`StoreConfig`]; both expose identical semantics via
//! [`SessionStore`], so everything above the store is backend-agnostic.

pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis;

use std::time::Duration;

use confab_core::session::store::SessionStore;
use confab_types::config::{StoreBackend, StoreConfig};
use confab_types::error::StoreError;

pub use memory::MemorySessionStore;
#[cfg(feature = "redis-backend")]
pub use redis::RedisSessionStore;

/// The configured session store, dispatched by enum rather than trait
/// object so the store trait can keep its RPITIT methods.
#[derive(Clone)]
pub enum SessionStoreBackend {
    Memory(MemorySessionStore),
    #[cfg(feature = "redis-backend")]
    Redis(RedisSessionStore),
}

// Manual impl: the backends hold connection state without `Debug`.
impl std::fmt::Debug for SessionStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStoreBackend::Memory(_) => f.debug_tuple("Memory").finish(),
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(_) => f.debug_tuple("Redis").finish(),
        }
    }
}

/// Build the backend named by the config.
pub async fn connect(config: &StoreConfig) -> Result<SessionStoreBackend, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("using in-memory session store");
            Ok(SessionStoreBackend::Memory(MemorySessionStore::new()))
        }
        StoreBackend::Redis => {
            #[cfg(feature = "redis-backend")]
            {
                tracing::info!("connecting to redis session store");
                let store = RedisSessionStore::connect(&config.url).await?;
                Ok(SessionStoreBackend::Redis(store))
            }
            #[cfg(not(feature = "redis-backend"))]
            {
                Err(StoreError::Connection(
                    "store backend 'redis' requires building with the redis-backend feature"
                        .to_string(),
                ))
            }
        }
    }
}

impl SessionStore for SessionStoreBackend {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.hash_get(key, field).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.hash_get(key, field).await,
        }
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.hash_set(key, fields).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.hash_set(key, fields).await,
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.expire(key, ttl).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.expire(key, ttl).await,
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.exists(key).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.exists(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.delete(key).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.delete(key).await,
        }
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        lease: Duration,
    ) -> Result<bool, StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.set_if_absent(key, value, lease).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.set_if_absent(key, value, lease).await,
        }
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.delete_if_equals(key, value).await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.delete_if_equals(key, value).await,
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            SessionStoreBackend::Memory(store) => store.ping().await,
            #[cfg(feature = "redis-backend")]
            SessionStoreBackend::Redis(store) => store.ping().await,
        }
    }
}
