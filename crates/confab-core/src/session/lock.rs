//! Locked read-modify-write appends to a session's history.
//!
//! Concurrent writers for the same session serialize on a store-side lease
//! at `lock:{session_key}`: acquire with a set-if-absent, append both turns
//! under the lease, release with a compare-and-delete keyed on a per-acquire
//! holder token. The token keeps a writer whose lease expired mid-append
//! from deleting a lock some other writer now holds.
//!
//! Acquisition retries with exponential backoff. Exhausting the retries is a
//! per-message failure, not a connection failure; callers report it and move
//! on, and the turns for that message are not persisted.

use std::time::Duration;

use uuid::Uuid;

use confab_types::chat::{self, Turn};
use confab_types::config::LockConfig;
use confab_types::error::{GatewayError, StoreError};

use crate::session::service::SessionService;
use crate::session::store::SessionStore;

#[derive(Clone)]
pub struct SessionLock<S> {
    store: S,
    service: SessionService<S>,
    config: LockConfig,
    refresh_ttl_on_append: bool,
}

impl<S: SessionStore> SessionLock<S> {
    pub fn new(
        store: S,
        service: SessionService<S>,
        config: LockConfig,
        refresh_ttl_on_append: bool,
    ) -> Self {
        Self {
            store,
            service,
            config,
            refresh_ttl_on_append,
        }
    }

    /// Append a user turn and the assistant turn answering it, atomically
    /// with respect to other writers of the same session.
    ///
    /// The history is re-read under the lock, so turns appended by other
    /// writers since the caller last looked are preserved.
    pub async fn append_with_lock(
        &self,
        session_key: &str,
        user_turn: &Turn,
        assistant_turn: &Turn,
    ) -> Result<(), GatewayError> {
        let lock_key = chat::lock_key(session_key);
        let lease = Duration::from_millis(self.config.lease_ms);

        for attempt in 0..self.config.attempts {
            if attempt > 0 {
                let backoff = self.config.backoff_base_ms * 2u64.pow(attempt - 1);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let holder = Uuid::new_v4().to_string();
            if !self.store.set_if_absent(&lock_key, &holder, lease).await? {
                tracing::debug!(session_key, attempt, "session lock busy");
                continue;
            }

            let result = self
                .append_locked(session_key, user_turn, assistant_turn)
                .await;

            match self.store.delete_if_equals(&lock_key, &holder).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(session_key, "session lock expired before release");
                }
                Err(err) => {
                    tracing::warn!(
                        session_key,
                        error = %err,
                        "session lock release failed, lease will expire on its own"
                    );
                }
            }

            return result.map_err(GatewayError::from);
        }

        tracing::error!(
            session_key,
            attempts = self.config.attempts,
            "session lock contention exhausted retries"
        );
        Err(GatewayError::LockContention {
            session_key: session_key.to_string(),
            attempts: self.config.attempts,
        })
    }

    async fn append_locked(
        &self,
        session_key: &str,
        user_turn: &Turn,
        assistant_turn: &Turn,
    ) -> Result<(), StoreError> {
        let mut history = self.service.read_history(session_key).await?;
        history.push(user_turn.clone());
        history.push(assistant_turn.clone());
        self.service.write_history(session_key, &history).await?;
        if self.refresh_ttl_on_append {
            self.service.refresh_ttl(session_key).await?;
        }
        tracing::debug!(session_key, turns = history.len(), "appended turn pair");
        Ok(())
    }
}
