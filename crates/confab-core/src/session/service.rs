//! Session lifecycle and history access over a [`SessionStore`].
//!
//! A user has at most one live session, named by the pointer key
//! `user:{user_id}`; the session hash at `user:{user_id}:{session_id}`
//! carries the conversation history as a JSON array and expires on a TTL
//! armed at creation.
//!
//! History reads are tolerant: a stored history that is absent or fails to
//! parse yields an empty history and a logged error, never a propagated
//! failure. Conversation continuity is best-effort; losing it must not take
//! the connection down.

use std::time::Duration;

use uuid::Uuid;

use confab_types::chat::{self, Turn, fields};
use confab_types::error::StoreError;

use crate::session::store::SessionStore;

/// A resolved live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_key: String,
    pub history: Vec<Turn>,
}

/// Durable session state keyed by user identity.
#[derive(Clone)]
pub struct SessionService<S> {
    store: S,
    session_ttl: Duration,
}

impl<S: SessionStore> SessionService<S> {
    pub fn new(store: S, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    /// Resolve the user's live session, or mint a new one.
    ///
    /// Idempotent within the TTL: a second call for the same user returns
    /// the same session key without minting a second session id.
    pub async fn get_or_create(
        &self,
        user_id: &str,
        user_name: &str,
    ) -> Result<SessionHandle, StoreError> {
        let pointer_key = chat::user_pointer_key(user_id);

        if let Some(session_id) = self.store.hash_get(&pointer_key, fields::SESSION_ID).await? {
            let session_key = chat::full_session_key(user_id, &session_id);
            // The pointer has no TTL of its own; the session hash does. A
            // pointer to an expired hash must mint fresh, not revive it.
            if self.store.exists(&session_key).await? {
                let history = self.read_history(&session_key).await?;
                return Ok(SessionHandle {
                    session_key,
                    history,
                });
            }
            tracing::debug!(user_id, "session pointer refers to an expired session");
        }

        let session_id = Uuid::new_v4().to_string();
        let session_key = chat::full_session_key(user_id, &session_id);

        self.store
            .hash_set(&pointer_key, &[(fields::SESSION_ID, &session_id)])
            .await?;
        self.store
            .hash_set(
                &session_key,
                &[
                    (fields::USER_ID, user_id),
                    (fields::USER_NAME, user_name),
                    (fields::SESSION_ID, &session_id),
                    (fields::CONVERSATION_HISTORY, "[]"),
                ],
            )
            .await?;
        self.store.expire(&session_key, self.session_ttl).await?;

        tracing::info!(user_id, session_key = %session_key, "created new session");

        Ok(SessionHandle {
            session_key,
            history: Vec::new(),
        })
    }

    /// Load the stored history for a session key.
    ///
    /// An absent or unparseable `conversation_history` field yields an empty
    /// history; the parse failure is logged and the stored value left for
    /// the next locked append to overwrite.
    pub async fn read_history(&self, session_key: &str) -> Result<Vec<Turn>, StoreError> {
        let raw = self
            .store
            .hash_get(session_key, fields::CONVERSATION_HISTORY)
            .await?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        match parse_history(&raw) {
            Ok(history) => Ok(history),
            Err(err) => {
                tracing::error!(session_key, error = %err, "resetting unparseable conversation history");
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite the stored history. Only legal while holding the session
    /// lock; everything outside `SessionLock` goes through `read_history`.
    pub(crate) async fn write_history(
        &self,
        session_key: &str,
        history: &[Turn],
    ) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(history)
            .map_err(|e| StoreError::Operation(format!("serializing history: {e}")))?;
        self.store
            .hash_set(session_key, &[(fields::CONVERSATION_HISTORY, &serialized)])
            .await
    }

    /// Re-arm the session TTL.
    pub(crate) async fn refresh_ttl(&self, session_key: &str) -> Result<(), StoreError> {
        self.store.expire(session_key, self.session_ttl).await
    }

    /// Tear down the user's live session. Returns whether one existed.
    pub async fn delete_session(&self, user_id: &str) -> Result<bool, StoreError> {
        let pointer_key = chat::user_pointer_key(user_id);

        if !self.store.exists(&pointer_key).await? {
            return Ok(false);
        }

        if let Some(session_id) = self.store.hash_get(&pointer_key, fields::SESSION_ID).await? {
            let session_key = chat::full_session_key(user_id, &session_id);
            self.store.delete(&session_key).await?;
        }
        self.store.delete(&pointer_key).await?;

        tracing::info!(user_id, "session ended");
        Ok(true)
    }

    /// Store connectivity check for the health probe.
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

fn parse_history(raw: &str) -> Result<Vec<Turn>, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::MalformedState(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Arc, Mutex};

    /// Hash-and-string map store without expiry enforcement. TTL behavior
    /// is covered against the real in-memory backend in confab-infra.
    #[derive(Clone, Default)]
    pub(crate) struct TestStore {
        hashes: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
        strings: Arc<Mutex<HashMap<String, String>>>,
        pub(crate) lock_attempts: Arc<AtomicU32>,
    }

    impl TestStore {
        fn hashes(&self) -> std::sync::MutexGuard<'_, HashMap<String, HashMap<String, String>>> {
            self.hashes.lock().expect("test store lock poisoned")
        }

        fn strings(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
            self.strings.lock().expect("test store lock poisoned")
        }

        /// Overwrite a hash field directly, bypassing the service.
        pub(crate) fn corrupt_field(&self, key: &str, field: &str, value: &str) {
            self.hashes()
                .entry(key.to_string())
                .or_default()
                .insert(field.to_string(), value.to_string());
        }

        /// Occupy a string key so `set_if_absent` keeps failing.
        pub(crate) fn seed_string(&self, key: &str, value: &str) {
            self.strings().insert(key.to_string(), value.to_string());
        }
    }

    impl SessionStore for TestStore {
        async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
            Ok(self.hashes().get(key).and_then(|h| h.get(field).cloned()))
        }

        async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
            let mut hashes = self.hashes();
            let hash = hashes.entry(key.to_string()).or_default();
            for (field, value) in fields {
                hash.insert((*field).to_string(), (*value).to_string());
            }
            Ok(())
        }

        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
            Ok(())
        }

        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            Ok(self.hashes().contains_key(key) || self.strings().contains_key(key))
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.hashes().remove(key);
            self.strings().remove(key);
            Ok(())
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &str,
            _lease: Duration,
        ) -> Result<bool, StoreError> {
            self.lock_attempts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let mut strings = self.strings();
            if strings.contains_key(key) {
                return Ok(false);
            }
            strings.insert(key.to_string(), value.to_string());
            Ok(true)
        }

        async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
            let mut strings = self.strings();
            if strings.get(key).is_some_and(|held| held == value) {
                strings.remove(key);
                return Ok(true);
            }
            Ok(false)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn service(store: &TestStore) -> SessionService<TestStore> {
        SessionService::new(store.clone(), Duration::from_secs(86_400))
    }

    #[tokio::test]
    async fn get_or_create_mints_pointer_and_session() {
        let store = TestStore::default();
        let svc = service(&store);

        let handle = svc.get_or_create("u1", "Ada").await.unwrap();
        assert!(handle.session_key.starts_with("user:u1:"));
        assert!(handle.history.is_empty());

        let session_id = store
            .hashes()
            .get("user:u1")
            .and_then(|h| h.get(fields::SESSION_ID).cloned())
            .unwrap();
        assert_eq!(handle.session_key, format!("user:u1:{session_id}"));

        let hashes = store.hashes();
        let session = hashes.get(&handle.session_key).unwrap();
        assert_eq!(session.get(fields::USER_NAME).unwrap(), "Ada");
        assert_eq!(session.get(fields::CONVERSATION_HISTORY).unwrap(), "[]");
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let store = TestStore::default();
        let svc = service(&store);

        let first = svc.get_or_create("u1", "Ada").await.unwrap();
        let second = svc.get_or_create("u1", "Ada").await.unwrap();
        assert_eq!(first.session_key, second.session_key);
    }

    #[tokio::test]
    async fn get_or_create_loads_existing_history() {
        let store = TestStore::default();
        let svc = service(&store);

        let handle = svc.get_or_create("u1", "Ada").await.unwrap();
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        svc.write_history(&handle.session_key, &history)
            .await
            .unwrap();

        let reloaded = svc.get_or_create("u1", "Ada").await.unwrap();
        assert_eq!(reloaded.history, history);
    }

    #[tokio::test]
    async fn read_history_of_unknown_key_is_empty() {
        let store = TestStore::default();
        let svc = service(&store);

        let history = svc.read_history("user:nobody:s1").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn malformed_history_resets_to_empty() {
        let store = TestStore::default();
        let svc = service(&store);

        let handle = svc.get_or_create("u1", "Ada").await.unwrap();
        store.corrupt_field(
            &handle.session_key,
            fields::CONVERSATION_HISTORY,
            "{not json",
        );

        let history = svc.read_history(&handle.session_key).await.unwrap();
        assert!(history.is_empty());

        // A later write replaces the corrupted value.
        svc.write_history(&handle.session_key, &[Turn::user("again")])
            .await
            .unwrap();
        let history = svc.read_history(&handle.session_key).await.unwrap();
        assert_eq!(history, vec![Turn::user("again")]);
    }

    #[tokio::test]
    async fn delete_session_removes_both_keys() {
        let store = TestStore::default();
        let svc = service(&store);

        let handle = svc.get_or_create("u1", "Ada").await.unwrap();
        assert!(svc.delete_session("u1").await.unwrap());

        assert!(store.hashes().get("user:u1").is_none());
        assert!(store.hashes().get(&handle.session_key).is_none());
    }

    #[tokio::test]
    async fn delete_session_for_unknown_user_reports_missing() {
        let store = TestStore::default();
        let svc = service(&store);
        assert!(!svc.delete_session("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn stale_pointer_mints_fresh_session() {
        let store = TestStore::default();
        let svc = service(&store);

        // Pointer present, session hash gone (expired out from under it).
        store.corrupt_field("user:u1", fields::SESSION_ID, "dead-session");

        let handle = svc.get_or_create("u1", "Ada").await.unwrap();
        assert_ne!(handle.session_key, "user:u1:dead-session");
        assert!(store.hashes().contains_key(&handle.session_key));
    }

    #[tokio::test]
    async fn delete_then_get_or_create_mints_fresh_session() {
        let store = TestStore::default();
        let svc = service(&store);

        let first = svc.get_or_create("u1", "Ada").await.unwrap();
        svc.write_history(&first.session_key, &[Turn::user("old")])
            .await
            .unwrap();
        svc.delete_session("u1").await.unwrap();

        let second = svc.get_or_create("u1", "Ada").await.unwrap();
        assert_ne!(first.session_key, second.session_key);
        assert!(second.history.is_empty());
    }
}
