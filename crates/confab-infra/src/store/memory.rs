//! In-memory session store.
//!
//! Single-process stand-in for the Redis backend with the same observable
//! semantics: hash-valued session keys, string-valued lock keys, per-key
//! expiry, and conditional set/delete for leases. Expiry is enforced lazily
//! on access, against the tokio clock so tests can pause time.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use confab_core::session::store::SessionStore;
use confab_types::error::StoreError;

enum Value {
    Hash(HashMap<String, String>),
    Str(String),
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().expect("session store lock poisoned")
    }
}

/// Drop the entry if its expiry has passed, then hand back what is left.
fn live_entry<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
    let expired = entries
        .get(key)
        .is_some_and(|e| e.expires_at.is_some_and(|at| Instant::now() >= at));
    if expired {
        entries.remove(key);
        return None;
    }
    entries.get_mut(key)
}

impl SessionStore for MemorySessionStore {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.lock();
        match live_entry(&mut entries, key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Hash(hash) => Ok(hash.get(field).cloned()),
                Value::Str(_) => Err(StoreError::Operation(format!(
                    "key '{key}' does not hold a hash"
                ))),
            },
        }
    }

    async fn hash_set(&self, key: &str, fields: &[(&str, &str)]) -> Result<(), StoreError> {
        let mut entries = self.lock();
        // Purge first so a write after expiry starts a fresh, TTL-less key.
        live_entry(&mut entries, key);
        let entry = entries.entry(key.to_string()).or_insert(Entry {
            value: Value::Hash(HashMap::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Hash(hash) => {
                for (field, value) in fields {
                    hash.insert((*field).to_string(), (*value).to_string());
                }
                Ok(())
            }
            Value::Str(_) => Err(StoreError::Operation(format!(
                "key '{key}' does not hold a hash"
            ))),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if let Some(entry) = live_entry(&mut entries, key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        Ok(live_entry(&mut entries, key).is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        lease: Duration,
    ) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        if live_entry(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(Instant::now() + lease),
            },
        );
        Ok(true)
    }

    async fn delete_if_equals(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock();
        let held = match live_entry(&mut entries, key) {
            Some(entry) => match &entry.value {
                Value::Str(held) => held == value,
                Value::Hash(_) => false,
            },
            None => false,
        };
        if held {
            entries.remove(key);
        }
        Ok(held)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
