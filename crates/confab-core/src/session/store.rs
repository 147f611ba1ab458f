//! Session store trait.
//!
//! Defines the interface to the distributed key-value service holding
//! session state. Implementations live in confab-infra.

use std::time::Duration;

use confab_types::error::StoreError;

/// Key-value store with hash-field semantics and per-key expiry.
///
/// The session service and the distributed lock are both written against
/// this trait. Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations are cheap clone handles over a shared connection.
pub trait SessionStore: Send + Sync {
    /// Read one hash field. Returns None when the key or field is absent.
    fn hash_get(
        &self,
        key: &str,
        field: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Write hash fields (upsert), creating the key if needed.
    fn hash_set(
        &self,
        key: &str,
        fields: &[(&str, &str)],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Arm or re-arm the key's expiry.
    fn expire(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Whether the key currently exists.
    fn exists(&self, key: &str)
    -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Delete a key. No-op if the key does not exist.
    fn delete(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Conditional write used for lock acquisition: set `key = value` with
    /// the given lease, only if the key does not already exist. Returns
    /// whether the write happened.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        lease: Duration,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Compare-and-delete used for lock release: delete `key` only while it
    /// still holds `value`. Returns whether a delete happened.
    fn delete_if_equals(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Connectivity check for the health probe. Mutates nothing.
    fn ping(&self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
