//! Durable session state: the store port, the lifecycle service, and the
//! distributed lock that serializes history appends.

pub mod lock;
pub mod service;
pub mod store;
