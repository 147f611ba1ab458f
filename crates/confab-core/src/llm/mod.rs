//! Streaming provider abstraction and the primary/secondary failover pair.

pub mod failover;
pub mod overload;
pub mod provider;
