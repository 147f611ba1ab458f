//! Session, relay, and failover logic for the confab gateway.
//!
//! This crate holds the gateway's engine: the session service and
//! distributed lock over the [`session::store::SessionStore`] port, the
//! process-local connection registry, the streaming relay that turns
//! provider events into outbound frames, the failover orchestrator, and the
//! pre-flight token-budget guard.
//!
//! Everything here is written against traits; the concrete store and
//! provider adapters live in confab-infra.

pub mod budget;
pub mod llm;
pub mod registry;
pub mod relay;
pub mod session;
