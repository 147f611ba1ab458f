//! Registry of live duplex connections, keyed by user id.
//!
//! Each connected client owns an unbounded frame channel whose receiving
//! half is drained by that connection's writer task. The registry maps user
//! ids to the sending halves so anything holding the registry can push
//! frames to a user without touching the socket. One live connection per
//! user: a reconnect replaces the previous channel and frames follow the
//! newest connection.
//!
//! The map lock is held only to resolve or mutate entries; the actual send
//! happens outside it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use confab_types::frame::StreamFrame;

use crate::relay::FrameSink;

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, mpsc::UnboundedSender<StreamFrame>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, mpsc::UnboundedSender<StreamFrame>>> {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
    }

    /// Register the outbound channel for a user, replacing any previous one.
    pub fn connect(&self, user_id: &str, sender: mpsc::UnboundedSender<StreamFrame>) {
        let mut connections = self.lock();
        let replaced = connections.insert(user_id.to_string(), sender).is_some();
        tracing::info!(
            user_id,
            replaced,
            total = connections.len(),
            "connection registered"
        );
    }

    /// Drop the user's channel, whichever connection holds it.
    pub fn disconnect(&self, user_id: &str) {
        let mut connections = self.lock();
        if connections.remove(user_id).is_some() {
            tracing::info!(user_id, total = connections.len(), "connection deregistered");
        }
    }

    /// Drop the user's channel only if `sender` is still the registered one.
    /// A connection tearing down late must not evict its replacement.
    pub fn disconnect_channel(&self, user_id: &str, sender: &mpsc::UnboundedSender<StreamFrame>) {
        let mut connections = self.lock();
        let still_current = connections
            .get(user_id)
            .is_some_and(|current| current.same_channel(sender));
        if still_current {
            connections.remove(user_id);
            tracing::info!(user_id, total = connections.len(), "connection deregistered");
        }
    }

    /// Hand a frame to the user's connection.
    ///
    /// Returns whether the frame was handed off. `false` means the user has
    /// no live connection or it closed; that is logged, never raised.
    pub fn send(&self, user_id: &str, frame: StreamFrame) -> bool {
        let sender = {
            let connections = self.lock();
            match connections.get(user_id) {
                Some(sender) => sender.clone(),
                None => {
                    tracing::debug!(user_id, "dropping frame, no live connection");
                    return false;
                }
            }
        };

        if sender.send(frame).is_err() {
            tracing::debug!(user_id, "dropping frame, connection channel closed");
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// [`FrameSink`] view of one user's connection.
#[derive(Clone)]
pub struct UserChannel {
    registry: Arc<ConnectionRegistry>,
    user_id: String,
}

impl UserChannel {
    pub fn new(registry: Arc<ConnectionRegistry>, user_id: impl Into<String>) -> Self {
        Self {
            registry,
            user_id: user_id.into(),
        }
    }
}

impl FrameSink for UserChannel {
    fn send(&self, frame: StreamFrame) -> bool {
        self.registry.send(&self.user_id, frame)
    }
}
