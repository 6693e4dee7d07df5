//! Cache-change notification seam
//!
//! After every successful publish the controller emits one event. Delivery
//! is hand-off only: `publish` must never make the controller wait for
//! downstream listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

/// Which part of the cache changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeScope {
    /// The whole cache was rebuilt
    Full,
    /// Only the named offerings were refreshed
    Offerings(BTreeSet<String>),
}

/// Emitted once per successful cache publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheChangedEvent {
    /// Unique event ID
    pub id: Uuid,
    /// When the new cache became visible to readers
    pub published_at: DateTime<Utc>,
    /// What changed
    pub scope: ChangeScope,
}

impl CacheChangedEvent {
    /// Create an event for the given scope, stamped now
    pub fn new(scope: ChangeScope) -> Self {
        Self {
            id: Uuid::new_v4(),
            published_at: Utc::now(),
            scope,
        }
    }
}

/// Receives cache-change events, fire-and-forget
pub trait CacheNotifier: Send + Sync {
    /// Hand off an event; must not block on listener execution
    fn publish(&self, event: CacheChangedEvent);
}

/// Notifier that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl CacheNotifier for NoopNotifier {
    fn publish(&self, _event: CacheChangedEvent) {}
}

/// Notifier backed by an unbounded channel
///
/// `send` on an unbounded channel never blocks; a closed receiver means the
/// listener side shut down first, which is not the controller's problem.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: tokio::sync::mpsc::UnboundedSender<CacheChangedEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end for the listener
    pub fn new() -> (
        Self,
        tokio::sync::mpsc::UnboundedReceiver<CacheChangedEvent>,
    ) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl CacheNotifier for ChannelNotifier {
    fn publish(&self, event: CacheChangedEvent) {
        if self.sender.send(event).is_err() {
            debug!("Cache-change listener is gone, dropping event");
        }
    }
}
