//! Engine event system — lets front ends observe session transitions.
//!
//! Events are published when the session state changes. Subscribers react
//! without the controller knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A user logged in
    SessionStarted {
        user: String,
        timestamp: DateTime<Utc>,
    },

    /// The active user logged out
    SessionEnded {
        user: String,
        timestamp: DateTime<Utc>,
    },

    /// A domain was presented for classification
    DomainStaged {
        user: String,
        domain: String,
        timestamp: DateTime<Utc>,
    },

    /// A domain was classified
    DomainClassified {
        user: String,
        domain: String,
        category: String,
        newly_labeled: bool,
        timestamp: DateTime<Utc>,
    },

    /// A user's recent history was emptied
    HistoryCleared {
        user: String,
        dropped: usize,
        timestamp: DateTime<Utc>,
    },

    /// A new category name was registered
    CategoryAdded {
        category: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for engine events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<EngineEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: EngineEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
