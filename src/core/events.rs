//! View-state change notifications
//!
//! Every facade publishes what it wrote to the URL and to durable storage on a
//! [`StateEventBus`]. Facades sharing a storage namespace subscribe to the
//! same bus so a column-visibility change made by one of them is picked up by
//! the others without a reload.
//!
//! # Architecture
//!
//! ```text
//! ViewStateFacade ──┐
//!                   ├──▶ StateEventBus::publish() ──▶ broadcast ──▶ other facades
//! LocalStateStore ──┘                                           ──▶ diagnostics
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let bus = StateEventBus::new(256);
//! let mut rx = bus.subscribe();
//!
//! if let Ok(envelope) = rx.recv().await {
//!     other_facade.apply_event(&envelope);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

/// Something a view-state store wrote, or failed to write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StateEvent {
    /// A settled transition replaced the URL query string
    UrlCommitted { origin: Uuid, query: String },

    /// A durable storage entry was written
    StorageWritten { origin: Uuid, key: String },

    /// A durable storage write failed and was swallowed
    StorageWriteFailed {
        origin: Uuid,
        key: String,
        message: String,
    },

    /// A persisted value could not be read and its default was used
    StateRecovered {
        origin: Uuid,
        key: String,
        message: String,
    },
}

impl StateEvent {
    /// Id of the facade or store that emitted the event
    pub fn origin(&self) -> Uuid {
        match self {
            StateEvent::UrlCommitted { origin, .. }
            | StateEvent::StorageWritten { origin, .. }
            | StateEvent::StorageWriteFailed { origin, .. }
            | StateEvent::StateRecovered { origin, .. } => *origin,
        }
    }

    /// Storage key this event relates to (if applicable)
    pub fn storage_key(&self) -> Option<&str> {
        match self {
            StateEvent::StorageWritten { key, .. }
            | StateEvent::StorageWriteFailed { key, .. }
            | StateEvent::StateRecovered { key, .. } => Some(key),
            StateEvent::UrlCommitted { .. } => None,
        }
    }

    /// Get the action name
    pub fn action(&self) -> &str {
        match self {
            StateEvent::UrlCommitted { .. } => "url_committed",
            StateEvent::StorageWritten { .. } => "storage_written",
            StateEvent::StorageWriteFailed { .. } => "storage_write_failed",
            StateEvent::StateRecovered { .. } => "state_recovered",
        }
    }
}

/// Envelope wrapping a state event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: StateEvent,
}

impl EventEnvelope {
    pub fn new(event: StateEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based bus for view-state events
///
/// Cheap to clone; clones share the same channel.
#[derive(Debug, Clone)]
pub struct StateEventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl StateEventBus {
    /// Create a bus buffering up to `capacity` events per slow receiver
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails. Returns the number of receivers the event reached.
    pub fn publish(&self, event: StateEvent) -> usize {
        let envelope = EventEnvelope::new(event);
        // send() returns Err only if there are no receivers, which is fine
        self.sender.send(envelope).unwrap_or(0)
    }

    /// Subscribe to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`; lagged receivers yield an error item
    pub fn stream(&self) -> BroadcastStream<EventEnvelope> {
        BroadcastStream::new(self.sender.subscribe())
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StateEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn test_event_serialization() {
        let event = StateEvent::StorageWritten {
            origin: Uuid::new_v4(),
            key: "posts:per-page".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["action"], "storage_written");
        assert_eq!(json["key"], "posts:per-page");
    }

    #[test]
    fn test_event_accessors() {
        let origin = Uuid::new_v4();
        let event = StateEvent::UrlCommitted {
            origin,
            query: "page=2".to_string(),
        };
        assert_eq!(event.origin(), origin);
        assert_eq!(event.storage_key(), None);
        assert_eq!(event.action(), "url_committed");
    }

    #[tokio::test]
    async fn test_bus_publish_subscribe() {
        let bus = StateEventBus::new(16);
        let mut rx = bus.subscribe();

        let receivers = bus.publish(StateEvent::StorageWritten {
            origin: Uuid::new_v4(),
            key: "posts:order".to_string(),
        });
        assert_eq!(receivers, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event.storage_key(), Some("posts:order"));
    }

    #[tokio::test]
    async fn test_bus_stream() {
        let bus = StateEventBus::new(16);
        let mut stream = bus.stream();

        bus.publish(StateEvent::UrlCommitted {
            origin: Uuid::new_v4(),
            query: "page=1".to_string(),
        });

        let item = stream.next().await.unwrap().unwrap();
        assert_eq!(item.event.action(), "url_committed");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = StateEventBus::default();
        let receivers = bus.publish(StateEvent::StateRecovered {
            origin: Uuid::new_v4(),
            key: "posts:visibility".to_string(),
            message: "expected map".to_string(),
        });
        assert_eq!(receivers, 0);
    }
}
