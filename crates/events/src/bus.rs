//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for stack-change notifications.
//! It is shared via `Arc<EventBus>` across the application. Delivery is
//! best-effort fan-out for UI affordances; the authoritative undo/redo
//! state always lives in the `undo_stacks` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use refdata_core::types::DbId;

/// Default broadcast channel capacity. Slow subscribers past this many
/// buffered events observe a `Lagged` error and skip ahead.
const DEFAULT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A batch completed and became its dictionary's undo top.
pub const EVENT_IMPORT_COMPLETED: &str = "dictionary.import.completed";

/// A batch was rolled back and became its dictionary's redo top.
pub const EVENT_IMPORT_UNDONE: &str = "dictionary.import.undone";

/// A rolled-back batch was re-applied and is the undo top again.
pub const EVENT_IMPORT_REDONE: &str = "dictionary.import.redone";

// ---------------------------------------------------------------------------
// PlatformEvent
// ---------------------------------------------------------------------------

/// A stack-change event for one import batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEvent {
    /// Dot-separated event name, e.g. `"dictionary.import.completed"`.
    pub event_type: String,

    /// The dictionary whose stack moved.
    pub dictionary_code: String,

    /// The batch the event is about.
    pub batch_id: DbId,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl PlatformEvent {
    /// Create a new event with an empty payload.
    pub fn new(event_type: impl Into<String>, dictionary_code: impl Into<String>, batch_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            dictionary_code: dictionary_code.into(),
            batch_id,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach a payload to the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Central publish/subscribe hub for [`PlatformEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<PlatformEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with zero subscribers is not an error; the event is
    /// simply dropped.
    pub fn publish(&self, event: PlatformEvent) {
        let receivers = self.sender.receiver_count();
        if let Err(e) = self.sender.send(event) {
            tracing::debug!(error = %e, receivers, "Event dropped (no subscribers)");
        }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<PlatformEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            PlatformEvent::new(EVENT_IMPORT_COMPLETED, "units", 7)
                .with_payload(serde_json::json!({ "successful_records": 3 })),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, EVENT_IMPORT_COMPLETED);
        assert_eq!(event.dictionary_code, "units");
        assert_eq!(event.batch_id, 7);
        assert_eq!(event.payload["successful_records"], 3);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(PlatformEvent::new(EVENT_IMPORT_UNDONE, "units", 1));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::default();
        let mut rx_a = bus.subscribe();
        let mut rx_b = bus.subscribe();

        bus.publish(PlatformEvent::new(EVENT_IMPORT_REDONE, "units", 2));

        assert_eq!(rx_a.recv().await.unwrap().batch_id, 2);
        assert_eq!(rx_b.recv().await.unwrap().batch_id, 2);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::default();
        bus.publish(PlatformEvent::new(EVENT_IMPORT_COMPLETED, "units", 1));

        let mut rx = bus.subscribe();
        bus.publish(PlatformEvent::new(EVENT_IMPORT_COMPLETED, "units", 2));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.batch_id, 2);
    }
}
