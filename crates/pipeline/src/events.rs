//! In-process progress events backed by a `tokio::sync::broadcast`
//! channel.
//!
//! [`EventBus`] is shared as `Arc<EventBus>` between the orchestrator
//! (publisher) and any number of subscribers (the API's status endpoint,
//! tests). Slow subscribers lag and drop old events rather than blocking
//! generation.

use serde::{Deserialize, Serialize};
use slidecraft_core::types::{EntityId, Epoch, Timestamp};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// DeckEvent
// ---------------------------------------------------------------------------

/// A progress event emitted during deck generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckEvent {
    /// Dot-separated event name, e.g. `"page.image_completed"`.
    pub event_type: String,

    /// Project the event belongs to.
    pub project_id: EntityId,

    /// Generation epoch the event was produced under. Subscribers
    /// rendering live progress should drop events from older epochs.
    pub epoch: Epoch,

    /// The page involved, for page-level events.
    pub page_id: Option<EntityId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl DeckEvent {
    /// Create a new project-level event.
    pub fn new(event_type: impl Into<String>, project_id: EntityId, epoch: Epoch) -> Self {
        Self {
            event_type: event_type.into(),
            project_id,
            epoch,
            page_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Attach the page this event is about.
    pub fn with_page(mut self, page_id: EntityId) -> Self {
        self.page_id = Some(page_id);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`DeckEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<DeckEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed events are
    /// dropped and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero subscribers the event is silently dropped; progress is
    /// always recoverable from the database, the bus is only a live feed.
    pub fn publish(&self, event: DeckEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<DeckEvent> {
        self.sender.subscribe()
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
    use uuid::Uuid;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let project = Uuid::new_v4();
        let page = Uuid::new_v4();

        bus.publish(
            DeckEvent::new("page.image_completed", project, 3)
                .with_page(page)
                .with_payload(serde_json::json!({"order_index": 2})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "page.image_completed");
        assert_eq!(received.project_id, project);
        assert_eq!(received.epoch, 3);
        assert_eq!(received.page_id, Some(page));
        assert_eq!(received.payload["order_index"], 2);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let project = Uuid::new_v4();

        bus.publish(DeckEvent::new("generation.started", project, 1));

        assert_eq!(rx1.recv().await.unwrap().event_type, "generation.started");
        assert_eq!(rx2.recv().await.unwrap().event_type, "generation.started");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(DeckEvent::new("orphan.event", Uuid::new_v4(), 1));
    }
}
