// src/events/notifier.rs

use tokio::sync::broadcast;
use tracing::trace;

use super::Event;

pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// In-process event bus.
///
/// Cheap to clone; every clone publishes into the same channel. Publishing
/// never blocks and never fails: with no subscriber the event is dropped,
/// and slow subscribers observe `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Event>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new subscriber. Only events published afterwards are seen.
    pub fn register(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: Event) {
        trace!(
            entity = %event.entity_id,
            operation = ?event.operation,
            attribute = ?event.attribute_name,
            "publishing event"
        );
        // No receivers is not an error for a fire-and-forget bus.
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
