// src/events/mod.rs

//! Change events published by the orchestration core.
//!
//! Delivery is best effort: events go to whoever is subscribed at the time of
//! publication and are never persisted or replayed.

pub mod notifier;

pub use notifier::Notifier;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::debug;

/// Kind of entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventEntityType {
    DataNode,
    Task,
    Sequence,
    Job,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventOperation {
    Creation,
    Update,
    Deletion,
    Submission,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub entity_type: EventEntityType,
    pub entity_id: String,
    pub operation: EventOperation,
    /// Name of the changed attribute, for `Update` events.
    pub attribute_name: Option<String>,
    pub attribute_value: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        entity_type: EventEntityType,
        entity_id: impl Into<String>,
        operation: EventOperation,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            operation,
            attribute_name: None,
            attribute_value: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attribute_name = Some(name.into());
        self.attribute_value = Some(value);
        self
    }
}

/// Events taken off a subscription, counted per entity type and operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTally {
    pub counts: BTreeMap<(EventEntityType, EventOperation), usize>,
    /// Events lost because the subscriber lagged behind.
    pub dropped: u64,
}

impl EventTally {
    /// Take every event currently buffered in `rx` without waiting.
    pub fn drain(rx: &mut Receiver<Event>) -> Self {
        let mut tally = Self::default();
        loop {
            match rx.try_recv() {
                Ok(event) => {
                    debug!(
                        entity = %event.entity_id,
                        operation = ?event.operation,
                        attribute = ?event.attribute_name,
                        "event"
                    );
                    *tally
                        .counts
                        .entry((event.entity_type, event.operation))
                        .or_default() += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => tally.dropped += skipped,
                Err(_) => return tally,
            }
        }
    }

    pub fn count(&self, entity_type: EventEntityType, operation: EventOperation) -> usize {
        self.counts
            .get(&(entity_type, operation))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}
