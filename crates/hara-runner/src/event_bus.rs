//! Broadcast-based event bus for pipeline runs.
//!
//! Wraps `tokio::sync::broadcast` so several consumers (progress renderer,
//! JSONL logger) each receive their own copy of every event. Slow consumers
//! lag instead of blocking the run.

use hara_core::event::{EventKind, EventSink, PipelineEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 4096;

/// Central event bus for pipeline progress.
///
/// Clones share one underlying channel: `emit()` on any clone reaches every
/// subscriber.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: Arc<broadcast::Sender<PipelineEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx: Arc::new(tx) }
    }

    /// Emit an event to all subscribers. Dropped when nobody listens.
    pub fn emit(&self, kind: EventKind) {
        let event = PipelineEvent::new(kind);
        // SendError only means there are no receivers
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive pipeline events.
    ///
    /// A subscriber more than `capacity` events behind gets
    /// `RecvError::Lagged` and loses the overflow.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, kind: EventKind) {
        EventBus::emit(self, kind);
    }
}
