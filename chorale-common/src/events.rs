//! Event types for the Chorale event system
//!
//! Provides the shared event definitions and EventBus used by the staging
//! engine. Events are broadcast via `tokio::sync::broadcast` and can be
//! serialized for transmission to monitoring surfaces.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Chorale event types
///
/// Events are broadcast via EventBus to any number of subscribers. Emission
/// never blocks audio delivery; frequent events use `emit_lossy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChoraleEvent {
    /// The underrun watchdog delivered a silence chunk to keep a sink alive
    WatchdogSilence {
        /// Staging queue that underran
        queue_id: Uuid,
        /// Head time after the silence chunk (seconds)
        head_secs: f64,
        /// When the chunk was delivered
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A hold placeholder was resolved and its content spliced in
    HoldResolved {
        /// Staging queue the hold belonged to
        queue_id: Uuid,
        /// Number of sources spliced in (zero for a no-op splice)
        spliced: usize,
        /// When the splice happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A synchronization batch was scheduled across queues
    SyncScheduled {
        /// Number of participating queues
        participants: usize,
        /// Scheduled start of the alignment anchor (seconds on its queue's clock)
        anchor_start_secs: f64,
        /// When the batch was scheduled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A clock-offset measurement round trip completed
    ClockOffsetMeasured {
        /// Session id of the completed round trip
        session_id: Uuid,
        /// Measured playback offset correction (seconds)
        offset_secs: f64,
        /// When the report arrived
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for ChoraleEvent
///
/// One-to-many event distribution. Slow subscribers lag and drop old events
/// rather than exerting backpressure on the staging engine.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<ChoraleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ChoraleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or an error if no subscriber is listening.
    pub fn emit(
        &self,
        event: ChoraleEvent,
    ) -> std::result::Result<usize, broadcast::error::SendError<ChoraleEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the absence of subscribers
    ///
    /// Used for frequent events (watchdog silence) where nobody listening
    /// is the normal case.
    pub fn emit_lossy(&self, event: ChoraleEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
