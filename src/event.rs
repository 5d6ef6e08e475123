//! Structured events emitted by the pool on every lifecycle transition.
//!
//! Consumers subscribe to the event stream to build progress displays or
//! audit logs. Events are the pool's voice; `tracing` output is the
//! operator's.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::model::WorkId;

/// A structured event emitted by the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    WorkSubmitted {
        id: WorkId,
    },
    WorkClaimed {
        id: WorkId,
        worker: String,
    },
    WorkCompleted {
        id: WorkId,
        worker: String,
        duration_ms: u64,
    },
    WorkFailed {
        id: WorkId,
        worker: String,
        error: String,
    },
    WorkerStarted {
        worker: String,
    },
    WorkerStopped {
        worker: String,
    },
    QueueClosed,
}

/// Fan-out of events to any number of channel subscribers.
#[derive(Default)]
pub struct EventBus {
    seq: AtomicU64,
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It sees only events emitted after this call.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Live subscribers as of the last emit; hung-up receivers are only
    /// noticed when an event is sent.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Emit an event to every live subscriber; drop the ones that hung up.
    pub fn emit(&self, kind: EventKind) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        // seq is taken under the lock so delivery order matches seq order
        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            kind,
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
