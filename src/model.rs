//! Core data model.
//!
//! A work item is an opaque value paired with a [`WorkId`]. The pool never
//! looks inside the value; it only tracks the id through its lifecycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Newtype for work item IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkId(pub Uuid);

impl WorkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for WorkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for WorkId {
    fn default() -> Self {
        Self::new()
    }
}

/// An item travelling through the queue, tagged with its identity.
///
/// Owned by the queue until popped, then by the worker that popped it.
#[derive(Debug)]
pub struct Ticket<T> {
    pub id: WorkId,
    pub item: T,
}

impl<T> Ticket<T> {
    pub fn new(item: T) -> Self {
        Self {
            id: WorkId::new(),
            item,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Tracker-side state of an outstanding item. Acknowledged items are
/// dropped from the tracker rather than kept in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Queued,
    Claimed,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            State::Queued => "queued",
            State::Claimed => "claimed",
        };
        write!(f, "{s}")
    }
}

impl State {
    pub fn can_transition_to(self, to: State) -> bool {
        matches!((self, to), (State::Queued, State::Claimed))
    }
}

/// Result of processing one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// A processing failure surfaced to the producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub id: WorkId,
    pub worker: String,
    pub error: String,
}

/// What a worker hands back to a submitter that asked for the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<O> {
    pub id: WorkId,
    pub worker: String,
    /// The processor's output, or its error / panic message.
    pub result: std::result::Result<O, String>,
    pub duration: Duration,
}

impl<O> Completion<O> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> std::result::Result<O, String> {
        self.result
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Default number of failures a report keeps in detail.
pub const MAX_RETAINED_FAILURES: usize = 1024;

/// Snapshot of everything the tracker has seen since the pool was created.
///
/// Counts are cumulative for the life of the pool. Only the first
/// `MAX_RETAINED_FAILURES` failures are kept in detail; `failed` counts all
/// of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Items registered via submit.
    pub submitted: u64,
    /// Items acknowledged with [`Outcome::Succeeded`].
    pub succeeded: u64,
    /// Items acknowledged with [`Outcome::Failed`].
    pub failed: u64,
    /// Failure details in acknowledgment order, capped.
    pub failures: Vec<Failure>,
    /// Sum of processing time across all acknowledged items.
    pub total_processing: Duration,
    /// Wall-clock time from the first registration to the latest acknowledgment.
    pub span: Duration,
}

impl Report {
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }

    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.completed())
    }

    pub fn mean_processing(&self) -> Option<Duration> {
        let done = u32::try_from(self.completed()).ok()?;
        if done == 0 {
            return None;
        }
        Some(self.total_processing / done)
    }

    /// Acknowledged items per second of wall-clock span.
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.span.as_secs_f64();
        if self.completed() == 0 || secs == 0.0 {
            return None;
        }
        Some(self.completed() as f64 / secs)
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.pending() == 0
    }
}
