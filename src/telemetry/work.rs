//! Work execution span helpers.
//!
//! Provides span creation and state-transition recording for items
//! flowing through a worker.

use tracing::Span;

use crate::model::WorkId;

/// Start a span for one item's execution on a worker.
///
/// The `work.outcome` field is declared empty and filled in by
/// [`record_outcome`].
pub fn start_work_span(worker: &str, work_id: WorkId) -> Span {
    tracing::info_span!(
        "work.execute",
        "work.worker" = worker,
        "work.id" = %work_id,
        "work.outcome" = tracing::field::Empty,
    )
}

/// Record a state transition event on the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::debug!(from = from, to = to, "state_transition");
    });
}

/// Record the final outcome on the span.
pub fn record_outcome(span: &Span, success: bool) {
    span.record("work.outcome", if success { "succeeded" } else { "failed" });
}
