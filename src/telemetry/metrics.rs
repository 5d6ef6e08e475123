//! Metric instrument factories for workpool.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"workpool"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for workpool instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("workpool")
}

/// Counter: items submitted to a pool.
/// Labels: `result` ("ok" | "closed").
pub fn items_submitted() -> Counter<u64> {
    meter()
        .u64_counter("workpool.items.submitted")
        .with_description("Number of work items submitted")
        .build()
}

/// Counter: items acknowledged by a worker.
/// Labels: `outcome` ("succeeded" | "failed").
pub fn items_completed() -> Counter<u64> {
    meter()
        .u64_counter("workpool.items.completed")
        .with_description("Number of work items acknowledged")
        .build()
}

/// Histogram: processing duration in milliseconds.
pub fn processing_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("workpool.processing.duration_ms")
        .with_description("Per-item processing duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: worker thread lifecycle.
/// Labels: `event` ("started" | "stopped").
pub fn worker_lifecycle() -> Counter<u64> {
    meter()
        .u64_counter("workpool.workers.lifecycle")
        .with_description("Worker threads started and stopped")
        .build()
}
