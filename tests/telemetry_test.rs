//! Integration tests for telemetry initialization and span helpers.

use workpool::model::WorkId;
use workpool::telemetry::{TelemetryConfig, init_telemetry, metrics, work};

#[test]
fn telemetry_initializes() {
    // Note: tracing subscriber can only be set once per process.
    // This may return Err if a global subscriber was already set by
    // another test in this process; that is acceptable.
    let _ = init_telemetry(TelemetryConfig::default());
}

#[test]
fn bad_log_level_is_rejected() {
    // only reached when RUST_LOG is unset
    if std::env::var("RUST_LOG").is_err() {
        let result = init_telemetry(TelemetryConfig {
            log_level: "workpool=loud".to_string(),
            compact: true,
        });
        assert!(result.is_err());
    }
}

#[test]
fn work_span_records_transition_and_outcome() {
    let span = work::start_work_span("worker-1", WorkId::new());
    work::record_state_transition(&span, "queued", "claimed");
    work::record_outcome(&span, true);
}

#[test]
fn metric_instruments_build_without_a_provider() {
    metrics::items_submitted().add(1, &[]);
    metrics::items_completed().add(1, &[]);
    metrics::processing_duration_ms().record(1.5, &[]);
    metrics::worker_lifecycle().add(1, &[]);
}
