//! Integration tests for the completion tracker.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workpool::error::Error;
use workpool::model::{Outcome, State, WorkId};
use workpool::pool::CompletionTracker;

const TICK: Duration = Duration::from_millis(1);

#[test]
fn register_claim_acknowledge_lifecycle() {
    let tracker = CompletionTracker::new();
    let id = WorkId::new();

    tracker.register(id).unwrap();
    assert_eq!(tracker.state(id), Some(State::Queued));
    assert_eq!(tracker.pending(), 1);

    tracker.claim(id).unwrap();
    assert_eq!(tracker.state(id), Some(State::Claimed));

    tracker
        .acknowledge(id, "worker-1", Outcome::Succeeded, TICK)
        .unwrap();
    assert_eq!(tracker.state(id), None);
    assert_eq!(tracker.pending(), 0);

    let report = tracker.report();
    assert_eq!(report.submitted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.total_processing, TICK);
    assert_eq!(report.mean_processing(), Some(TICK));
}

// ---------------------------------------------------------------------------
// Misuse
// ---------------------------------------------------------------------------

#[test]
fn acknowledge_before_claim_is_rejected() {
    let tracker = CompletionTracker::new();
    let id = WorkId::new();
    tracker.register(id).unwrap();

    let err = tracker
        .acknowledge(id, "worker-1", Outcome::Succeeded, TICK)
        .unwrap_err();
    assert!(matches!(err, Error::NotClaimed(e) if e == id));
    assert_eq!(tracker.pending(), 1);
    assert_eq!(tracker.report().succeeded, 0);
}

#[test]
fn double_acknowledge_is_rejected() {
    let tracker = CompletionTracker::new();
    let id = WorkId::new();
    tracker.register(id).unwrap();
    tracker.claim(id).unwrap();
    tracker
        .acknowledge(id, "worker-1", Outcome::Succeeded, TICK)
        .unwrap();

    let err = tracker
        .acknowledge(id, "worker-1", Outcome::Succeeded, TICK)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownWork(_)));
    assert_eq!(tracker.report().succeeded, 1);
}

#[test]
fn acknowledge_unknown_item_is_rejected() {
    let tracker = CompletionTracker::new();
    let err = tracker
        .acknowledge(WorkId::new(), "worker-1", Outcome::Succeeded, TICK)
        .unwrap_err();
    assert!(matches!(err, Error::UnknownWork(_)));
}

#[test]
fn claim_twice_and_register_twice_are_rejected() {
    let tracker = CompletionTracker::new();
    let id = WorkId::new();
    tracker.register(id).unwrap();
    assert!(matches!(tracker.register(id), Err(Error::DuplicateWork(_))));
    assert_eq!(tracker.report().submitted, 1);

    tracker.claim(id).unwrap();
    assert!(matches!(tracker.claim(id), Err(Error::AlreadyClaimed(_))));
}

#[test]
fn withdraw_only_applies_to_queued_items() {
    let tracker = CompletionTracker::new();
    let queued = WorkId::new();
    let claimed = WorkId::new();
    tracker.register(queued).unwrap();
    tracker.register(claimed).unwrap();
    tracker.claim(claimed).unwrap();

    tracker.withdraw(queued).unwrap();
    assert!(matches!(
        tracker.withdraw(claimed),
        Err(Error::AlreadyClaimed(_))
    ));
    assert_eq!(tracker.report().submitted, 1);
    assert_eq!(tracker.pending(), 1);
}

// ---------------------------------------------------------------------------
// Waiting
// ---------------------------------------------------------------------------

#[test]
fn wait_blocks_until_last_acknowledgment() {
    let tracker = Arc::new(CompletionTracker::new());
    let ids: Vec<_> = (0..5).map(|_| WorkId::new()).collect();
    for id in &ids {
        tracker.register(*id).unwrap();
    }

    let acker = Arc::clone(&tracker);
    let worker_ids = ids.clone();
    let handle = thread::spawn(move || {
        for (n, id) in worker_ids.into_iter().enumerate() {
            thread::sleep(Duration::from_millis(5));
            acker.claim(id).unwrap();
            let outcome = if n == 4 {
                Outcome::Failed("late failure".to_string())
            } else {
                Outcome::Succeeded
            };
            acker.acknowledge(id, "worker-1", outcome, TICK).unwrap();
        }
    });

    let report = tracker.wait();
    handle.join().unwrap();

    assert_eq!(report.completed(), 5);
    assert_eq!(report.succeeded, 4);
    assert_eq!(report.failures[0].id, ids[4]);
    assert_eq!(report.failures[0].error, "late failure");
    assert!(!report.is_clean());
}

#[test]
fn wait_timeout_reports_outstanding_count() {
    let tracker = CompletionTracker::new();
    tracker.register(WorkId::new()).unwrap();
    tracker.register(WorkId::new()).unwrap();

    let err = tracker.wait_timeout(Duration::from_millis(30)).unwrap_err();
    assert!(matches!(err, Error::Timeout { pending: 2, .. }));
}

#[test]
fn wait_timeout_succeeds_when_nothing_outstanding() {
    let tracker = CompletionTracker::new();
    let report = tracker.wait_timeout(Duration::from_millis(1)).unwrap();
    assert_eq!(report.pending(), 0);
}

#[test]
fn failure_details_are_capped_but_all_counted() {
    let tracker = CompletionTracker::with_failure_cap(2);
    for n in 0..5 {
        let id = WorkId::new();
        tracker.register(id).unwrap();
        tracker.claim(id).unwrap();
        tracker
            .acknowledge(id, "worker-1", Outcome::Failed(format!("bad {n}")), TICK)
            .unwrap();
    }

    let report = tracker.report();
    assert_eq!(report.failed, 5);
    assert_eq!(report.completed(), 5);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[1].error, "bad 1");
}

#[test]
fn report_span_covers_first_registration_to_last_ack() {
    let tracker = CompletionTracker::new();
    let id = WorkId::new();
    tracker.register(id).unwrap();
    thread::sleep(Duration::from_millis(20));
    tracker.claim(id).unwrap();
    tracker
        .acknowledge(id, "worker-1", Outcome::Succeeded, TICK)
        .unwrap();

    let report = tracker.report();
    assert!(report.span >= Duration::from_millis(20));
    let rate = report.throughput().unwrap();
    assert!(rate > 0.0 && rate <= 50.0);
}
