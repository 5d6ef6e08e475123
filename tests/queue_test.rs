//! Integration tests for the blocking work queue.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use workpool::error::Error;
use workpool::pool::{TryPushError, WorkQueue};

#[test]
fn pops_in_push_order() {
    let queue = WorkQueue::unbounded();
    for n in 1..=5 {
        queue.push(n).unwrap();
    }
    assert_eq!(queue.len(), 5);
    let popped: Vec<_> = (0..5).filter_map(|_| queue.try_pop()).collect();
    assert_eq!(popped, vec![1, 2, 3, 4, 5]);
    assert!(queue.is_empty());
}

#[test]
fn close_rejects_pushes_but_drains_pending() {
    let queue = WorkQueue::unbounded();
    queue.push("a").unwrap();
    queue.push("b").unwrap();

    assert!(queue.close());
    assert!(!queue.close());
    assert!(queue.is_closed());
    assert!(matches!(queue.push("c"), Err(Error::QueueClosed)));

    assert_eq!(queue.pop(), Some("a"));
    assert_eq!(queue.pop(), Some("b"));
    assert_eq!(queue.pop(), None);
}

#[test]
fn close_wakes_blocked_consumers() {
    let queue = Arc::new(WorkQueue::<u32>::unbounded());
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    queue.close();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), None);
    }
}

#[test]
fn bounded_queue_reports_full() {
    let queue = WorkQueue::bounded(2).unwrap();
    assert_eq!(queue.capacity(), Some(2));
    queue.try_push(1).unwrap();
    queue.try_push(2).unwrap();
    assert_eq!(queue.try_push(3), Err(TryPushError::Full(3)));

    assert_eq!(queue.pop(), Some(1));
    queue.try_push(3).unwrap();

    queue.close();
    assert_eq!(queue.try_push(4).unwrap_err().into_inner(), 4);
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(WorkQueue::<u8>::bounded(0), Err(Error::Config(_))));
}

#[test]
fn many_consumers_each_value_delivered_once() {
    let queue = Arc::new(WorkQueue::unbounded());
    let consumers: Vec<_> = (0..8)
        .map(|_| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(n) = queue.pop() {
                    got.push(n);
                }
                got
            })
        })
        .collect();

    for n in 0..1000u32 {
        queue.push(n).unwrap();
    }
    queue.close();

    let mut all = Vec::new();
    for consumer in consumers {
        all.extend(consumer.join().unwrap());
    }
    assert_eq!(all.len(), 1000);
    let distinct: HashSet<_> = all.into_iter().collect();
    assert_eq!(distinct.len(), 1000);
}

#[test]
fn push_with_hook_runs_only_for_accepted_values() {
    let queue = WorkQueue::unbounded();
    let mut accepted = Vec::new();

    queue.push_with(1, || accepted.push(1)).unwrap();
    queue.close();
    assert!(matches!(
        queue.push_with(2, || accepted.push(2)),
        Err(Error::QueueClosed)
    ));

    assert_eq!(accepted, vec![1]);
    assert_eq!(queue.pop(), Some(1));
    assert_eq!(queue.pop(), None);
}
