//! Completion tracking: pairs items submitted against items acknowledged.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};
use crate::model::{Failure, MAX_RETAINED_FAILURES, Outcome, Report, State, WorkId};

#[derive(Default)]
struct Inner {
    outstanding: HashMap<WorkId, State>,
    report: Report,
    first_registered: Option<Instant>,
}

/// One-shot-per-batch barrier over outstanding work items.
///
/// All mutation goes through `register` → `claim` → `acknowledge`; waiters
/// are woken when the outstanding set becomes empty.
pub struct CompletionTracker {
    inner: Mutex<Inner>,
    drained: Condvar,
    failure_cap: usize,
}

impl Default for CompletionTracker {
    fn default() -> Self {
        Self::with_failure_cap(MAX_RETAINED_FAILURES)
    }
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `cap` failures in detail. Every failure is still counted.
    pub fn with_failure_cap(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            drained: Condvar::new(),
            failure_cap: cap,
        }
    }

    /// Record a newly submitted item as queued.
    pub fn register(&self, id: WorkId) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.outstanding.contains_key(&id) {
            return Err(Error::DuplicateWork(id));
        }
        inner.outstanding.insert(id, State::Queued);
        inner.report.submitted += 1;
        inner.first_registered.get_or_insert_with(Instant::now);
        Ok(())
    }

    /// Undo a registration whose enqueue failed. Only queued items can be
    /// withdrawn.
    pub fn withdraw(&self, id: WorkId) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.outstanding.get(&id) {
            None => return Err(Error::UnknownWork(id)),
            Some(State::Claimed) => return Err(Error::AlreadyClaimed(id)),
            Some(State::Queued) => {}
        }
        inner.outstanding.remove(&id);
        inner.report.submitted -= 1;
        if inner.outstanding.is_empty() {
            self.drained.notify_all();
        }
        Ok(())
    }

    /// Mark an item as dequeued by a worker.
    pub fn claim(&self, id: WorkId) -> Result<()> {
        let mut inner = self.inner.lock();
        let state = inner
            .outstanding
            .get_mut(&id)
            .ok_or(Error::UnknownWork(id))?;
        if !state.can_transition_to(State::Claimed) {
            return Err(Error::AlreadyClaimed(id));
        }
        *state = State::Claimed;
        Ok(())
    }

    /// Mark a claimed item as finished.
    ///
    /// Acknowledging an unknown, unclaimed or already acknowledged item is a
    /// misuse error and leaves the counts untouched.
    pub fn acknowledge(
        &self,
        id: WorkId,
        worker: &str,
        outcome: Outcome,
        elapsed: Duration,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.outstanding.get(&id) {
            None => return Err(Error::UnknownWork(id)),
            Some(State::Queued) => return Err(Error::NotClaimed(id)),
            Some(State::Claimed) => {}
        }
        inner.outstanding.remove(&id);
        inner.report.total_processing += elapsed;
        if let Some(first) = inner.first_registered {
            inner.report.span = first.elapsed();
        }
        match outcome {
            Outcome::Succeeded => inner.report.succeeded += 1,
            Outcome::Failed(error) => {
                inner.report.failed += 1;
                if inner.report.failures.len() < self.failure_cap {
                    inner.report.failures.push(Failure {
                        id,
                        worker: worker.to_string(),
                        error,
                    });
                }
            }
        }
        if inner.outstanding.is_empty() {
            self.drained.notify_all();
        }
        Ok(())
    }

    /// Number of items registered but not yet acknowledged.
    pub fn pending(&self) -> usize {
        self.inner.lock().outstanding.len()
    }

    pub fn state(&self, id: WorkId) -> Option<State> {
        self.inner.lock().outstanding.get(&id).copied()
    }

    /// Clone of the cumulative report. The failure list is capped, so the
    /// clone stays bounded however long the pool lives.
    pub fn report(&self) -> Report {
        self.inner.lock().report.clone()
    }

    /// Block until every registered item has been acknowledged.
    pub fn wait(&self) -> Report {
        let mut inner = self.inner.lock();
        while !inner.outstanding.is_empty() {
            self.drained.wait(&mut inner);
        }
        inner.report.clone()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<Report> {
        let start = Instant::now();
        let deadline = start + timeout;
        let mut inner = self.inner.lock();
        while !inner.outstanding.is_empty() {
            if self.drained.wait_until(&mut inner, deadline).timed_out() {
                if inner.outstanding.is_empty() {
                    break;
                }
                return Err(Error::Timeout {
                    elapsed: start.elapsed(),
                    pending: inner.outstanding.len(),
                });
            }
        }
        Ok(inner.report.clone())
    }
}
