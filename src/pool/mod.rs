//! Worker pool: a fixed set of threads draining a shared queue.
//!
//! The producer submits items and waits for the completion tracker to
//! report that every one of them has been acknowledged. Workers run until
//! the queue is closed, then drain what is left and exit.

pub mod pending;
pub mod queue;
pub mod tracker;
mod worker;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use opentelemetry::KeyValue;
use tracing::{error, info, warn};

pub use pending::{AsCompleted, Pending, as_completed};
pub use queue::{TryPushError, WorkQueue};
pub use tracker::CompletionTracker;

use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::event::{Event, EventBus, EventKind};
use crate::model::{Completion, Report, Ticket, WorkId};
use crate::telemetry::metrics;
use worker::{Job, Worker};

/// The per-item operation a worker runs.
///
/// Any `Fn(&T) -> Result<O, E>` closure qualifies. An `Err` or a panic
/// marks the item failed; the worker keeps going either way. The output
/// reaches the submitter only for items sent with
/// [`WorkerPool::submit_with_result`] or [`WorkerPool::map`].
pub trait Processor<T>: Send + Sync + 'static {
    type Output: Send + 'static;
    type Error: std::fmt::Display;

    fn process(&self, item: &T) -> std::result::Result<Self::Output, Self::Error>;
}

impl<T, O, E, F> Processor<T> for F
where
    F: Fn(&T) -> std::result::Result<O, E> + Send + Sync + 'static,
    O: Send + 'static,
    E: std::fmt::Display,
{
    type Output = O;
    type Error = E;

    fn process(&self, item: &T) -> std::result::Result<O, E> {
        self(item)
    }
}

pub struct WorkerPool<T, P>
where
    P: Processor<T>,
{
    config: PoolConfig,
    queue: Arc<WorkQueue<Job<T, P::Output>>>,
    tracker: Arc<CompletionTracker>,
    processor: Arc<P>,
    events: Arc<EventBus>,
    workers: Vec<JoinHandle<()>>,
}

impl<T, P> WorkerPool<T, P>
where
    T: Send + 'static,
    P: Processor<T>,
{
    pub fn new(config: PoolConfig, processor: P) -> Result<Self> {
        config.validate()?;
        let queue = WorkQueue::with_capacity(config.queue_capacity)?;
        Ok(Self {
            config,
            queue: Arc::new(queue),
            tracker: Arc::new(CompletionTracker::new()),
            processor: Arc::new(processor),
            events: Arc::new(EventBus::new()),
            workers: Vec::new(),
        })
    }

    /// Spawn the worker threads. Returns as soon as they are launched.
    ///
    /// If a spawn fails the queue is closed: threads already launched drain
    /// it and exit, and the pool cannot be started again.
    pub fn start(&mut self) -> Result<()> {
        if !self.workers.is_empty() {
            return Err(Error::AlreadyStarted);
        }
        if self.queue.is_closed() {
            return Err(Error::QueueClosed);
        }

        for n in 1..=self.config.worker_count {
            let name = format!("{}-{n}", self.config.thread_name_prefix);
            let worker = Worker {
                name: name.clone(),
                queue: Arc::clone(&self.queue),
                tracker: Arc::clone(&self.tracker),
                processor: Arc::clone(&self.processor),
                events: Arc::clone(&self.events),
            };
            match thread::Builder::new().name(name).spawn(move || worker.run()) {
                Ok(handle) => self.workers.push(handle),
                Err(e) => {
                    error!(error = %e, spawned = self.workers.len(), "worker spawn failed");
                    self.close();
                    return Err(e.into());
                }
            }
        }

        info!(
            workers = self.config.worker_count,
            capacity = ?self.config.queue_capacity,
            "worker pool started"
        );
        Ok(())
    }

    /// Enqueue one item. Blocks only when a bounded queue is full.
    ///
    /// The processor's output, if any, is dropped.
    pub fn submit(&self, item: T) -> Result<WorkId> {
        self.enqueue(item, None)
    }

    /// Enqueue one item and get a handle that yields the processor's output.
    pub fn submit_with_result(&self, item: T) -> Result<Pending<P::Output>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let id = self.enqueue(item, Some(tx))?;
        Ok(Pending::new(id, rx))
    }

    /// Submit every item and return their completions in input order.
    ///
    /// The pool must be started. Honors `PoolConfig::wait_timeout` as a
    /// deadline for the whole batch.
    pub fn map<I>(&self, items: I) -> Result<Vec<Completion<P::Output>>>
    where
        I: IntoIterator<Item = T>,
    {
        let pending = items
            .into_iter()
            .map(|item| self.submit_with_result(item))
            .collect::<Result<Vec<_>>>()?;

        let deadline = self.config.wait_timeout.map(|t| Instant::now() + t);
        pending
            .into_iter()
            .map(|p| match deadline {
                Some(deadline) => p.wait_timeout(deadline.saturating_duration_since(Instant::now())),
                None => p.wait(),
            })
            .collect()
    }

    fn enqueue(&self, item: T, reply: Option<Sender<Completion<P::Output>>>) -> Result<WorkId> {
        let ticket = Ticket::new(item);
        let id = ticket.id;
        self.tracker.register(id)?;

        // WorkSubmitted is only emitted once the push is certain to succeed,
        // and before any worker can see the item.
        let events = &self.events;
        let pushed = self.queue.push_with(Job { ticket, reply }, || {
            events.emit(EventKind::WorkSubmitted { id });
        });
        if let Err(e) = pushed {
            self.tracker.withdraw(id)?;
            metrics::items_submitted().add(1, &[KeyValue::new("result", "closed")]);
            return Err(e);
        }

        metrics::items_submitted().add(1, &[KeyValue::new("result", "ok")]);
        Ok(id)
    }

    /// Block until every submitted item has been acknowledged.
    ///
    /// Honors `PoolConfig::wait_timeout` when set; otherwise waits forever.
    pub fn wait_for_completion(&self) -> Result<Report> {
        match self.config.wait_timeout {
            Some(timeout) => self.wait_for_completion_timeout(timeout),
            None => {
                let report = self.tracker.wait();
                log_report(&report);
                Ok(report)
            }
        }
    }

    pub fn wait_for_completion_timeout(&self, timeout: Duration) -> Result<Report> {
        match self.tracker.wait_timeout(timeout) {
            Ok(report) => {
                log_report(&report);
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "wait for completion gave up");
                Err(e)
            }
        }
    }

    /// Stop accepting new items. Workers drain what is queued and exit.
    pub fn close(&self) {
        if self.queue.close() {
            info!(queued = self.queue.len(), "queue closed");
            self.events.emit(EventKind::QueueClosed);
        }
    }

    /// Close the queue, join every worker and return the final report.
    pub fn shutdown(mut self) -> Result<Report> {
        self.close();
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().unwrap_or("unnamed").to_string();
            handle.join().map_err(|_| Error::WorkerPanicked(name))?;
        }
        let report = self.tracker.report();
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            pending = report.pending(),
            "worker pool shut down"
        );
        Ok(report)
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn report(&self) -> Report {
        self.tracker.report()
    }

    pub fn pending(&self) -> usize {
        self.tracker.pending()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Worker threads currently spawned (zero before `start`).
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl<T, P> Drop for WorkerPool<T, P>
where
    P: Processor<T>,
{
    /// Close the queue and detach the workers; they drain and exit on their own.
    fn drop(&mut self) {
        if self.queue.close() {
            self.events.emit(EventKind::QueueClosed);
        }
    }
}

fn log_report(report: &Report) {
    if report.failed == 0 {
        info!(
            completed = report.completed(),
            submitted = report.submitted,
            "all submitted items acknowledged"
        );
    } else {
        warn!(
            completed = report.completed(),
            failed = report.failed,
            "all submitted items acknowledged, some failed"
        );
    }
}
