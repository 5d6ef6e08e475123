//! Worker loop: dequeue, process, acknowledge.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use opentelemetry::KeyValue;
use tracing::{debug, error, info, warn};

use super::Processor;
use super::queue::WorkQueue;
use super::tracker::CompletionTracker;
use crate::event::{EventBus, EventKind};
use crate::model::{Completion, Outcome, Ticket};
use crate::telemetry::metrics;
use crate::telemetry::work::{record_outcome, record_state_transition, start_work_span};

/// A queued ticket plus, for result-bearing submissions, where to send
/// the output.
pub(crate) struct Job<T, O> {
    pub(crate) ticket: Ticket<T>,
    pub(crate) reply: Option<Sender<Completion<O>>>,
}

/// Everything one worker thread needs. Moved into the thread at spawn.
pub(crate) struct Worker<T, P>
where
    P: Processor<T>,
{
    pub(crate) name: String,
    pub(crate) queue: Arc<WorkQueue<Job<T, P::Output>>>,
    pub(crate) tracker: Arc<CompletionTracker>,
    pub(crate) processor: Arc<P>,
    pub(crate) events: Arc<EventBus>,
}

impl<T, P> Worker<T, P>
where
    P: Processor<T>,
{
    /// Run until the queue is closed and drained.
    pub(crate) fn run(self) {
        info!(worker = %self.name, "worker started");
        metrics::worker_lifecycle().add(1, &[KeyValue::new("event", "started")]);
        self.events.emit(EventKind::WorkerStarted {
            worker: self.name.clone(),
        });

        let mut handled = 0u64;
        while let Some(job) = self.queue.pop() {
            self.handle(job);
            handled += 1;
        }

        info!(worker = %self.name, handled, "queue closed, worker exiting");
        metrics::worker_lifecycle().add(1, &[KeyValue::new("event", "stopped")]);
        self.events.emit(EventKind::WorkerStopped {
            worker: self.name.clone(),
        });
    }

    fn handle(&self, job: Job<T, P::Output>) {
        let Job {
            ticket: Ticket { id, item },
            reply,
        } = job;
        let span = start_work_span(&self.name, id);
        let _entered = span.enter();

        if let Err(e) = self.tracker.claim(id) {
            error!(error = %e, "claim rejected, dropping item");
            return;
        }
        record_state_transition(&span, "queued", "claimed");
        self.events.emit(EventKind::WorkClaimed {
            id,
            worker: self.name.clone(),
        });

        let start = Instant::now();
        let result = match panic::catch_unwind(AssertUnwindSafe(|| self.processor.process(&item)))
        {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(format!("panicked: {}", panic_message(&*payload))),
        };
        let elapsed = start.elapsed();
        let outcome = match &result {
            Ok(_) => Outcome::Succeeded,
            Err(reason) => Outcome::Failed(reason.clone()),
        };
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

        record_outcome(&span, outcome.is_success());
        metrics::processing_duration_ms().record(elapsed.as_secs_f64() * 1000.0, &[]);
        match &outcome {
            Outcome::Succeeded => {
                debug!(duration_ms, "processed");
                metrics::items_completed().add(1, &[KeyValue::new("outcome", "succeeded")]);
                self.events.emit(EventKind::WorkCompleted {
                    id,
                    worker: self.name.clone(),
                    duration_ms,
                });
            }
            Outcome::Failed(reason) => {
                warn!(duration_ms, error = %reason, "processing failed");
                metrics::items_completed().add(1, &[KeyValue::new("outcome", "failed")]);
                self.events.emit(EventKind::WorkFailed {
                    id,
                    worker: self.name.clone(),
                    error: reason.clone(),
                });
            }
        }

        if let Some(reply) = reply {
            // the submitter may have stopped listening; that is not an error
            let _ = reply.send(Completion {
                id,
                worker: self.name.clone(),
                result,
                duration: elapsed,
            });
        }

        // Events and replies go out before the ack so a waiter never returns
        // ahead of them.
        if let Err(e) = self.tracker.acknowledge(id, &self.name, outcome, elapsed) {
            error!(error = %e, "acknowledge rejected");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
