//! Blocking FIFO shared between the producer and the workers.

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;

use crate::error::{Error, Result};

/// Multi-producer, multi-consumer blocking queue with a close signal.
///
/// Every pushed value is popped by exactly one consumer. Closing drops the
/// sending side: pending values stay poppable, and once drained `pop`
/// returns `None` to every consumer.
pub struct WorkQueue<T> {
    tx: RwLock<Option<Sender<T>>>,
    rx: Receiver<T>,
    capacity: Option<usize>,
}

impl<T> WorkQueue<T> {
    pub fn unbounded() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx: RwLock::new(Some(tx)),
            rx,
            capacity: None,
        }
    }

    /// `capacity` must be non-zero; a zero-capacity channel would turn every
    /// push into a rendezvous.
    pub fn bounded(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("queue capacity must be at least 1".to_string()));
        }
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Ok(Self {
            tx: RwLock::new(Some(tx)),
            rx,
            capacity: Some(capacity),
        })
    }

    pub fn with_capacity(capacity: Option<usize>) -> Result<Self> {
        match capacity {
            Some(n) => Self::bounded(n),
            None => Ok(Self::unbounded()),
        }
    }

    /// Enqueue a value. Blocks only while a bounded queue is full.
    ///
    /// The read guard is held across the send so `close` cannot complete
    /// while a push is in flight.
    pub fn push(&self, value: T) -> Result<()> {
        self.push_with(value, || {})
    }

    /// Enqueue a value, running `accepted` once the queue is known to be
    /// open and before the value becomes visible to consumers.
    ///
    /// `accepted` never runs for a push that fails with `QueueClosed`.
    pub fn push_with(&self, value: T, accepted: impl FnOnce()) -> Result<()> {
        let guard = self.tx.read();
        let tx = guard.as_ref().ok_or(Error::QueueClosed)?;
        accepted();
        // the receiver lives as long as self, so this only fails if closed
        tx.send(value).map_err(|_| Error::QueueClosed)
    }

    /// Non-blocking enqueue. Hands the value back if the queue is full.
    pub fn try_push(&self, value: T) -> std::result::Result<(), TryPushError<T>> {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return Err(TryPushError::Closed(value));
        };
        tx.try_send(value).map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(v) => TryPushError::Full(v),
            crossbeam_channel::TrySendError::Disconnected(v) => TryPushError::Closed(v),
        })
    }

    /// Dequeue the next value, blocking while empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn pop(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting pushes. Returns `false` if already closed.
    pub fn close(&self) -> bool {
        self.tx.write().take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.read().is_none()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

/// Failure of [`WorkQueue::try_push`], carrying the rejected value.
#[derive(Debug, PartialEq, Eq)]
pub enum TryPushError<T> {
    Full(T),
    Closed(T),
}

impl<T> TryPushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TryPushError::Full(v) | TryPushError::Closed(v) => v,
        }
    }
}
