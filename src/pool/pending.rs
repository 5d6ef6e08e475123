//! Result handles for items submitted with `submit_with_result`.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Select};

use crate::error::{Error, Result};
use crate::model::{Completion, WorkId};

/// The future-like side of a result-bearing submission.
pub struct Pending<O> {
    id: WorkId,
    rx: Receiver<Completion<O>>,
}

impl<O> Pending<O> {
    pub(crate) fn new(id: WorkId, rx: Receiver<Completion<O>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> WorkId {
        self.id
    }

    /// Block until the worker reports back.
    ///
    /// Fails with `Abandoned` if the item was dropped unprocessed, e.g. the
    /// pool was dropped before it ever started.
    pub fn wait(self) -> Result<Completion<O>> {
        self.rx.recv().map_err(|_| Error::Abandoned(self.id))
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<Completion<O>> {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => Ok(completion),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                elapsed: timeout,
                pending: 1,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Abandoned(self.id)),
        }
    }

    /// Non-blocking check. `None` while the item is still in flight.
    pub fn try_get(&self) -> Option<Completion<O>> {
        self.rx.try_recv().ok()
    }
}

/// Yield completions in the order workers finish them, not submission order.
pub fn as_completed<O>(pending: impl IntoIterator<Item = Pending<O>>) -> AsCompleted<O> {
    AsCompleted {
        remaining: pending.into_iter().collect(),
    }
}

pub struct AsCompleted<O> {
    remaining: Vec<Pending<O>>,
}

impl<O> AsCompleted<O> {
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl<O> Iterator for AsCompleted<O> {
    type Item = Result<Completion<O>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let (index, received) = {
            let mut select = Select::new();
            for pending in &self.remaining {
                select.recv(&pending.rx);
            }
            let oper = select.select();
            let index = oper.index();
            (index, oper.recv(&self.remaining[index].rx))
        };

        let pending = self.remaining.swap_remove(index);
        Some(received.map_err(|_| Error::Abandoned(pending.id)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining.len(), Some(self.remaining.len()))
    }
}
