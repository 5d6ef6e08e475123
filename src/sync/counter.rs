//! A shared integer that must be threaded through a guard to be mutated.
//!
//! `Guard::Locked` serializes the whole read-modify-write. `Guard::Unguarded`
//! splits it into an atomic load and an atomic store, so two threads that
//! both read the same value each write back value+1 and one increment is
//! lost. No undefined behavior is involved; only the update is racy.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    #[default]
    Locked,
    Unguarded,
}

enum Cell {
    Locked(Mutex<i64>),
    Unguarded(AtomicI64),
}

pub struct SharedCounter {
    cell: Cell,
}

impl SharedCounter {
    pub fn new(guard: Guard) -> Self {
        let cell = match guard {
            Guard::Locked => Cell::Locked(Mutex::new(0)),
            Guard::Unguarded => Cell::Unguarded(AtomicI64::new(0)),
        };
        Self { cell }
    }

    pub fn guard(&self) -> Guard {
        match self.cell {
            Cell::Locked(_) => Guard::Locked,
            Cell::Unguarded(_) => Guard::Unguarded,
        }
    }

    /// Copy the value, sleep for `hold`, then write back copy+1.
    pub fn increment(&self, hold: Duration) -> i64 {
        match &self.cell {
            Cell::Locked(value) => {
                let mut value = value.lock();
                let local = *value + 1;
                thread::sleep(hold);
                *value = local;
                local
            }
            Cell::Unguarded(value) => {
                let local = value.load(Ordering::SeqCst) + 1;
                thread::sleep(hold);
                value.store(local, Ordering::SeqCst);
                local
            }
        }
    }

    pub fn get(&self) -> i64 {
        match &self.cell {
            Cell::Locked(value) => *value.lock(),
            Cell::Unguarded(value) => value.load(Ordering::SeqCst),
        }
    }
}

/// Start `workers` threads together, each incrementing once, and return the
/// final value after joining them all.
///
/// With `Guard::Locked` the result always equals `workers`. With
/// `Guard::Unguarded` and a non-trivial `hold` it is usually smaller.
pub fn race(workers: usize, guard: Guard, hold: Duration) -> Result<i64> {
    let counter = Arc::new(SharedCounter::new(guard));
    let start = Arc::new(Barrier::new(workers));

    let mut handles = Vec::with_capacity(workers);
    for n in 1..=workers {
        let counter = Arc::clone(&counter);
        let start = Arc::clone(&start);
        let handle = thread::Builder::new()
            .name(format!("counter-{n}"))
            .spawn(move || {
                start.wait();
                let wrote = counter.increment(hold);
                debug!(wrote, "increment done");
            })?;
        handles.push(handle);
    }

    for handle in handles {
        let name = handle.thread().name().unwrap_or("unnamed").to_string();
        handle.join().map_err(|_| Error::WorkerPanicked(name))?;
    }

    Ok(counter.get())
}
