//! Counting semaphore with RAII permits.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Allows at most `capacity` holders at once.
pub struct Limiter {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl Limiter {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Config("limiter needs at least one permit".to_string()));
        }
        Ok(Self {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        })
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        Permit { limiter: self }
    }

    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut available = self.available.lock();
        if *available == 0 {
            return None;
        }
        *available -= 1;
        Some(Permit { limiter: self })
    }

    /// Block for at most `timeout` waiting for a permit.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<Permit<'_>> {
        let deadline = Instant::now() + timeout;
        let mut available = self.available.lock();
        while *available == 0 {
            if self.released.wait_until(&mut available, deadline).timed_out() && *available == 0 {
                return None;
            }
        }
        *available -= 1;
        Some(Permit { limiter: self })
    }

    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        self.released.notify_one();
    }
}

/// A held permit. Dropping it hands the slot back.
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
    limiter: &'a Limiter,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
