//! # workpool
//!
//! Producer/consumer worker pool over a shared blocking queue, with a
//! completion tracker the producer waits on.
//!
//! Also carries the lock and semaphore primitives behind the `counter` and
//! `limit` demonstrations of the `workpool` binary.

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod pool;
pub mod sync;
pub mod telemetry;
