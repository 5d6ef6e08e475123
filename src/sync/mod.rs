//! Lock and semaphore primitives used by the demonstrations.

pub mod counter;
pub mod limiter;

pub use counter::{Guard, SharedCounter};
pub use limiter::{Limiter, Permit};
