//! Error types for workpool.

use std::time::Duration;

use thiserror::Error;

use crate::model::WorkId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("work item {0} is not outstanding (never submitted or already acknowledged)")]
    UnknownWork(WorkId),

    #[error("work item {0} acknowledged before it was claimed")]
    NotClaimed(WorkId),

    #[error("work item {0} was already claimed")]
    AlreadyClaimed(WorkId),

    #[error("work item {0} is already registered")]
    DuplicateWork(WorkId),

    #[error("work item {0} was dropped before a worker reported its result")]
    Abandoned(WorkId),

    #[error("queue is closed")]
    QueueClosed,

    #[error("timed out after {elapsed:?} with {pending} item(s) outstanding")]
    Timeout { elapsed: Duration, pending: usize },

    #[error("worker pool already started")]
    AlreadyStarted,

    #[error("worker {0} panicked")]
    WorkerPanicked(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
