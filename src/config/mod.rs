//! Typed pool configuration.
//!
//! Defaults reproduce the reference demonstration: ten workers, an
//! unbounded queue and no wait timeout. Values can be overridden from
//! environment variables or a TOML file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

pub const DEFAULT_WORKER_COUNT: usize = 10;
pub const DEFAULT_THREAD_PREFIX: &str = "worker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads spawned by `start()`.
    pub worker_count: usize,
    /// `None` means unbounded.
    pub queue_capacity: Option<usize>,
    /// Applied by `wait_for_completion()`. `None` blocks forever.
    pub wait_timeout: Option<Duration>,
    pub thread_name_prefix: String,
    pub log_level: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: None,
            wait_timeout: None,
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// On-disk shape. Every field is optional and falls back to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    pool: Option<PoolSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PoolSection {
    workers: Option<usize>,
    queue_capacity: Option<usize>,
    wait_timeout_ms: Option<u64>,
    thread_name_prefix: Option<String>,
    log_level: Option<String>,
}

impl PoolConfig {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }

    /// Load a TOML file with a `[pool]` table.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad config {}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.message().to_string()))?;
        let section = file.pool.unwrap_or_default();
        let mut config = Self::default();
        if let Some(workers) = section.workers {
            config.worker_count = workers;
        }
        if section.queue_capacity.is_some() {
            config.queue_capacity = section.queue_capacity;
        }
        if let Some(ms) = section.wait_timeout_ms {
            config.wait_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(prefix) = section.thread_name_prefix {
            config.thread_name_prefix = prefix;
        }
        if let Some(level) = section.log_level {
            config.log_level = level;
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply any `WORKPOOL_*` / `LOG_LEVEL` variables present in the environment.
    pub fn merge_env(mut self) -> Result<Self> {
        if let Some(workers) = parsed_var::<usize>("WORKPOOL_WORKERS")? {
            self.worker_count = workers;
        }
        if let Some(capacity) = parsed_var::<usize>("WORKPOOL_QUEUE_CAPACITY")? {
            self.queue_capacity = Some(capacity);
        }
        if let Some(ms) = parsed_var::<u64>("WORKPOOL_WAIT_TIMEOUT_MS")? {
            self.wait_timeout = Some(Duration::from_millis(ms));
        }
        if let Ok(prefix) = std::env::var("WORKPOOL_THREAD_PREFIX") {
            self.thread_name_prefix = prefix;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.log_level = level;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::Config("worker_count must be at least 1".to_string()));
        }
        if self.queue_capacity == Some(0) {
            return Err(Error::Config(
                "queue_capacity must be at least 1 (omit it for unbounded)".to_string(),
            ));
        }
        if self.thread_name_prefix.is_empty() {
            return Err(Error::Config("thread_name_prefix must not be empty".to_string()));
        }
        // thread names become C strings
        if self.thread_name_prefix.contains('\0') {
            return Err(Error::Config(
                "thread_name_prefix must not contain NUL bytes".to_string(),
            ));
        }
        Ok(())
    }
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name}={raw:?} is invalid: {e}"))),
        Err(_) => Ok(None),
    }
}
