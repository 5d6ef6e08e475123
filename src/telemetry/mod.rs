//! Logging initialization and metric/span helpers.
//!
//! Sets up tracing-subscriber with a fmt layer and an env filter. Metric
//! instruments go through the OTel global meter; nothing is exported
//! unless the embedding application registers a meter provider.

pub mod metrics;
pub mod work;

use crate::error::{Error, Result};

/// Configuration for telemetry initialization.
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is not set (e.g. "info").
    pub log_level: String,
    /// Single-line compact output instead of the full fmt format.
    pub compact: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            compact: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a global
/// subscriber was already set.
pub fn init_telemetry(config: TelemetryConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level)
            .map_err(|e| Error::Config(format!("bad log level {:?}: {e}", config.log_level)))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.compact {
        registry
            .with(tracing_subscriber::fmt::layer().compact().with_thread_names(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_thread_names(true))
            .try_init()
    };
    result.map_err(|e| Error::Other(format!("failed to init tracing subscriber: {e}")))
}
