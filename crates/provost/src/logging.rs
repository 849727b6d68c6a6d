//! Structured logging initialization.
//!
//! Provost logs through `tracing` with structured fields everywhere; this
//! module installs the global subscriber from a
//! [`LoggingConfig`](provost_config::LoggingConfig): JSON lines for
//! production, human-readable output for development.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use provost_config::{LogFormat, LoggingConfig};

use crate::error::{ProvostError, ProvostResult};

/// Initialize the logging subsystem.
///
/// The configured level acts as the default; `RUST_LOG` still takes
/// precedence when set. Calling this twice fails, as the global
/// subscriber can only be installed once.
pub fn init_logging(config: &LoggingConfig) -> ProvostResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ProvostError::logging(e.to_string()))?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_ansi(config.ansi_enabled)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| ProvostError::logging(e.to_string()))?;

    Ok(())
}
