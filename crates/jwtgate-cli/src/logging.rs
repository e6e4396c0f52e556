//! Logging initialization
//!
//! Logs always go to stderr; stdout carries the validation result only.
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::{CliError, CliResult};
use crate::settings::LoggingSettings;

/// Install the global subscriber
///
/// # Errors
///
/// Returns [`CliError::Logging`] if a subscriber is already installed.
pub fn init(settings: &LoggingSettings) -> CliResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if settings.json {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| CliError::Logging(e.to_string()))
    } else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| CliError::Logging(e.to_string()))
    }
}
