//! Tracing setup

use crate::config::LoggingConfig;
use crate::error::StudioError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the configured level. Output goes to stderr so
/// command output on stdout stays machine-readable.
///
/// # Errors
/// - `StudioError::Telemetry` if the filter is invalid or a subscriber is
///   already installed
pub fn init_tracing(config: &LoggingConfig) -> Result<(), StudioError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| StudioError::Telemetry(e.to_string()))?,
    };

    if config.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| StudioError::Telemetry(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| StudioError::Telemetry(e.to_string()))?;
    }

    tracing::debug!(
        log_level = %config.level,
        json = config.json,
        "Tracing initialized"
    );
    Ok(())
}
