//! Subscriber setup for binaries.

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};
use crate::error::{MetricError, Result};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` overrides `config.level` when set. Fails if a global subscriber
/// is already installed or the level is not a valid filter directive.
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            MetricError::configuration(format!("invalid log level {:?}: {e}", config.level))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let installed = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| MetricError::configuration(format!("tracing already initialised: {e}")))?;

    tracing::debug!(level = %config.level, format = ?config.format, "tracing initialised");
    Ok(())
}
