//! Tracing subscriber setup

use tracing_subscriber::{fmt, EnvFilter};

use tw_shared::config::{LogFormat, LoggingConfig};

use crate::InfrastructureError;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `LoggingConfig::level` when set. Security events
/// such as refresh token reuse are logged under their own targets (for
/// example `auth.token.reuse_detected`) and can be filtered separately.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| InfrastructureError::Config(format!("Invalid log level: {}", e)))?,
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_ansi(config.colored)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| InfrastructureError::General(format!("Failed to install tracing subscriber: {}", e)))
}
