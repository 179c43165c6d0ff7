pub mod app;
pub mod config;
pub mod error;

pub use app::{App, AppOptions, WeatherController};
pub use config::{Config, LocationConfig, ValidationResult, WeatherConfig};
pub use error::{AppError, ConfigError};

use anyhow::Result;

/// Initialize logging.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`. Output goes to
/// stderr so stdout stays free for the forecast.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("Quantum core initialized");
    Ok(())
}
