//! Application-level error types.
//!
//! Feature errors from `quantum-weather` are wrapped here so the front-end
//! has a single type to render. Use `user_message()` for display.

use quantum_weather::{InvalidInterval, LocationError, WeatherError};
use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => e.user_message().to_string(),
            AppError::Weather(e) => e.user_message(),
            AppError::Other(e) => match e.downcast_ref::<ConfigError>() {
                Some(config) => config.user_message().to_string(),
                None => "An unexpected error occurred. Please try again.".to_string(),
            },
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not available")]
    NoConfigDir,

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Invalid location: {0}")]
    Location(#[from] LocationError),

    #[error("Invalid refresh interval: {0}")]
    Interval(#[from] InvalidInterval),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NoConfigDir => "No configuration directory found. Pass --config.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::Location(_) => "The configured location is invalid. Check [location].",
            ConfigError::Interval(_) => {
                "Refresh interval must be 15, 30, 60, 120 or 180 minutes."
            }
        }
    }
}
