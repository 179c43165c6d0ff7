//! Weather-specific error types.

use thiserror::Error;

/// Errors produced while fetching a forecast.
///
/// Variants carry rendered messages rather than source errors so the value
/// can be cloned into the controller state and handed to every observer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeatherError {
    /// No response was obtained (timeout, DNS, connection reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Upstream error: HTTP {status}")]
    Upstream { status: u16, body: String },

    /// The body did not match the expected forecast shape.
    #[error("Schema error: {0}")]
    Schema(String),
}

impl WeatherError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Network error. Check your connection.".to_string(),
            Self::Upstream { status, .. } => {
                format!("Weather service returned HTTP {}. Try again later.", status)
            }
            Self::Schema(_) => "Weather service sent an unexpected response.".to_string(),
        }
    }

    /// HTTP status for upstream failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::Upstream {
                status: status.as_u16(),
                body: String::new(),
            },
            None => Self::Transport(e.to_string()),
        }
    }
}

/// Local key-value store failures. Always recovered as a cache miss.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cached record is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

/// Invalid location parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("Latitude out of range: {0}")]
    InvalidLatitude(f64),
    #[error("Longitude out of range: {0}")]
    InvalidLongitude(f64),
    #[error("Timezone must not be empty")]
    MissingTimezone,
}
