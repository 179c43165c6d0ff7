use anyhow::{Context, Result};
use quantum_weather::{Location, RefreshInterval};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the forecast cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Forecast location
    #[serde(default)]
    pub location: LocationConfig,

    /// Weather settings
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Display name
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone identifier, e.g. "Asia/Ulaanbaatar"
    pub timezone: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        // Tsengel district, Bayan-Ölgii
        Self {
            name: "Tsengel, Bayan-Ölgii".to_string(),
            latitude: 48.9523,
            longitude: 89.1462,
            timezone: "Asia/Ulaanbaatar".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Forecast endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Refresh interval in minutes (15, 30, 60, 120 or 180)
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    quantum_weather::request::OPEN_METEO_URL.to_string()
}

fn default_refresh_minutes() -> u32 {
    RefreshInterval::default().minutes()
}

fn default_request_timeout_secs() -> u64 {
    quantum_weather::provider::DEFAULT_TIMEOUT_SECS
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quantum")
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            refresh_minutes: default_refresh_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl WeatherConfig {
    /// Configured refresh interval.
    ///
    /// # Errors
    /// Returns `ConfigError::Interval` if the minutes are not an offered choice.
    pub fn refresh_interval(&self) -> Result<RefreshInterval, ConfigError> {
        Ok(RefreshInterval::try_from(self.refresh_minutes)?)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

impl LocationConfig {
    /// Validated forecast location.
    ///
    /// # Errors
    /// Returns `ConfigError::Location` for out-of-range coordinates or a
    /// blank timezone.
    pub fn to_location(&self) -> Result<Location, ConfigError> {
        let location = Location::new(self.latitude, self.longitude, self.timezone.as_str())?;
        Ok(location.with_name(self.name.as_str()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            location: LocationConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating it if missing
    ///
    /// # Errors
    /// Fails if the config directory is unknown or the file cannot be
    /// read, parsed or created.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there if it doesn't exist
    ///
    /// # Errors
    /// Fails if the file cannot be read, parsed or created.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Creating default config at {}", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Logs warnings; fails on errors.
    ///
    /// # Errors
    /// Fails if loading fails or validation reports errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.api_url, "weather.api_url", &mut result);

        if !self.location.latitude.is_finite() || !(-90.0..=90.0).contains(&self.location.latitude)
        {
            result.add_error("location.latitude", "Latitude must be between -90 and 90");
        }
        if !self.location.longitude.is_finite()
            || !(-180.0..=180.0).contains(&self.location.longitude)
        {
            result.add_error("location.longitude", "Longitude must be between -180 and 180");
        }
        if self.location.timezone.trim().is_empty() {
            result.add_error("location.timezone", "Timezone must not be empty");
        }
        if self.location.name.trim().is_empty() {
            result.add_warning("location.name", "No location name, coordinates will be shown");
        }

        if self.weather.refresh_interval().is_err() {
            result.add_error(
                "weather.refresh_minutes",
                format!(
                    "Refresh interval must be one of 15, 30, 60, 120, 180 (got {})",
                    self.weather.refresh_minutes
                ),
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.weather.request_timeout_secs > 120 {
            result.add_warning(
                "weather.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default path
    ///
    /// # Errors
    /// Fails if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`
    ///
    /// # Errors
    /// Fails if the directory cannot be created or the file written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("quantum");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_invalid_url() {
        let mut config = Config::default();
        config.weather.api_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.api_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.weather.api_url = "ftp://api.open-meteo.com/v1/forecast".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_refresh_minutes_outside_choices() {
        let mut config = Config::default();
        config.weather.refresh_minutes = 45;
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.refresh_minutes"));
        assert!(config.weather.refresh_interval().is_err());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let mut config = Config::default();
        config.location.latitude = 95.0;
        config.location.longitude = -200.0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "location.latitude"));
        assert!(result.errors.iter().any(|e| e.field == "location.longitude"));
        assert!(config.location.to_location().is_err());
    }

    #[test]
    fn test_blank_timezone_is_error() {
        let mut config = Config::default();
        config.location.timezone = " ".to_string();
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_zero_timeout_is_error_long_timeout_warns() {
        let mut config = Config::default();
        config.weather.request_timeout_secs = 0;
        assert!(!config.validate().is_valid());

        config.weather.request_timeout_secs = 600;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field == "weather.request_timeout_secs"));
    }

    #[test]
    fn test_default_location() {
        let location = Config::default().location.to_location().unwrap();
        assert_eq!(location.latitude(), 48.9523);
        assert_eq!(location.longitude(), 89.1462);
        assert_eq!(location.timezone(), "Asia/Ulaanbaatar");
        assert_eq!(location.name(), Some("Tsengel, Bayan-Ölgii"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.weather.refresh_minutes, 60);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.weather.refresh_minutes = 180;
        config.location.name = "Ölgii".to_string();

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.weather.refresh_minutes, 180);
        assert_eq!(loaded.location.name, "Ölgii");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\nrefresh_minutes = 15\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.weather.refresh_minutes, 15);
        assert_eq!(config.weather.api_url, default_api_url());
        assert_eq!(config.location.timezone, "Asia/Ulaanbaatar");
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather\nrefresh_minutes = ").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_load_validated_rejects_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[weather]\nrefresh_minutes = 7\n").unwrap();

        let err = Config::load_validated(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("weather.refresh_minutes"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
