use quantum_weather::{
    CacheStore, FileStore, ForecastClient, Location, MemoryStore, RefreshController,
    RefreshInterval,
};
use std::sync::Arc;

use crate::{AppError, Config};

/// Forecast controller as wired by the application.
pub type WeatherController = RefreshController<ForecastClient, Box<dyn CacheStore>>;

/// Command-line overrides applied on top of the config file
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Keep the cache in memory only; nothing is read from or written to disk
    pub no_cache: bool,
    /// Refresh interval overriding `weather.refresh_minutes`
    pub refresh: Option<RefreshInterval>,
}

/// Main application state and lifecycle manager
pub struct App {
    config: Arc<Config>,
    location: Location,
    controller: WeatherController,
}

impl App {
    /// Build the application from a loaded config
    ///
    /// # Errors
    /// Fails if the location or interval are invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Config, options: AppOptions) -> Result<Self, AppError> {
        let location = config.location.to_location()?;
        let interval = match options.refresh {
            Some(interval) => interval,
            None => config.weather.refresh_interval()?,
        };

        let client =
            ForecastClient::with_base_url(&config.weather.api_url, config.weather.request_timeout())?;

        let store: Box<dyn CacheStore> = if options.no_cache {
            tracing::info!("Forecast cache disabled, using memory store");
            Box::new(MemoryStore::new())
        } else {
            tracing::debug!("Forecast cache at {}", config.cache_dir.display());
            Box::new(FileStore::new(config.cache_dir.clone()))
        };

        tracing::info!(
            "Application configured for {} every {}",
            location.label(),
            interval
        );

        Ok(Self {
            config: Arc::new(config),
            controller: RefreshController::new(client, store, location.clone(), interval),
            location,
        })
    }

    /// Get reference to the forecast controller
    pub fn controller(&self) -> &WeatherController {
        &self.controller
    }

    /// Forecast location
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Get reference to application config
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop scheduled refreshes
    pub fn shutdown(&self) {
        tracing::info!("Shutting down application");
        self.controller.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::ConfigError;

    #[tokio::test]
    async fn test_cli_interval_overrides_config() {
        let config = Config::default();
        let app = App::new(
            config,
            AppOptions {
                no_cache: true,
                refresh: Some(RefreshInterval::Minutes15),
            },
        )
        .unwrap();

        assert_eq!(app.controller().interval(), RefreshInterval::Minutes15);
        assert!(!app.controller().is_scheduled());
    }

    #[tokio::test]
    async fn test_config_interval_used_by_default() {
        let mut config = Config::default();
        config.weather.refresh_minutes = 120;
        let app = App::new(config, AppOptions::default()).unwrap();

        assert_eq!(app.controller().interval(), RefreshInterval::Hours2);
        assert_eq!(app.config().weather.refresh_minutes, 120);
    }

    #[test]
    fn test_invalid_location_rejected() {
        let mut config = Config::default();
        config.location.latitude = 123.0;
        let err = App::new(config, AppOptions::default()).err().unwrap();
        assert!(matches!(err, AppError::Config(ConfigError::Location(_))));
        assert!(err.user_message().contains("[location]"));
    }

    #[test]
    fn test_invalid_interval_rejected_without_override() {
        let mut config = Config::default();
        config.weather.refresh_minutes = 45;
        assert!(App::new(config.clone(), AppOptions::default()).is_err());

        let options = AppOptions {
            no_cache: true,
            refresh: Some(RefreshInterval::Hour1),
        };
        assert!(App::new(config, options).is_ok());
    }
}
