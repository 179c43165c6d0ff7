//! Forecast retrieval for Quantum Weather.
//!
//! Fetches hourly and 7-day forecasts from Open-Meteo for a fixed location,
//! keeps the last good payload in a versioned local cache, and refreshes it
//! on start, on demand and on a user-selected interval.

pub mod cache;
pub mod controller;
pub mod error;
pub mod location;
pub mod payload;
pub mod policy;
pub mod provider;
pub mod request;
pub mod types;

pub use cache::{CacheEntry, CacheStore, FileStore, MemoryStore, WeatherCache};
pub use controller::{RefreshController, RefreshState, TimerStats};
pub use error::{CacheError, LocationError, WeatherError};
pub use location::Location;
pub use payload::{DailySeries, ForecastPayload, HourlySeries, Series};
pub use policy::{should_use_cache, InvalidInterval, RefreshInterval};
pub use provider::{ForecastClient, ForecastSource};
pub use request::ForecastRequest;
pub use types::{DaySummary, HourSample, WeatherCondition};
