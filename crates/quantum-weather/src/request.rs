//! Open-Meteo forecast request construction.

use url::Url;

use crate::location::Location;

/// Default Open-Meteo forecast endpoint.
pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Forecast horizon in days.
pub const FORECAST_DAYS: u8 = 7;

/// Hourly variables requested on every call.
pub const HOURLY_VARIABLES: &[&str] = &[
    "temperature_2m",
    "relative_humidity_2m",
    "wind_speed_10m",
    "precipitation",
    "cloud_cover",
    "surface_pressure",
];

/// Daily variables requested on every call.
pub const DAILY_VARIABLES: &[&str] = &[
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "weather_code",
];

/// A forecast request for a fixed location and variable set.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    location: Location,
}

impl ForecastRequest {
    pub fn new(location: Location) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Query parameters in the order they are sent.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.location.latitude().to_string()),
            ("longitude", self.location.longitude().to_string()),
            ("timezone", self.location.timezone().to_string()),
            ("hourly", HOURLY_VARIABLES.join(",")),
            ("daily", DAILY_VARIABLES.join(",")),
            ("forecast_days", FORECAST_DAYS.to_string()),
        ]
    }

    /// Full request URL against `base_url`.
    ///
    /// # Errors
    /// Returns the parse error if `base_url` is not an absolute URL.
    pub fn url(&self, base_url: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(base_url, self.query_pairs())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    fn params(loc: Location) -> HashMap<String, String> {
        ForecastRequest::new(loc)
            .url(OPEN_METEO_URL)
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect()
    }

    #[test]
    fn test_url_carries_location() {
        let q = params(Location::new(48.9523, 89.1462, "Asia/Ulaanbaatar").unwrap());
        assert_eq!(q["latitude"], "48.9523");
        assert_eq!(q["longitude"], "89.1462");
        assert_eq!(q["timezone"], "Asia/Ulaanbaatar");
    }

    #[test]
    fn test_url_has_fixed_variables_for_any_location() {
        let locations = [
            Location::new(48.9523, 89.1462, "Asia/Ulaanbaatar").unwrap(),
            Location::new(-90.0, -180.0, "Antarctica/South_Pole").unwrap(),
            Location::new(0.0, 0.0, "UTC").unwrap(),
            Location::new(90.0, 180.0, "Etc/GMT-12").unwrap(),
        ];

        for loc in locations {
            let q = params(loc);
            assert_eq!(q["hourly"], HOURLY_VARIABLES.join(","));
            assert_eq!(q["daily"], DAILY_VARIABLES.join(","));
            assert_eq!(q["forecast_days"], "7");
            assert_eq!(q.len(), 6);
        }
    }

    #[test]
    fn test_url_keeps_base_path() {
        let req = ForecastRequest::new(Location::new(1.5, 2.5, "UTC").unwrap());
        let url = req.url("http://127.0.0.1:9000/v1/forecast").unwrap();
        assert_eq!(url.path(), "/v1/forecast");
        assert_eq!(url.host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn test_invalid_base_url() {
        let req = ForecastRequest::new(Location::new(1.5, 2.5, "UTC").unwrap());
        assert!(req.url("not a url").is_err());
    }
}
