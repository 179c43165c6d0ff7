//! Fixed forecast location.

use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// Geographic point the forecast is requested for.
///
/// Fixed at configuration time. Coordinates are decimal degrees and the
/// timezone is an IANA identifier passed through to the API unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    timezone: String,
    name: Option<String>,
}

impl Location {
    /// Build a validated location.
    ///
    /// # Errors
    /// Returns a `LocationError` if a coordinate is out of range (or not
    /// finite) or the timezone is blank.
    pub fn new(
        latitude: f64,
        longitude: f64,
        timezone: impl Into<String>,
    ) -> Result<Self, LocationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::InvalidLongitude(longitude));
        }
        let timezone = timezone.into().trim().to_string();
        if timezone.is_empty() {
            return Err(LocationError::MissingTimezone);
        }

        Ok(Self {
            latitude,
            longitude,
            timezone,
            name: None,
        })
    }

    /// Attach a human-readable place name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = (!name.trim().is_empty()).then_some(name);
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name if set, otherwise the coordinates.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{:.4}, {:.4}", self.latitude, self.longitude),
        }
    }
}
