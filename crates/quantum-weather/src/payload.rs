//! Parsed forecast payload and its wire decoding.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;
use crate::types::{DaySummary, HourSample, WeatherCondition};

/// Variable samples aligned by index with a shared timestamp sequence.
///
/// Samples are `None` where the API reported `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series<T> {
    pub time: Vec<T>,
    pub variables: BTreeMap<String, Vec<Option<f64>>>,
    #[serde(default)]
    pub units: BTreeMap<String, String>,
}

pub type HourlySeries = Series<NaiveDateTime>;
pub type DailySeries = Series<NaiveDate>;

impl<T: PartialOrd> Series<T> {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// All samples of one variable.
    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    /// Sample of `name` at `index`, if present and not null.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.variables.get(name)?.get(index).copied().flatten()
    }

    pub fn unit(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    /// Every variable has one sample per timestamp and timestamps ascend.
    fn check_aligned(&self, label: &str) -> Result<(), WeatherError> {
        if self.time.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WeatherError::schema(format!(
                "{} timestamps are not strictly ascending",
                label
            )));
        }
        for (name, samples) in &self.variables {
            if samples.len() != self.time.len() {
                return Err(WeatherError::schema(format!(
                    "{}.{} has {} samples for {} timestamps",
                    label,
                    name,
                    samples.len(),
                    self.time.len()
                )));
            }
        }
        Ok(())
    }
}

/// Hourly and daily forecast series for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPayload {
    pub timezone: Option<String>,
    pub hourly: HourlySeries,
    pub daily: DailySeries,
}

impl ForecastPayload {
    /// Decode an Open-Meteo response body.
    ///
    /// # Errors
    /// Returns `WeatherError::Schema` if the body is not JSON, lacks an
    /// `hourly`/`daily` block or its `time` key, carries non-numeric samples
    /// or unparseable timestamps, or breaks sample/timestamp alignment.
    pub fn from_slice(body: &[u8]) -> Result<Self, WeatherError> {
        let wire: WireForecast = serde_json::from_slice(body)
            .map_err(|e| WeatherError::schema(format!("invalid forecast body: {}", e)))?;

        let hourly = wire
            .hourly
            .ok_or_else(|| WeatherError::schema("response has no hourly block"))?
            .into_series("hourly", wire.hourly_units, parse_hour)?;
        let daily = wire
            .daily
            .ok_or_else(|| WeatherError::schema("response has no daily block"))?
            .into_series("daily", wire.daily_units, parse_day)?;

        let payload = Self {
            timezone: wire.timezone,
            hourly,
            daily,
        };
        payload.validate()?;
        Ok(payload)
    }

    /// Check the alignment invariant of both series.
    ///
    /// # Errors
    /// Returns `WeatherError::Schema` naming the first misaligned variable.
    pub fn validate(&self) -> Result<(), WeatherError> {
        self.hourly.check_aligned("hourly")?;
        self.daily.check_aligned("daily")
    }

    /// Hourly row at `index`.
    pub fn hour(&self, index: usize) -> Option<HourSample> {
        let time = *self.hourly.time.get(index)?;
        Some(HourSample {
            time,
            temperature: self.hourly.value("temperature_2m", index),
            humidity: self.hourly.value("relative_humidity_2m", index),
            wind_speed: self.hourly.value("wind_speed_10m", index),
            precipitation: self.hourly.value("precipitation", index),
        })
    }

    /// Current conditions: the first hourly row.
    pub fn current(&self) -> Option<HourSample> {
        self.hour(0)
    }

    /// The first `count` hourly rows.
    pub fn next_hours(&self, count: usize) -> Vec<HourSample> {
        (0..self.hourly.len().min(count))
            .filter_map(|i| self.hour(i))
            .collect()
    }

    pub fn daily_summaries(&self) -> Vec<DaySummary> {
        self.daily
            .time
            .iter()
            .enumerate()
            .map(|(i, date)| DaySummary {
                date: *date,
                temperature_max: self.daily.value("temperature_2m_max", i),
                temperature_min: self.daily.value("temperature_2m_min", i),
                precipitation_sum: self.daily.value("precipitation_sum", i),
                condition: self
                    .daily
                    .value("weather_code", i)
                    .map(|code| WeatherCondition::from_wmo_code(code as i32)),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireForecast {
    timezone: Option<String>,
    hourly: Option<WireSeries>,
    #[serde(default)]
    hourly_units: BTreeMap<String, String>,
    daily: Option<WireSeries>,
    #[serde(default)]
    daily_units: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct WireSeries {
    time: Option<Vec<String>>,
    #[serde(flatten)]
    variables: BTreeMap<String, Vec<Option<f64>>>,
}

impl WireSeries {
    fn into_series<T>(
        self,
        label: &str,
        mut units: BTreeMap<String, String>,
        parse: fn(&str) -> Option<T>,
    ) -> Result<Series<T>, WeatherError> {
        let raw = self
            .time
            .ok_or_else(|| WeatherError::schema(format!("{} block has no time key", label)))?;
        let time = raw
            .iter()
            .map(|s| {
                parse(s).ok_or_else(|| {
                    WeatherError::schema(format!("{} timestamp {:?} is malformed", label, s))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        units.remove("time");

        Ok(Series {
            time,
            variables: self.variables,
            units,
        })
    }
}

fn parse_hour(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
