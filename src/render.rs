//! Plain-text rendering of controller state for the terminal.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use quantum_weather::{ForecastPayload, Location, RefreshState};

/// Hourly rows shown under the daily summary.
pub const HOURS_SHOWN: usize = 24;

const MISSING: &str = "--";

fn number(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => MISSING.to_string(),
    }
}

fn unit<'a>(series_unit: Option<&'a str>, fallback: &'a str) -> &'a str {
    series_unit.unwrap_or(fallback)
}

/// Render one state; `None` when there is nothing new to print.
pub fn state(location: &Location, state: &RefreshState) -> Option<String> {
    match state {
        RefreshState::Idle => None,
        RefreshState::Loading => Some("Updating forecast...".to_string()),
        RefreshState::Ready {
            payload,
            fetched_at,
            from_cache,
        } => Some(forecast(location, payload, *fetched_at, *from_cache)),
        RefreshState::Failed(e) => Some(format!("Forecast unavailable: {}", e.user_message())),
    }
}

/// Header, current conditions, daily summary and the next day of hours.
pub fn forecast(
    location: &Location,
    payload: &ForecastPayload,
    fetched_at: DateTime<Utc>,
    from_cache: bool,
) -> String {
    let mut out = String::new();
    let timezone = payload
        .timezone
        .as_deref()
        .unwrap_or_else(|| location.timezone());
    let source = if from_cache { " (cached)" } else { "" };

    let _ = writeln!(out, "{} [{}]", location.label(), timezone);
    let _ = writeln!(
        out,
        "Last fetched {}{}",
        fetched_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        source
    );

    let hourly = &payload.hourly;
    let temp_unit = unit(hourly.unit("temperature_2m"), "°C");
    let wind_unit = unit(hourly.unit("wind_speed_10m"), "km/h");
    let precip_unit = unit(hourly.unit("precipitation"), "mm");

    let _ = writeln!(out);
    match payload.current() {
        Some(now) => {
            let _ = writeln!(
                out,
                "Now: {}{}  humidity {}%  wind {} {}  precipitation {} {}",
                number(now.temperature, 1),
                temp_unit,
                number(now.humidity, 0),
                number(now.wind_speed, 1),
                wind_unit,
                number(now.precipitation, 1),
                precip_unit
            );
        }
        None => {
            let _ = writeln!(out, "Now: no hourly data");
        }
    }

    let days = payload.daily_summaries();
    if !days.is_empty() {
        let day_unit = unit(payload.daily.unit("temperature_2m_max"), "°C");
        let _ = writeln!(out);
        let _ = writeln!(out, "{}-day forecast", days.len());
        for day in &days {
            let condition = day.condition.map_or(MISSING, |c| c.description());
            let _ = writeln!(
                out,
                "  {}  {:>6} / {:<6}{}  {:>5} {}  {}",
                day.date.format("%a %d %b"),
                number(day.temperature_max, 1),
                number(day.temperature_min, 1),
                day_unit,
                number(day.precipitation_sum, 1),
                precip_unit,
                condition
            );
        }
    }

    let hours = payload.next_hours(HOURS_SHOWN);
    if !hours.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {:<11} {:>7} {:>5} {:>7} {:>6}",
            "Time", temp_unit, "RH%", wind_unit, precip_unit
        );
        for hour in &hours {
            let _ = writeln!(
                out,
                "  {:<11} {:>7} {:>5} {:>7} {:>6}",
                hour.time.format("%a %H:%M"),
                number(hour.temperature, 1),
                number(hour.humidity, 0),
                number(hour.wind_speed, 1),
                number(hour.precipitation, 1)
            );
        }
    }

    out
}
