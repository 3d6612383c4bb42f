//! Common test fixtures for weather-art tests.
//!
//! This module provides pre-defined series that represent the scenarios the
//! feature mapper and renderer are specified against.

use chrono::{DateTime, TimeZone, Utc};
use weather_common::WeatherSeries;

use crate::generators::{hourly_series, hourly_timestamps};

/// Fixed start instant so fixtures are reproducible.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Four hourly samples whose temperature alternates between the bottom and
/// top of the amplitude range.
pub fn alternating_temperature() -> WeatherSeries {
    hourly_series(
        &[10.0, 35.0, 10.0, 35.0],
        &[60.0, 60.0, 60.0, 60.0],
        &[5.0, 5.0, 5.0, 5.0],
        &[50.0, 50.0, 50.0, 50.0],
    )
}

/// A series with timestamps only; every observation column is absent.
pub fn all_columns_missing(len: usize) -> WeatherSeries {
    WeatherSeries::new(hourly_timestamps(len), [None, None, None, None])
        .expect("fixture timestamps are ordered")
}

/// Twelve hours of calm, mild weather.
pub fn calm_half_day() -> WeatherSeries {
    let n = 12;
    hourly_series(&vec![22.0; n], &vec![65.0; n], &vec![2.0; n], &vec![40.0; n])
}
