//! Time handling for hourly weather observations.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing an observation timestamp.
#[derive(Debug, Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

/// The window of hourly observations requested from a weather source,
/// relative to "now" at the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchWindow {
    pub past_days: u32,
    pub forecast_days: u32,
}

impl FetchWindow {
    pub fn new(past_days: u32, forecast_days: u32) -> Self {
        Self {
            past_days,
            forecast_days,
        }
    }

    /// Expected number of hourly samples covered by the window.
    pub fn expected_hours(&self) -> usize {
        (self.past_days as usize + self.forecast_days as usize) * 24
    }
}

impl Default for FetchWindow {
    fn default() -> Self {
        Self::new(5, 1)
    }
}

/// Parse an observation timestamp.
///
/// Accepts RFC 3339 and the zone-less forms returned by forecast APIs
/// (`2024-01-15T12:00`, `2024-01-15T12:00:00`), which are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Linear interpolation between two instants, `alpha` in `[0, 1]`.
pub fn interpolate_timestamp(a: DateTime<Utc>, b: DateTime<Utc>, alpha: f32) -> DateTime<Utc> {
    let span_ms = (b - a).num_milliseconds() as f64;
    let offset = (span_ms * alpha.clamp(0.0, 1.0) as f64).round() as i64;
    a + Duration::milliseconds(offset)
}
