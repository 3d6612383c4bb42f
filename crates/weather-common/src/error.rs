//! Error types for weather series construction.

use thiserror::Error;

/// Result type alias using WeatherError.
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Errors raised while building or validating a weather series.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather series is empty")]
    EmptySeries,

    #[error("Timestamps are not strictly increasing at index {index}")]
    UnorderedTimestamps { index: usize },

    #[error("Column '{column}' has {actual} values, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),
}

impl From<crate::time::TimeParseError> for WeatherError {
    fn from(err: crate::time::TimeParseError) -> Self {
        WeatherError::InvalidTime(err.to_string())
    }
}
