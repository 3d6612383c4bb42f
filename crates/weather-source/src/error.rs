//! Error types for weather retrieval.

use std::path::PathBuf;

use thiserror::Error;
use weather_common::WeatherError;

/// Result type alias using FetchError.
pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Weather API returned {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Invalid weather response: {0}")]
    Decode(String),

    #[error("Invalid weather series: {0}")]
    Series(#[from] WeatherError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed weather file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Weather fetch failed after {attempts} attempt(s) and no cache is available: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl FetchError {
    /// Whether the same request may succeed when tried again: transport
    /// failures, 5xx and 429. Client errors and bad payloads are final.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => !e.is_builder() && !e.is_decode(),
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        FetchError::Json {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            status: code,
            reason: String::new(),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(404).is_transient());
        assert!(!FetchError::Decode("bad".to_string()).is_transient());
        assert!(!FetchError::Exhausted {
            attempts: 3,
            last_error: String::new()
        }
        .is_transient());
    }
}
