//! Offline weather source backed by a JSON file.
//!
//! Accepts either a cache document (`{ fetched_at, location, series }`) or
//! a bare series. The request is ignored: the file is the data.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;
use weather_common::WeatherSeries;

use crate::cache::CacheEntry;
use crate::error::{FetchError, FetchResult};
use crate::{FetchRequest, WeatherSource};

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse a cache document or a bare series.
pub fn parse_weather_file(bytes: &[u8], path: &Path) -> FetchResult<WeatherSeries> {
    if let Ok(entry) = serde_json::from_slice::<CacheEntry>(bytes) {
        return Ok(entry.series);
    }
    serde_json::from_slice::<WeatherSeries>(bytes).map_err(|e| FetchError::json(path, e))
}

#[async_trait]
impl WeatherSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch(&self, _request: &FetchRequest) -> FetchResult<WeatherSeries> {
        let bytes = fs::read(&self.path)
            .await
            .map_err(|e| FetchError::io(&self.path, e))?;
        let series = parse_weather_file(&bytes, &self.path)?;
        info!(
            path = %self.path.display(),
            samples = series.len(),
            "Loaded weather from file"
        );
        Ok(series)
    }
}
