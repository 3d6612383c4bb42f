//! JSON file cache of the last successful fetch.
//!
//! The file holds one [`CacheEntry`]. Freshness is judged by the entry's
//! own `fetched_at` stamp, not file metadata, so a copied or restored cache
//! file keeps its age.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;
use weather_common::{FetchWindow, Location, WeatherSeries};

use crate::error::{FetchError, FetchResult};
use crate::FetchRequest;

/// Coordinates closer than this are the same place.
const COORD_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub location: Location,
    #[serde(default)]
    pub window: Option<FetchWindow>,
    pub series: WeatherSeries,
}

impl CacheEntry {
    pub fn new(request: &FetchRequest, series: WeatherSeries) -> Self {
        Self {
            fetched_at: Utc::now(),
            location: request.location.clone(),
            window: Some(request.window),
            series,
        }
    }

    /// Whether this entry answers `request`: same coordinates and, when
    /// recorded, the same window.
    pub fn matches(&self, request: &FetchRequest) -> bool {
        let same_place = (self.location.latitude - request.location.latitude).abs()
            < COORD_TOLERANCE
            && (self.location.longitude - request.location.longitude).abs() < COORD_TOLERANCE;
        let same_window = self.window.map_or(true, |w| w == request.window);
        same_place && same_window
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone)]
pub struct WeatherCache {
    path: PathBuf,
    ttl: Duration,
}

impl WeatherCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.age(now) < self.ttl
    }

    /// Read the cache file. A missing file is `Ok(None)`.
    pub async fn load(&self) -> FetchResult<Option<CacheEntry>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(FetchError::io(&self.path, e)),
        };
        let entry = serde_json::from_slice(&bytes).map_err(|e| FetchError::json(&self.path, e))?;
        Ok(Some(entry))
    }

    /// Write the cache file, creating parent directories. The write goes to
    /// a sibling temp file first and is renamed into place.
    pub async fn store(&self, entry: &CacheEntry) -> FetchResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }

        let json = serde_json::to_vec_pretty(entry).map_err(|e| FetchError::json(&self.path, e))?;
        let tmp = self.path.with_extension("json.partial");
        fs::write(&tmp, &json)
            .await
            .map_err(|e| FetchError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| FetchError::io(&self.path, e))?;

        debug!(path = %self.path.display(), bytes = json.len(), "Weather cache written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn request() -> FetchRequest {
        FetchRequest::new(Location::shenzhen(), FetchWindow::new(5, 1))
    }

    fn entry(age_minutes: i64) -> CacheEntry {
        let mut entry = CacheEntry::new(&request(), test_utils::calm_half_day());
        entry.fetched_at = Utc::now() - ChronoDuration::minutes(age_minutes);
        entry
    }

    #[test]
    fn test_freshness() {
        let cache = WeatherCache::new("unused.json", Duration::from_secs(3600));
        assert!(cache.is_fresh(&entry(10), Utc::now()));
        assert!(!cache.is_fresh(&entry(61), Utc::now()));
    }

    #[test]
    fn test_matches_location_and_window() {
        let e = entry(0);
        assert!(e.matches(&request()));

        let elsewhere = FetchRequest::new(Location::new("Oslo", 59.91, 10.75), FetchWindow::new(5, 1));
        assert!(!e.matches(&elsewhere));

        let longer = FetchRequest::new(Location::shenzhen(), FetchWindow::new(7, 1));
        assert!(!e.matches(&longer));
    }

    #[test]
    fn test_future_timestamp_has_zero_age() {
        let mut e = entry(0);
        e.fetched_at = Utc::now() + ChronoDuration::hours(1);
        assert_eq!(e.age(Utc::now()), Duration::ZERO);
    }
}
