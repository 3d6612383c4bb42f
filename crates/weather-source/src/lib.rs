//! Weather retrieval for the weather-art pipeline.
//!
//! Sources:
//! - [`OpenMeteoClient`]: hourly data from the Open-Meteo forecast API
//! - [`FileSource`]: a JSON file on disk, for offline runs
//! - [`CachedSource`]: wraps another source with a JSON file cache and
//!   retry with exponential backoff, falling back to stale cache data

pub mod cache;
pub mod cached;
pub mod error;
pub mod file;
pub mod open_meteo;

use async_trait::async_trait;
use weather_common::{FetchWindow, Location, WeatherSeries};

pub use cache::{CacheEntry, WeatherCache};
pub use cached::{CachedSource, RetryPolicy};
pub use error::{FetchError, FetchResult};
pub use file::FileSource;
pub use open_meteo::{OpenMeteoClient, OpenMeteoConfig};

/// What to fetch: a place and a window of hours around now.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub location: Location,
    pub window: FetchWindow,
}

impl FetchRequest {
    pub fn new(location: Location, window: FetchWindow) -> Self {
        Self { location, window }
    }
}

/// Anything that can produce an ordered hourly series for a request.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn fetch(&self, request: &FetchRequest) -> FetchResult<WeatherSeries>;
}

#[async_trait]
impl<S: WeatherSource + ?Sized> WeatherSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self, request: &FetchRequest) -> FetchResult<WeatherSeries> {
        (**self).fetch(request).await
    }
}
