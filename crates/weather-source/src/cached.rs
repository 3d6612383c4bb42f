//! Read-through cache with retry and stale fallback.
//!
//! Order of preference:
//! 1. a fresh cache entry for the same request (no network)
//! 2. the inner source, transient failures retried with exponential backoff
//! 3. a stale cache entry for the same request, with a warning
//! 4. [`FetchError::Exhausted`]

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument, warn};
use weather_common::WeatherSeries;

use crate::cache::{CacheEntry, WeatherCache};
use crate::error::{FetchError, FetchResult};
use crate::{FetchRequest, WeatherSource};

/// Bounded attempts with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (at least 1)
    pub max_attempts: u32,
    /// Delay after the first failure (doubles each retry)
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (0-based):
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

pub struct CachedSource<S> {
    inner: S,
    cache: WeatherCache,
    policy: RetryPolicy,
}

impl<S: WeatherSource> CachedSource<S> {
    pub fn new(inner: S, cache: WeatherCache, policy: RetryPolicy) -> Self {
        Self {
            inner,
            cache,
            policy,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Cached entry for `request`, if one can be read. Unreadable cache
    /// files are logged and ignored.
    async fn cached_entry(&self, request: &FetchRequest) -> Option<CacheEntry> {
        match self.cache.load().await {
            Ok(Some(entry)) if entry.matches(request) => Some(entry),
            Ok(Some(_)) => {
                info!(
                    path = %self.cache.path().display(),
                    "Cache holds a different location or window, ignoring"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Weather cache unreadable, ignoring");
                None
            }
        }
    }

    /// Fetch from the inner source, retrying transient failures. On error
    /// also returns how many attempts were made.
    async fn fetch_with_retry(
        &self,
        request: &FetchRequest,
    ) -> Result<WeatherSeries, (FetchError, u32)> {
        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.inner.fetch(request).await {
                Ok(series) => return Ok(series),
                Err(e) => {
                    attempt += 1;
                    if !e.is_transient() {
                        warn!(
                            source = self.inner.name(),
                            error = %e,
                            attempt,
                            "Weather fetch failed permanently, not retrying"
                        );
                        return Err((e, attempt));
                    }
                    if attempt >= attempts {
                        return Err((e, attempt));
                    }

                    let delay = self.policy.delay_for(attempt - 1);
                    warn!(
                        source = self.inner.name(),
                        error = %e,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Weather fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl<S: WeatherSource> WeatherSource for CachedSource<S> {
    fn name(&self) -> &str {
        "cached"
    }

    #[instrument(skip_all, fields(source = self.inner.name(), location = %request.location.name))]
    async fn fetch(&self, request: &FetchRequest) -> FetchResult<WeatherSeries> {
        let cached = self.cached_entry(request).await;

        if let Some(entry) = &cached {
            if self.cache.is_fresh(entry, Utc::now()) {
                info!(
                    age_secs = entry.age(Utc::now()).as_secs(),
                    samples = entry.series.len(),
                    "Using cached weather"
                );
                return Ok(entry.series.clone());
            }
        }

        match self.fetch_with_retry(request).await {
            Ok(series) => {
                let entry = CacheEntry::new(request, series);
                if let Err(e) = self.cache.store(&entry).await {
                    warn!(error = %e, "Failed to write weather cache");
                }
                Ok(entry.series)
            }
            Err((last_error, attempts)) => match cached {
                Some(entry) => {
                    warn!(
                        error = %last_error,
                        age_secs = entry.age(Utc::now()).as_secs(),
                        "Weather fetch failed, using stale cache"
                    );
                    Ok(entry.series)
                }
                None => Err(FetchError::Exhausted {
                    attempts,
                    last_error: last_error.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(4), Duration::from_secs(16));
        assert_eq!(policy.delay_for(5), Duration::from_secs(30));
        assert_eq!(policy.delay_for(40), Duration::from_secs(30));
    }

    #[test]
    fn test_immediate_policy() {
        let policy = RetryPolicy::immediate(5);
        assert_eq!(policy.delay_for(3), Duration::ZERO);
    }
}
