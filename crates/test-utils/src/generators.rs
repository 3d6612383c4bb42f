//! Test data generators for creating synthetic weather series.
//!
//! These generators create predictable, verifiable data that can be used
//! across the test suite. Randomised generators take an explicit seed.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use weather_common::WeatherSeries;

use crate::fixtures::start_time;

/// Creates `len` hourly timestamps starting at [`start_time`].
pub fn hourly_timestamps(len: usize) -> Vec<DateTime<Utc>> {
    let start = start_time();
    (0..len).map(|i| start + Duration::hours(i as i64)).collect()
}

/// Creates a fully populated hourly series from four equal-length columns.
///
/// # Panics
///
/// Panics if the columns differ in length; this is a test helper.
pub fn hourly_series(
    temperature: &[f32],
    humidity: &[f32],
    wind_speed: &[f32],
    cloud_cover: &[f32],
) -> WeatherSeries {
    WeatherSeries::new(
        hourly_timestamps(temperature.len()),
        [
            Some(temperature.to_vec()),
            Some(humidity.to_vec()),
            Some(wind_speed.to_vec()),
            Some(cloud_cover.to_vec()),
        ],
    )
    .expect("generated columns must have equal length")
}

/// Creates `days` days of hourly weather with a diurnal temperature cycle.
///
/// Ranges are chosen to look like a humid subtropical city:
/// - Temperature: 27°C ± 5°C daily cycle plus N(0, 2) noise
/// - Humidity: 75% ± 10%, clipped to [40, 100]
/// - Wind speed: |N(5, 3)| clipped to [0, 15] m/s
/// - Cloud cover: |N(50, 25)| clipped to [0, 100] %
pub fn diurnal_series(days: usize, seed: u64) -> WeatherSeries {
    let hours = days * 24;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut normal = move |mean: f32, sd: f32| {
        // Box-Muller from two uniforms.
        let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
        let u2: f32 = rng.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
        mean + sd * z
    };

    let mut temperature = Vec::with_capacity(hours);
    let mut humidity = Vec::with_capacity(hours);
    let mut wind_speed = Vec::with_capacity(hours);
    let mut cloud_cover = Vec::with_capacity(hours);

    for h in 0..hours {
        let cycle = 5.0 * (std::f32::consts::TAU * h as f32 / 24.0).sin();
        temperature.push(27.0 + cycle + normal(0.0, 2.0));
        humidity.push(normal(75.0, 10.0).clamp(40.0, 100.0));
        wind_speed.push(normal(5.0, 3.0).abs().clamp(0.0, 15.0));
        cloud_cover.push(normal(50.0, 25.0).abs().clamp(0.0, 100.0));
    }

    hourly_series(&temperature, &humidity, &wind_speed, &cloud_cover)
}

/// Noisy sine wave, the classic input for checking that smoothing
/// reduces variance.
pub fn noisy_sine(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|i| {
            let x = i as f32 / (len.max(2) - 1) as f32 * 4.0 * std::f32::consts::PI;
            x.sin() + 0.3 * rng.gen_range(-1.7..1.7)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diurnal_series_length() {
        let series = diurnal_series(6, 42);
        assert_eq!(series.len(), 144);
    }

    #[test]
    fn test_diurnal_series_deterministic() {
        assert_eq!(diurnal_series(1, 7), diurnal_series(1, 7));
    }

    #[test]
    fn test_hourly_timestamps_spacing() {
        let ts = hourly_timestamps(3);
        assert_eq!((ts[2] - ts[0]).num_hours(), 2);
    }
}
