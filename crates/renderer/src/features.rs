//! Mapping weather observations to bounded visual-feature channels.
//!
//! Each channel is driven by one observation column:
//!
//! | channel   | column      | norm range  | output            |
//! |-----------|-------------|-------------|-------------------|
//! | amplitude | temperature | [10, 35] °C | 0.25 + 0.75·norm  |
//! | drift     | wind speed  | [0, 18] m/s | 0.10 + 0.90·norm  |
//! | haze      | cloud cover | [10, 100] % | 0.30 + 0.70·norm  |
//! | warmth    | humidity    | [30, 95] %  | norm              |
//!
//! The column is clamp-normalised into its range, smoothed along time with a
//! Gaussian (nearest-edge), then remapped. A missing column yields a constant
//! 0.5 channel instead of an error.

use tracing::warn;
use weather_common::{Column, WeatherSeries};

use crate::error::{RenderError, RenderResult};
use crate::filters::{gaussian_filter1d, EdgeMode};

/// Value used for every entry of a channel whose column is unavailable.
pub const DEFAULT_CHANNEL_VALUE: f32 = 0.5;

/// The four visual-feature channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Amplitude,
    Drift,
    Haze,
    Warmth,
}

/// How one channel is derived from its source column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    pub column: Column,
    pub lo: f32,
    pub hi: f32,
    pub offset: f32,
    pub scale: f32,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Amplitude,
        Channel::Drift,
        Channel::Haze,
        Channel::Warmth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Amplitude => "amplitude",
            Channel::Drift => "drift",
            Channel::Haze => "haze",
            Channel::Warmth => "warmth",
        }
    }

    pub fn spec(&self) -> ChannelSpec {
        match self {
            Channel::Amplitude => ChannelSpec {
                column: Column::Temperature,
                lo: 10.0,
                hi: 35.0,
                offset: 0.25,
                scale: 0.75,
            },
            Channel::Drift => ChannelSpec {
                column: Column::WindSpeed,
                lo: 0.0,
                hi: 18.0,
                offset: 0.10,
                scale: 0.90,
            },
            Channel::Haze => ChannelSpec {
                column: Column::CloudCover,
                lo: 10.0,
                hi: 100.0,
                offset: 0.30,
                scale: 0.70,
            },
            Channel::Warmth => ChannelSpec {
                column: Column::Humidity,
                lo: 30.0,
                hi: 95.0,
                offset: 0.0,
                scale: 1.0,
            },
        }
    }

    /// Inclusive output bounds of the channel.
    pub fn bounds(&self) -> (f32, f32) {
        let spec = self.spec();
        (spec.offset, spec.offset + spec.scale)
    }
}

/// Feature values at one point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureState {
    pub amplitude: f32,
    pub drift: f32,
    pub haze: f32,
    pub warmth: f32,
}

/// Four parallel channels, one entry per weather sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSeries {
    amplitude: Vec<f32>,
    drift: Vec<f32>,
    haze: Vec<f32>,
    warmth: Vec<f32>,
}

impl FeatureSeries {
    /// Assemble a series from precomputed channels of equal, non-zero length.
    pub fn new(
        amplitude: Vec<f32>,
        drift: Vec<f32>,
        haze: Vec<f32>,
        warmth: Vec<f32>,
    ) -> RenderResult<Self> {
        let len = amplitude.len();
        if len == 0 || drift.len() != len || haze.len() != len || warmth.len() != len {
            return Err(RenderError::EmptyFeatures);
        }
        Ok(Self {
            amplitude,
            drift,
            haze,
            warmth,
        })
    }

    pub fn len(&self) -> usize {
        self.amplitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitude.is_empty()
    }

    pub fn channel(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Amplitude => &self.amplitude,
            Channel::Drift => &self.drift,
            Channel::Haze => &self.haze,
            Channel::Warmth => &self.warmth,
        }
    }

    /// Feature values of sample `index` (clamped to the last sample).
    pub fn state(&self, index: usize) -> FeatureState {
        self.interpolate(index, 0.0)
    }

    /// Feature values between sample `index` and `index + 1`.
    ///
    /// The last sample has nothing to interpolate toward and is held flat.
    pub fn interpolate(&self, index: usize, alpha: f32) -> FeatureState {
        let i = index.min(self.len() - 1);
        let value = |values: &[f32]| {
            if alpha == 0.0 || i + 1 >= values.len() {
                values[i]
            } else {
                values[i] * (1.0 - alpha) + values[i + 1] * alpha
            }
        };
        FeatureState {
            amplitude: value(&self.amplitude),
            drift: value(&self.drift),
            haze: value(&self.haze),
            warmth: value(&self.warmth),
        }
    }
}

/// Normalise `values` to `[0, 1]` against `lo`/`hi`, clipping outliers.
///
/// Missing bounds default to the data's own (NaN-ignoring) min and max.
/// When `hi <= lo` the output is all zeros. NaN inputs stay NaN.
pub fn normalize_series(values: &[f32], lo: Option<f32>, hi: Option<f32>) -> Vec<f32> {
    let finite = || values.iter().copied().filter(|v| !v.is_nan());
    let lo = lo.unwrap_or_else(|| finite().fold(f32::INFINITY, f32::min));
    let hi = hi.unwrap_or_else(|| finite().fold(f32::NEG_INFINITY, f32::max));

    if lo.is_nan() || hi.is_nan() || hi <= lo {
        return vec![0.0; values.len()];
    }

    let range = hi - lo;
    values
        .iter()
        .map(|&x| ((x - lo) / range).clamp(0.0, 1.0))
        .collect()
}

/// Replace NaN readings with the mean of the valid ones.
///
/// Returns `None` when there is no valid reading at all.
pub fn fill_nan_with_mean(values: &[f32]) -> Option<Vec<f32>> {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0f64, 0usize), |(s, c), &v| (s + v as f64, c + 1));
    if count == 0 {
        return None;
    }
    let mean = (sum / count as f64) as f32;
    Some(
        values
            .iter()
            .map(|&v| if v.is_nan() { mean } else { v })
            .collect(),
    )
}

/// Smooth a sequence along time with a nearest-edge Gaussian.
pub fn smooth_series(values: &[f32], sigma: f32) -> Vec<f32> {
    gaussian_filter1d(values, sigma, EdgeMode::Nearest)
}

/// Derive one channel from its column, or `None` if the column is unusable.
fn map_channel(series: &WeatherSeries, channel: Channel, sigma: f32) -> Option<Vec<f32>> {
    let spec = channel.spec();

    let Some(raw) = series.column(spec.column) else {
        warn!(
            channel = channel.name(),
            column = %spec.column,
            default = DEFAULT_CHANNEL_VALUE,
            "Weather column missing, using constant channel"
        );
        return None;
    };

    let Some(filled) = fill_nan_with_mean(raw) else {
        warn!(
            channel = channel.name(),
            column = %spec.column,
            default = DEFAULT_CHANNEL_VALUE,
            "Weather column has no valid readings, using constant channel"
        );
        return None;
    };

    let normalized = normalize_series(&filled, Some(spec.lo), Some(spec.hi));
    let smoothed = smooth_series(&normalized, sigma);

    Some(
        smoothed
            .into_iter()
            .map(|n| spec.offset + spec.scale * n)
            .collect(),
    )
}

/// Map a weather series to its feature series.
///
/// The output always has exactly `series.len()` entries per channel.
pub fn map_features(series: &WeatherSeries, sigma: f32) -> FeatureSeries {
    let len = series.len();
    let mut channels = Channel::ALL.map(|channel| {
        map_channel(series, channel, sigma).unwrap_or_else(|| vec![DEFAULT_CHANNEL_VALUE; len])
    });

    FeatureSeries {
        amplitude: std::mem::take(&mut channels[0]),
        drift: std::mem::take(&mut channels[1]),
        haze: std::mem::take(&mut channels[2]),
        warmth: std::mem::take(&mut channels[3]),
    }
}
