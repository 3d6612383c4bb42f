//! Frame compositing.
//!
//! Every frame is a pure function of the feature series, the noise bank,
//! the two palettes and the frame's position in the run, so frames render
//! independently and in parallel.
//!
//! Per frame:
//! 1. interpolate the feature state between the bracketing samples
//! 2. pick a noise phase from drift and the global frame index, blend the
//!    two bracketing slices of each layer
//! 3. weighted sum of the layers, min-max normalised
//! 4. warp the field by a displacement driven by the flow and cloud layers
//! 5. light Gaussian blur
//! 6. gamma by haze
//! 7. color through the primary/secondary LUT blend weighted by warmth

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use image::RgbImage;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use weather_common::time::interpolate_timestamp;

use crate::error::{RenderError, RenderResult};
use crate::features::{FeatureSeries, FeatureState};
use crate::filters::{bilinear_sample_reflect, gaussian_blur, min_max_normalize, EdgeMode};
use crate::noise::{NoiseBank, NoiseLayer};
use crate::palette::PaletteLut;

/// Position of one output frame within a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameIndex {
    /// Sample the frame starts from
    pub sample: usize,
    /// Fraction of the way toward the next sample, `k / (inbetweens + 1)`
    pub alpha: f32,
    /// Position in the output sequence
    pub global: usize,
    /// Number of frames in the run
    pub total: usize,
}

/// Frame layout of a run: `inbetweens + 1` frames per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSchedule {
    pub sample_count: usize,
    pub inbetweens: usize,
}

impl FrameSchedule {
    pub fn new(sample_count: usize, inbetweens: usize) -> Self {
        Self {
            sample_count,
            inbetweens,
        }
    }

    pub fn len(&self) -> usize {
        self.sample_count * (self.inbetweens + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame at output position `global`.
    pub fn get(&self, global: usize) -> Option<FrameIndex> {
        let total = self.len();
        if global >= total {
            return None;
        }
        let per_sample = self.inbetweens + 1;
        let k = global % per_sample;
        Some(FrameIndex {
            sample: global / per_sample,
            alpha: k as f32 / per_sample as f32,
            global,
            total,
        })
    }

    /// All frames in output order.
    pub fn frames(&self) -> impl Iterator<Item = FrameIndex> + '_ {
        (0..self.len()).filter_map(move |global| self.get(global))
    }
}

/// Tunable constants of the compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositorSettings {
    /// Maximum displacement in pixels at amplitude 1
    pub distortion_px: f32,
    /// Distortion cycles over the whole run
    pub distortion_frequency: f32,
    /// Anti-alias blur sigma
    pub blur_sigma: f32,
    /// Gamma is `gamma_base + haze * gamma_haze`
    pub gamma_base: f32,
    pub gamma_haze: f32,
    /// Noise slices advanced per frame at drift 1
    pub phase_rate: f32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            distortion_px: 6.0,
            distortion_frequency: 3.0,
            blur_sigma: 0.8,
            gamma_base: 0.8,
            gamma_haze: 0.9,
            phase_rate: 2.0,
        }
    }
}

/// One rendered frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: FrameIndex,
    pub timestamp: DateTime<Utc>,
    /// Interpolated features the frame was rendered with
    pub features: FeatureState,
    pub image: RgbImage,
}

/// Renders frames from a shared noise bank and palette pair.
pub struct Compositor<'a> {
    bank: &'a NoiseBank,
    primary: &'a PaletteLut,
    secondary: &'a PaletteLut,
    settings: CompositorSettings,
}

impl<'a> Compositor<'a> {
    pub fn new(bank: &'a NoiseBank, primary: &'a PaletteLut, secondary: &'a PaletteLut) -> Self {
        Self {
            bank,
            primary,
            secondary,
            settings: CompositorSettings::default(),
        }
    }

    /// Output raster size `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        let shape = self.bank.shape();
        (shape.width as u32, shape.height as u32)
    }

    /// Noise phase for a frame, in slices, wrapped into `[0, steps)`.
    pub fn phase(&self, drift: f32, global: usize) -> f32 {
        let steps = self.bank.shape().steps as f32;
        (drift * global as f32 * self.settings.phase_rate).rem_euclid(steps)
    }

    /// Render the frame at `(sample, alpha)` of `features`.
    pub fn render_frame(&self, features: &FeatureSeries, index: FrameIndex) -> RenderResult<RgbImage> {
        let state = features.interpolate(index.sample, index.alpha);
        self.composite(state, index.global, index.total)
    }

    /// Render one frame from an explicit feature state.
    pub fn composite(
        &self,
        state: FeatureState,
        global: usize,
        total: usize,
    ) -> RenderResult<RgbImage> {
        let shape = self.bank.shape();
        let (width, height) = (shape.width, shape.height);
        let s = &self.settings;

        let phase = self.phase(state.drift, global);
        let layers: Vec<Vec<f32>> = NoiseLayer::ALL
            .iter()
            .map(|layer| self.bank.layer(*layer).sample_phase(phase))
            .collect();

        let mut field = vec![0.0f32; shape.slice_len()];
        for (layer, values) in NoiseLayer::ALL.iter().zip(&layers) {
            let w = layer.weight();
            for (acc, v) in field.iter_mut().zip(values) {
                *acc += w * v;
            }
        }
        min_max_normalize(&mut field);

        let cloud = &layers[2];
        let flow = &layers[4];
        let progress = if total > 0 {
            global as f32 / total as f32
        } else {
            0.0
        };
        let t = std::f32::consts::TAU * progress * s.distortion_frequency;
        let strength = s.distortion_px * state.amplitude;
        let pi = std::f32::consts::PI;

        let mut warped = Vec::with_capacity(field.len());
        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                let dx = strength * (2.0 * flow[i] - 1.0) * (t + pi * cloud[i]).sin();
                let dy = strength * (2.0 * cloud[i] - 1.0) * (t + pi * flow[i]).cos();
                warped.push(bilinear_sample_reflect(
                    &field,
                    width,
                    height,
                    x as f32 + dx,
                    y as f32 + dy,
                ));
            }
        }

        let mut image = gaussian_blur(&warped, width, height, s.blur_sigma, EdgeMode::Reflect);

        let gamma = s.gamma_base + state.haze * s.gamma_haze;
        for v in &mut image {
            *v = v.clamp(0.0, 1.0).powf(gamma);
        }

        let lut = self.primary.blend(self.secondary, state.warmth);
        lut.apply(&image, width as u32, height as u32)
    }

    /// Render every frame of a run in output order.
    ///
    /// `timestamps` are the sample times, one per feature sample. Frames
    /// check `cancel` before rendering; a cancelled run returns
    /// [`RenderError::Cancelled`].
    #[instrument(skip_all, fields(samples = features.len(), inbetweens = inbetweens))]
    pub fn render_all(
        &self,
        features: &FeatureSeries,
        timestamps: &[DateTime<Utc>],
        inbetweens: usize,
        cancel: &CancellationToken,
    ) -> RenderResult<Vec<Frame>> {
        if features.is_empty() {
            return Err(RenderError::EmptyFeatures);
        }
        if timestamps.len() != features.len() {
            return Err(RenderError::TimelineLength {
                expected: features.len(),
                actual: timestamps.len(),
            });
        }

        let schedule = FrameSchedule::new(features.len(), inbetweens);
        let total = schedule.len();
        let completed = AtomicUsize::new(0);
        let start = Instant::now();

        let indices: Vec<FrameIndex> = schedule.frames().collect();
        let frames = indices
            .into_par_iter()
            .map(|index| {
                if cancel.is_cancelled() {
                    return Err(RenderError::Cancelled {
                        completed: completed.load(Ordering::Relaxed),
                        total,
                    });
                }

                let state = features.interpolate(index.sample, index.alpha);
                let image = self.composite(state, index.global, index.total)?;
                let timestamp = frame_timestamp(timestamps, index);

                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 50 == 0 {
                    debug!(done, total, "Frames rendered");
                }

                Ok(Frame {
                    index,
                    timestamp,
                    features: state,
                    image,
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;

        info!(
            frames = frames.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Frames rendered"
        );
        Ok(frames)
    }
}

/// Sample time interpolated with the frame's alpha, held at the tail.
fn frame_timestamp(timestamps: &[DateTime<Utc>], index: FrameIndex) -> DateTime<Utc> {
    let i = index.sample.min(timestamps.len() - 1);
    match timestamps.get(i + 1) {
        Some(next) if index.alpha > 0.0 => interpolate_timestamp(timestamps[i], *next, index.alpha),
        _ => timestamps[i],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_len_and_order() {
        let schedule = FrameSchedule::new(3, 2);
        assert_eq!(schedule.len(), 9);

        let frames: Vec<FrameIndex> = schedule.frames().collect();
        assert_eq!(frames.len(), 9);
        assert_eq!(frames[0].sample, 0);
        assert_eq!(frames[0].alpha, 0.0);
        assert_eq!(frames[4].sample, 1);
        assert!((frames[4].alpha - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(frames[8].global, 8);
        assert!(frames.iter().all(|f| f.total == 9));
    }

    #[test]
    fn test_schedule_without_inbetweens() {
        let schedule = FrameSchedule::new(4, 0);
        assert_eq!(schedule.len(), 4);
        for (i, frame) in schedule.frames().enumerate() {
            assert_eq!(frame.sample, i);
            assert_eq!(frame.alpha, 0.0);
        }
        assert!(schedule.get(4).is_none());
    }

    #[test]
    fn test_frame_timestamp_interpolates() {
        use chrono::{Duration, TimeZone};
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let ts = vec![t0, t0 + Duration::hours(1)];
        let mid = FrameIndex {
            sample: 0,
            alpha: 0.5,
            global: 1,
            total: 4,
        };
        assert_eq!(frame_timestamp(&ts, mid), t0 + Duration::minutes(30));

        let tail = FrameIndex {
            sample: 1,
            alpha: 0.5,
            global: 3,
            total: 4,
        };
        assert_eq!(frame_timestamp(&ts, tail), ts[1]);
    }
}
