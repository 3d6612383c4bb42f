//! Procedural weather art rendering.
//!
//! Turns a [`WeatherSeries`](weather_common::WeatherSeries) into animated
//! frames:
//! - `features`: weather columns to bounded, smoothed feature channels
//! - `palette`: named color ramps with per-palette accents
//! - `noise`: cyclic multi-layer noise fields
//! - `compositor`: per-frame blending, warping and coloring
//! - `overlay`: optional text labels on finished frames
//! - `png`: frame encoding

pub mod compositor;
pub mod error;
pub mod features;
pub mod filters;
pub mod noise;
pub mod overlay;
pub mod palette;
pub mod png;

pub use compositor::{Compositor, CompositorSettings, Frame, FrameIndex, FrameSchedule};
pub use error::{RenderError, RenderResult};
pub use features::{map_features, Channel, FeatureSeries, FeatureState};
pub use noise::{FieldShape, NoiseBackend, NoiseBank, NoiseField, NoiseGenerator, NoiseLayer};
pub use overlay::{FrameLabels, Overlay};
pub use palette::{PaletteLut, PaletteName, DEFAULT_LUT_SIZE};
