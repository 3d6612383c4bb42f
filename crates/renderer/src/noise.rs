//! Cyclic procedural noise fields.
//!
//! A [`NoiseField`] is `steps` slices of `height × width` scalars that loop:
//! slice `steps` is slice `0` again. All slices share one min-max
//! normalisation so brightness is comparable over time.
//!
//! Generation goes through a [`NoiseGenerator`] strategy chosen once at
//! startup:
//! - [`CoherentNoise`] (feature `coherent-noise`): 4-D Perlin fBm walked
//!   around a circle in the last two dimensions, which closes the loop
//!   without a seam.
//! - [`BlurredRandomNoise`]: a seeded uniform field, Gaussian-blurred and
//!   rolled horizontally one step per slice. Lower quality, no extra
//!   dependency.

use std::str::FromStr;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::error::{RenderError, RenderResult};
use crate::filters::{gaussian_blur, min_max_normalize, EdgeMode};

/// Default number of slices in one loop.
pub const DEFAULT_STEPS: usize = 96;

/// Shape of a noise field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub height: usize,
    pub width: usize,
    pub steps: usize,
}

impl FieldShape {
    pub fn new(height: usize, width: usize, steps: usize) -> Self {
        Self {
            height,
            width,
            steps,
        }
    }

    pub fn slice_len(&self) -> usize {
        self.height * self.width
    }

    pub fn total_len(&self) -> usize {
        self.slice_len() * self.steps
    }

    fn validate(&self) -> RenderResult<()> {
        if self.height == 0 || self.width == 0 || self.steps == 0 {
            return Err(RenderError::InvalidShape {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Seed and fractal parameters of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub seed: u32,
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
    /// Spatial frequency of the first octave, in cycles per pixel
    pub scale: f64,
}

/// The five layers every render uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoiseLayer {
    /// Base structure
    Terrain,
    /// Secondary structure
    Ridge,
    Cloud,
    /// High-frequency detail
    Ripple,
    /// Drives the distortion warp
    Flow,
}

impl NoiseLayer {
    pub const ALL: [NoiseLayer; 5] = [
        NoiseLayer::Terrain,
        NoiseLayer::Ridge,
        NoiseLayer::Cloud,
        NoiseLayer::Ripple,
        NoiseLayer::Flow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NoiseLayer::Terrain => "terrain",
            NoiseLayer::Ridge => "ridge",
            NoiseLayer::Cloud => "cloud",
            NoiseLayer::Ripple => "ripple",
            NoiseLayer::Flow => "flow",
        }
    }

    pub fn params(&self) -> NoiseParams {
        let (seed, octaves, persistence, lacunarity, scale) = match self {
            NoiseLayer::Terrain => (42, 4, 0.55, 2.0, 0.045),
            NoiseLayer::Ridge => (99, 5, 0.50, 2.1, 0.070),
            NoiseLayer::Cloud => (7, 3, 0.60, 2.0, 0.030),
            NoiseLayer::Ripple => (1234, 6, 0.45, 2.3, 0.160),
            NoiseLayer::Flow => (2024, 2, 0.65, 2.0, 0.020),
        };
        NoiseParams {
            seed,
            octaves,
            persistence,
            lacunarity,
            scale,
        }
    }

    /// Weight in the composited scalar field. The five weights sum to 1.
    pub fn weight(&self) -> f32 {
        match self {
            NoiseLayer::Terrain => 0.50,
            NoiseLayer::Ridge => 0.18,
            NoiseLayer::Cloud => 0.18,
            NoiseLayer::Ripple => 0.08,
            NoiseLayer::Flow => 0.06,
        }
    }

    fn position(&self) -> usize {
        match self {
            NoiseLayer::Terrain => 0,
            NoiseLayer::Ridge => 1,
            NoiseLayer::Cloud => 2,
            NoiseLayer::Ripple => 3,
            NoiseLayer::Flow => 4,
        }
    }
}

/// Produces the raw (unnormalised) slices of one field.
///
/// Implementations must be deterministic in `(shape, params)`.
pub trait NoiseGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// All slices, concatenated, `shape.total_len()` values.
    fn generate(&self, shape: FieldShape, params: &NoiseParams) -> Vec<f32>;
}

/// Radius of the loop traced through the last two noise dimensions.
#[cfg(feature = "coherent-noise")]
const LOOP_RADIUS: f64 = 1.25;

/// Fractal Perlin noise from the `noise` crate.
#[cfg(feature = "coherent-noise")]
#[derive(Debug, Clone, Copy, Default)]
pub struct CoherentNoise;

#[cfg(feature = "coherent-noise")]
impl CoherentNoise {
    fn slice(
        perlin: &::noise::Perlin,
        shape: FieldShape,
        params: &NoiseParams,
        step: usize,
    ) -> Vec<f32> {
        use ::noise::NoiseFn;

        let theta = std::f64::consts::TAU * step as f64 / shape.steps as f64;
        let (u, v) = (LOOP_RADIUS * theta.cos(), LOOP_RADIUS * theta.sin());

        let mut out = Vec::with_capacity(shape.slice_len());
        for y in 0..shape.height {
            for x in 0..shape.width {
                let px = x as f64 * params.scale;
                let py = y as f64 * params.scale;

                let mut value = 0.0_f64;
                let mut amp = 1.0_f64;
                let mut freq = 1.0_f64;
                for _ in 0..params.octaves {
                    value += amp * perlin.get([px * freq, py * freq, u * freq, v * freq]);
                    amp *= params.persistence;
                    freq *= params.lacunarity;
                }
                out.push(value as f32);
            }
        }
        out
    }
}

#[cfg(feature = "coherent-noise")]
impl NoiseGenerator for CoherentNoise {
    fn name(&self) -> &'static str {
        "coherent"
    }

    fn generate(&self, shape: FieldShape, params: &NoiseParams) -> Vec<f32> {
        let perlin = ::noise::Perlin::new(params.seed);
        let slices: Vec<Vec<f32>> = (0..shape.steps)
            .into_par_iter()
            .map(|step| Self::slice(&perlin, shape, params, step))
            .collect();
        slices.concat()
    }
}

/// Blur radius of the fallback generator, in pixels.
pub const BLUR_SIGMA: f32 = 6.0;

/// Seeded uniform noise, blurred and scrolled. Ignores the fractal
/// parameters; only the seed matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlurredRandomNoise;

impl NoiseGenerator for BlurredRandomNoise {
    fn name(&self) -> &'static str {
        "blurred"
    }

    fn generate(&self, shape: FieldShape, params: &NoiseParams) -> Vec<f32> {
        let FieldShape {
            height,
            width,
            steps,
        } = shape;

        let mut rng = ChaCha8Rng::seed_from_u64(params.seed as u64);
        let base: Vec<f32> = (0..height * width).map(|_| rng.gen::<f32>()).collect();
        let base = gaussian_blur(&base, width, height, BLUR_SIGMA, EdgeMode::Wrap);

        let mut out = Vec::with_capacity(shape.total_len());
        for step in 0..steps {
            let shift = step * width / steps;
            for row in base.chunks_exact(width) {
                out.extend_from_slice(&row[shift..]);
                out.extend_from_slice(&row[..shift]);
            }
        }
        out
    }
}

/// Which generator to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseBackend {
    #[default]
    Coherent,
    Blurred,
}

impl NoiseBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseBackend::Coherent => "coherent",
            NoiseBackend::Blurred => "blurred",
        }
    }

    /// Build the generator. Asking for coherent noise in a build without
    /// the `coherent-noise` feature degrades to blurred noise.
    pub fn generator(self) -> Box<dyn NoiseGenerator> {
        match self {
            #[cfg(feature = "coherent-noise")]
            NoiseBackend::Coherent => Box::new(CoherentNoise),
            #[cfg(not(feature = "coherent-noise"))]
            NoiseBackend::Coherent => {
                tracing::warn!(
                    requested = "coherent",
                    fallback = "blurred",
                    "Coherent noise not compiled in, using blurred random noise"
                );
                Box::new(BlurredRandomNoise)
            }
            NoiseBackend::Blurred => Box::new(BlurredRandomNoise),
        }
    }
}

impl FromStr for NoiseBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coherent" | "perlin" => Ok(NoiseBackend::Coherent),
            "blurred" | "random" => Ok(NoiseBackend::Blurred),
            other => Err(format!(
                "unknown noise backend '{}', expected 'coherent' or 'blurred'",
                other
            )),
        }
    }
}

impl std::fmt::Display for NoiseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, normalised, cyclic sequence of slices.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseField {
    name: &'static str,
    shape: FieldShape,
    data: Vec<f32>,
}

impl NoiseField {
    /// Generate and jointly normalise a field.
    pub fn generate(
        name: &'static str,
        shape: FieldShape,
        params: &NoiseParams,
        generator: &dyn NoiseGenerator,
    ) -> RenderResult<Self> {
        shape.validate()?;

        let mut data = generator.generate(shape, params);
        let actual = data.len() / shape.slice_len();
        if data.len() != shape.total_len() {
            return Err(RenderError::ShapeMismatch {
                name,
                expected: (shape.steps, shape.height, shape.width),
                actual: (actual, shape.height, shape.width),
            });
        }
        min_max_normalize(&mut data);

        Ok(Self { name, shape, data })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    pub fn steps(&self) -> usize {
        self.shape.steps
    }

    /// Slice `step`, wrapping past the end of the loop.
    pub fn slice(&self, step: usize) -> &[f32] {
        let len = self.shape.slice_len();
        let start = (step % self.shape.steps) * len;
        &self.data[start..start + len]
    }

    /// Every value of every slice.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Field at a continuous phase: the two bracketing slices blended by
    /// the fractional part. Phase wraps modulo `steps`.
    pub fn sample_phase(&self, phase: f32) -> Vec<f32> {
        let steps = self.shape.steps;
        let phase = if phase.is_finite() {
            phase.rem_euclid(steps as f32)
        } else {
            0.0
        };
        let lo = (phase.floor() as usize) % steps;
        let hi = (lo + 1) % steps;
        let frac = phase - phase.floor();

        let a = self.slice(lo);
        if frac == 0.0 {
            return a.to_vec();
        }
        let b = self.slice(hi);
        a.iter()
            .zip(b)
            .map(|(&a, &b)| a * (1.0 - frac) + b * frac)
            .collect()
    }
}

/// The five fields of one render run.
#[derive(Debug, Clone)]
pub struct NoiseBank {
    shape: FieldShape,
    backend: &'static str,
    fields: Vec<NoiseField>,
}

impl NoiseBank {
    /// Generate every layer of [`NoiseLayer::ALL`].
    #[instrument(skip(generator), fields(backend = generator.name()))]
    pub fn generate(shape: FieldShape, generator: &dyn NoiseGenerator) -> RenderResult<Self> {
        let start = Instant::now();

        let fields = NoiseLayer::ALL
            .par_iter()
            .map(|layer| {
                let field = NoiseField::generate(layer.name(), shape, &layer.params(), generator)?;
                debug!(layer = layer.name(), "Noise layer ready");
                Ok(field)
            })
            .collect::<RenderResult<Vec<_>>>()?;

        info!(
            layers = fields.len(),
            width = shape.width,
            height = shape.height,
            steps = shape.steps,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Noise bank generated"
        );

        Ok(Self {
            shape,
            backend: generator.name(),
            fields,
        })
    }

    pub fn shape(&self) -> FieldShape {
        self.shape
    }

    /// Name of the generator that produced the bank.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn layer(&self, layer: NoiseLayer) -> &NoiseField {
        &self.fields[layer.position()]
    }

    pub fn fields(&self) -> &[NoiseField] {
        &self.fields
    }
}
