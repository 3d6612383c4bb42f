//! Color lookup tables built from named three-stop presets.
//!
//! A preset is three anchor colors joined by two linear segments
//! (`[0, 0.5]` and `[0.5, 1]`). Each preset also names an accent policy,
//! which tints the highlight end of the ramp. The policies are tuned per
//! preset and deliberately do not share a formula.

use image::{Rgb, RgbImage};
use tracing::warn;

use crate::error::{RenderError, RenderResult};

/// Default LUT length.
pub const DEFAULT_LUT_SIZE: usize = 512;

/// Named palette presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteName {
    Dusk,
    Coral,
    Twilight,
    Deepsea,
}

impl PaletteName {
    pub const ALL: [PaletteName; 4] = [
        PaletteName::Dusk,
        PaletteName::Coral,
        PaletteName::Twilight,
        PaletteName::Deepsea,
    ];

    /// Fallback for unknown names.
    pub const DEFAULT: PaletteName = PaletteName::Dusk;

    pub fn as_str(&self) -> &'static str {
        self.preset().name
    }

    /// Exact (case-insensitive) lookup.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
    }

    /// Lookup that never fails: unknown names resolve to [`Self::DEFAULT`].
    pub fn resolve(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            warn!(
                palette = %name,
                fallback = Self::DEFAULT.as_str(),
                "Unknown palette, using default"
            );
            Self::DEFAULT
        })
    }

    pub fn preset(&self) -> &'static PalettePreset {
        match self {
            PaletteName::Dusk => &PRESETS[0],
            PaletteName::Coral => &PRESETS[1],
            PaletteName::Twilight => &PRESETS[2],
            PaletteName::Deepsea => &PRESETS[3],
        }
    }
}

impl std::fmt::Display for PaletteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How accent strength bends the highlight end of a ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccentPolicy {
    /// Warm red only in the top 10% of the ramp, plus a brightness lift.
    /// Weight `max(0, (t - 0.9) * 10)^2`.
    TopWarmRed,
    /// Low-saturation cool highlight over the whole ramp. Weight `t^3`.
    CoolHighlight,
    /// Warm highlight with a brightness lift. Weight `t^2`.
    WarmHighlight,
}

impl AccentPolicy {
    /// Apply the accent to `lut` in place. `accent` is clamped to `[0, 1]`.
    pub fn apply(&self, lut: &mut [[f32; 3]], accent: f32) {
        let accent = accent.clamp(0.0, 1.0);
        if accent.is_nan() || accent <= 0.0 || lut.is_empty() {
            return;
        }

        let n = lut.len();
        for (i, rgb) in lut.iter_mut().enumerate() {
            let t = position(i, n);
            match self {
                AccentPolicy::TopWarmRed => {
                    const WARM_RED: [f32; 3] = [1.0, 0.4, 0.3];
                    let w = ((t - 0.9) * 10.0).max(0.0).powi(2);
                    pull_toward(rgb, WARM_RED, w * accent * 0.8);
                    pull_toward(rgb, [1.0; 3], w * accent * 0.6);
                }
                AccentPolicy::CoolHighlight => {
                    const COOL: [f32; 3] = [0.8, 0.9, 1.0];
                    let w = t.powi(3);
                    pull_toward(rgb, COOL, w * accent * 0.3);
                }
                AccentPolicy::WarmHighlight => {
                    const WARM: [f32; 3] = [1.0, 0.7, 0.5];
                    let w = t.powi(2);
                    pull_toward(rgb, WARM, w * accent * 0.5);
                    pull_toward(rgb, [1.0; 3], w * accent * 0.2);
                }
            }
        }
    }
}

#[inline]
fn pull_toward(rgb: &mut [f32; 3], target: [f32; 3], amount: f32) {
    for c in 0..3 {
        rgb[c] += (target[c] - rgb[c]) * amount;
    }
}

/// Position of entry `i` in a ramp of `n` entries, `0..=1` inclusive.
#[inline]
fn position(i: usize, n: usize) -> f32 {
    if n <= 1 {
        0.0
    } else {
        i as f32 / (n - 1) as f32
    }
}

/// Three anchor colors plus the accent policy of a named palette.
#[derive(Debug, Clone, PartialEq)]
pub struct PalettePreset {
    pub name: &'static str,
    /// Low, middle and high anchors (sRGB bytes)
    pub anchors: [[u8; 3]; 3],
    pub accent: AccentPolicy,
}

impl PalettePreset {
    /// Anchors scaled to `[0, 1]`.
    pub fn anchors01(&self) -> [[f32; 3]; 3] {
        self.anchors
            .map(|rgb| rgb.map(|c| c as f32 / 255.0))
    }
}

/// Preset table. Adding a palette means adding one entry here and one
/// variant to [`PaletteName`].
pub static PRESETS: [PalettePreset; 4] = [
    PalettePreset {
        name: "dusk",
        // cold deep blue, cool blue-violet, warm highlight
        anchors: [[30, 45, 80], [60, 70, 120], [180, 80, 100]],
        accent: AccentPolicy::TopWarmRed,
    },
    PalettePreset {
        name: "coral",
        // mist blue, light orange, coral red
        anchors: [[76, 98, 130], [230, 170, 120], [242, 120, 100]],
        accent: AccentPolicy::WarmHighlight,
    },
    PalettePreset {
        name: "twilight",
        // blue-green, violet, magenta
        anchors: [[40, 120, 140], [70, 60, 120], [200, 80, 160]],
        accent: AccentPolicy::WarmHighlight,
    },
    PalettePreset {
        name: "deepsea",
        // deep sea blue, cyan-green, sea mist gray
        anchors: [[20, 40, 80], [40, 80, 100], [120, 130, 140]],
        accent: AccentPolicy::CoolHighlight,
    },
];

/// An RGB ramp with entries in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteLut {
    colors: Vec<[f32; 3]>,
}

impl PaletteLut {
    /// Build the LUT of `palette` with `size` entries (at least 1).
    pub fn build(palette: PaletteName, size: usize, accent: f32) -> Self {
        let preset = palette.preset();
        let [c0, c1, c2] = preset.anchors01();
        let n = size.max(1);

        let mut colors: Vec<[f32; 3]> = (0..n)
            .map(|i| {
                let t = position(i, n);
                let mut rgb = [0.0f32; 3];
                for c in 0..3 {
                    rgb[c] = if t < 0.5 {
                        let u = t * 2.0;
                        (1.0 - u) * c0[c] + u * c1[c]
                    } else {
                        let u = (t - 0.5) * 2.0;
                        (1.0 - u) * c1[c] + u * c2[c]
                    };
                }
                rgb
            })
            .collect();

        preset.accent.apply(&mut colors, accent);

        for rgb in &mut colors {
            for c in rgb.iter_mut() {
                *c = c.clamp(0.0, 1.0);
            }
        }

        Self { colors }
    }

    /// Build a palette by name; unknown names fall back to the default.
    pub fn by_name(name: &str, size: usize, accent: f32) -> Self {
        Self::build(PaletteName::resolve(name), size, accent)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[f32; 3]] {
        &self.colors
    }

    /// Per-channel linear blend: `self * (1 - alpha) + other * alpha`.
    ///
    /// Both LUTs must have the same length; a shorter `other` is sampled
    /// proportionally.
    pub fn blend(&self, other: &PaletteLut, alpha: f32) -> PaletteLut {
        let alpha = alpha.clamp(0.0, 1.0);
        let n = self.colors.len();
        let colors = self
            .colors
            .iter()
            .enumerate()
            .map(|(i, a)| {
                let b = other.colors[other.index_at(position(i, n))];
                [
                    a[0] * (1.0 - alpha) + b[0] * alpha,
                    a[1] * (1.0 - alpha) + b[1] * alpha,
                    a[2] * (1.0 - alpha) + b[2] * alpha,
                ]
            })
            .collect();
        PaletteLut { colors }
    }

    /// LUT index for a scalar in `[0, 1]`: `round((n - 1) * value)`,
    /// clamped. NaN maps to 0.
    #[inline]
    pub fn index_at(&self, value: f32) -> usize {
        let v = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        };
        let max = self.colors.len().saturating_sub(1);
        ((max as f32 * v).round() as usize).min(max)
    }

    /// Color for a scalar in `[0, 1]` as sRGB bytes.
    #[inline]
    pub fn color_at(&self, value: f32) -> [u8; 3] {
        self.colors[self.index_at(value)].map(to_byte)
    }

    /// Map a row-major `[0, 1]` scalar image through the LUT.
    ///
    /// Out-of-range and NaN values are clamped, never rejected. A scalar
    /// image whose length is not `width * height` is an error.
    pub fn apply(&self, image01: &[f32], width: u32, height: u32) -> RenderResult<RgbImage> {
        if image01.len() != width as usize * height as usize {
            return Err(RenderError::InvalidShape {
                width: width as usize,
                height: height as usize,
            });
        }
        let mut img = RgbImage::new(width, height);
        for (pixel, &value) in img.pixels_mut().zip(image01.iter()) {
            *pixel = Rgb(self.color_at(value));
        }
        Ok(img)
    }
}

#[inline]
fn to_byte(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}
