//! Scalar-field filters shared by the feature mapper, the noise bank and the
//! compositor.
//!
//! All 2-D data is row-major `f32` (`index = y * width + x`).

/// How a filter reads samples that fall outside the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMode {
    /// Repeat the edge sample (`a a a | a b c d | d d d`).
    Nearest,
    /// Mirror including the edge sample (`b a | a b c d | d c`).
    Reflect,
    /// Periodic (`c d | a b c d | a b`).
    Wrap,
}

impl EdgeMode {
    /// Map a possibly out-of-range integer index into `0..len`.
    #[inline]
    pub fn resolve(self, index: isize, len: usize) -> usize {
        debug_assert!(len > 0);
        let n = len as isize;
        match self {
            EdgeMode::Nearest => index.clamp(0, n - 1) as usize,
            EdgeMode::Wrap => index.rem_euclid(n) as usize,
            EdgeMode::Reflect => {
                let m = index.rem_euclid(2 * n);
                if m < n {
                    m as usize
                } else {
                    (2 * n - 1 - m) as usize
                }
            }
        }
    }
}

/// Kernel radius is `truncate * sigma` rounded, as in the usual
/// scientific-computing convention.
const TRUNCATE: f32 = 4.0;

/// Upper bound on the radius of a free-standing kernel.
pub const MAX_KERNEL_RADIUS: usize = 1 << 12;

/// Tail weights beyond this many taps are summed on a coarser grid.
const TAIL_SAMPLES: usize = 1024;

/// Full radius for `sigma`, or `None` when no smoothing applies.
///
/// NaN, infinite and non-positive sigmas all disable smoothing.
fn kernel_radius(sigma: f32) -> Option<usize> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return None;
    }
    Some((TRUNCATE as f64 * sigma as f64 + 0.5) as usize)
}

/// Normalised 1-D Gaussian kernel, radius at most [`MAX_KERNEL_RADIUS`].
///
/// A non-positive or non-finite `sigma` yields the identity kernel `[1.0]`.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    bounded_gaussian_kernel(sigma, MAX_KERNEL_RADIUS)
}

/// Normalised 1-D Gaussian kernel with radius capped at `max_radius`.
///
/// The weight of every tap past the cap is added to the outermost tap on
/// its side. Under [`EdgeMode::Nearest`] with `max_radius >= len - 1` the
/// dropped taps would all read the edge sample, so the capped kernel gives
/// the same result as the full one.
pub fn bounded_gaussian_kernel(sigma: f32, max_radius: usize) -> Vec<f32> {
    let Some(full_radius) = kernel_radius(sigma) else {
        return vec![1.0];
    };
    let radius = full_radius.min(max_radius);
    if radius == 0 {
        return vec![1.0];
    }

    let denom = 2.0 * sigma as f64 * sigma as f64;
    let weight = |k: f64| (-(k * k) / denom).exp();

    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| weight(i as f64 - radius as f64))
        .collect();
    if full_radius > radius {
        let tail = tail_weight(radius + 1, full_radius, weight);
        kernel[0] += tail;
        kernel[2 * radius] += tail;
    }

    let sum: f64 = kernel.iter().sum();
    kernel.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Sum of `weight(k)` for integer `k` in `from..=to`.
///
/// Long ranges are summed at [`TAIL_SAMPLES`] midpoints scaled by the
/// stride; the Gaussian varies slowly on that scale.
fn tail_weight(from: usize, to: usize, weight: impl Fn(f64) -> f64) -> f64 {
    let count = (to - from + 1) as f64;
    let samples = count.min(TAIL_SAMPLES as f64);
    let stride = count / samples;
    (0..samples as usize)
        .map(|j| weight(from as f64 + j as f64 * stride + (stride - 1.0) / 2.0) * stride)
        .sum()
}

/// 1-D Gaussian smoothing of a sequence.
///
/// Output length always equals input length. The kernel never reaches
/// further than the sequence is long.
pub fn gaussian_filter1d(values: &[f32], sigma: f32, mode: EdgeMode) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    let kernel = bounded_gaussian_kernel(sigma, values.len());
    if kernel.len() == 1 {
        return values.to_vec();
    }
    convolve_line(values, &kernel, mode)
}

fn convolve_line(values: &[f32], kernel: &[f32], mode: EdgeMode) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let len = values.len();
    (0..len as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[mode.resolve(i + k as isize - radius, len)])
                .sum()
        })
        .collect()
}

/// Separable 2-D Gaussian blur.
pub fn gaussian_blur(
    data: &[f32],
    width: usize,
    height: usize,
    sigma: f32,
    mode: EdgeMode,
) -> Vec<f32> {
    let kernel = bounded_gaussian_kernel(sigma, width.max(height));
    if kernel.len() == 1 || width == 0 || height == 0 {
        return data.to_vec();
    }

    // Rows
    let mut horizontal = Vec::with_capacity(data.len());
    for row in data.chunks_exact(width) {
        horizontal.extend(convolve_line(row, &kernel, mode));
    }

    // Columns
    let radius = (kernel.len() / 2) as isize;
    let mut output = vec![0.0f32; data.len()];
    for x in 0..width {
        for y in 0..height {
            let mut acc = 0.0f32;
            for (k, w) in kernel.iter().enumerate() {
                let sy = mode.resolve(y as isize + k as isize - radius, height);
                acc += w * horizontal[sy * width + x];
            }
            output[y * width + x] = acc;
        }
    }
    output
}

/// Guard for min-max normalisation of (nearly) constant data.
pub const NORMALIZE_EPSILON: f32 = 1e-8;

/// Rescale `data` in place to `[0, 1]` using its own min and max.
///
/// The denominator is `max - min + ε`, so constant input becomes all zeros
/// instead of dividing by zero. NaN entries are ignored for the range and
/// left as NaN.
pub fn min_max_normalize(data: &mut [f32]) {
    let (min, max) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() || !max.is_finite() {
        return;
    }
    let range = max - min + NORMALIZE_EPSILON;
    for v in data.iter_mut() {
        *v = (*v - min) / range;
    }
}

/// Mirror a continuous coordinate into `[0, len - 1]` about the edge
/// sample centres.
#[inline]
pub fn reflect_coordinate(coord: f32, len: usize) -> f32 {
    if len <= 1 {
        return 0.0;
    }
    let max = (len - 1) as f32;
    let period = 2.0 * max;
    let m = coord.rem_euclid(period);
    if m <= max {
        m
    } else {
        period - m
    }
}

/// Bilinear interpolation at a fractional position with edge reflection.
///
/// # Arguments
/// - `data`: Input grid (row-major order)
/// - `width`, `height`: Grid dimensions
/// - `x`, `y`: Sample position in pixel coordinates, may be out of bounds
pub fn bilinear_sample_reflect(data: &[f32], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x = reflect_coordinate(x, width);
    let y = reflect_coordinate(y, height);

    let x1 = x.floor() as usize;
    let y1 = y.floor() as usize;
    let x2 = (x1 + 1).min(width - 1);
    let y2 = (y1 + 1).min(height - 1);

    let dx = x - x1 as f32;
    let dy = y - y1 as f32;

    // Get the four surrounding values
    let v11 = data[y1 * width + x1];
    let v21 = data[y1 * width + x2];
    let v12 = data[y2 * width + x1];
    let v22 = data[y2 * width + x2];

    // Interpolate
    let v1 = v11 * (1.0 - dx) + v21 * dx;
    let v2 = v12 * (1.0 - dx) + v22 * dx;
    v1 * (1.0 - dy) + v2 * dy
}
