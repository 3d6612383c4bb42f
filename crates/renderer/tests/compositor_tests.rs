//! Tests for frame compositing and scheduling.

use renderer::compositor::{Compositor, FrameSchedule};
use renderer::features::{map_features, FeatureState};
use renderer::noise::{BlurredRandomNoise, FieldShape, NoiseBank};
use renderer::palette::{PaletteLut, PaletteName, DEFAULT_LUT_SIZE};
use renderer::RenderError;
use test_utils::{alternating_temperature, calm_half_day, diurnal_series};
use tokio_util::sync::CancellationToken;

struct Fixture {
    bank: NoiseBank,
    primary: PaletteLut,
    secondary: PaletteLut,
}

impl Fixture {
    fn new() -> Self {
        Self {
            bank: NoiseBank::generate(FieldShape::new(12, 24, 6), &BlurredRandomNoise).unwrap(),
            primary: PaletteLut::build(PaletteName::Dusk, DEFAULT_LUT_SIZE, 0.2),
            secondary: PaletteLut::build(PaletteName::Coral, DEFAULT_LUT_SIZE, 0.2),
        }
    }

    fn compositor(&self) -> Compositor<'_> {
        Compositor::new(&self.bank, &self.primary, &self.secondary)
    }
}

// ============================================================================
// Frame sequence
// ============================================================================

#[test]
fn test_frame_count() {
    let fixture = Fixture::new();
    let series = alternating_temperature();
    let features = map_features(&series, 1.0);

    for inbetweens in [0, 1, 3] {
        let frames = fixture
            .compositor()
            .render_all(&features, series.timestamps(), inbetweens, &CancellationToken::new())
            .unwrap();
        assert_eq!(frames.len(), series.len() * (inbetweens + 1));
    }
}

#[test]
fn test_frames_are_in_order() {
    let fixture = Fixture::new();
    let series = calm_half_day();
    let features = map_features(&series, 1.0);
    let frames = fixture
        .compositor()
        .render_all(&features, series.timestamps(), 2, &CancellationToken::new())
        .unwrap();

    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index.global, i);
    }
    assert!(frames.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(frames[0].timestamp, series.first_timestamp());
}

#[test]
fn test_no_inbetweens_uses_exact_features() {
    let fixture = Fixture::new();
    let series = alternating_temperature();
    let features = map_features(&series, 0.0);
    let frames = fixture
        .compositor()
        .render_all(&features, series.timestamps(), 0, &CancellationToken::new())
        .unwrap();

    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index.alpha, 0.0);
        assert_eq!(frame.features, features.state(i));
        assert_eq!(frame.timestamp, series.timestamps()[i]);
    }
}

#[test]
fn test_inbetween_features_interpolate() {
    let fixture = Fixture::new();
    let series = alternating_temperature();
    let features = map_features(&series, 0.0);
    let frames = fixture
        .compositor()
        .render_all(&features, series.timestamps(), 1, &CancellationToken::new())
        .unwrap();

    // Frame 1 sits halfway between amplitude 0.25 and 1.0
    assert!((frames[1].features.amplitude - 0.625).abs() < 1e-6);
    // Tail frames hold the last sample
    let last = frames.len() - 1;
    assert_eq!(frames[last].features, features.state(series.len() - 1));
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_frame_dimensions() {
    let fixture = Fixture::new();
    let compositor = fixture.compositor();
    let features = map_features(&calm_half_day(), 1.0);
    let schedule = FrameSchedule::new(features.len(), 0);
    let index = schedule.get(3).unwrap();

    let image = compositor.render_frame(&features, index).unwrap();
    assert_eq!(image.dimensions(), (24, 12));
    assert_eq!(compositor.dimensions(), (24, 12));
}

#[test]
fn test_render_is_deterministic() {
    let fixture = Fixture::new();
    let compositor = fixture.compositor();
    let state = FeatureState {
        amplitude: 0.8,
        drift: 0.4,
        haze: 0.6,
        warmth: 0.3,
    };
    assert_eq!(
        compositor.composite(state, 5, 20).unwrap(),
        compositor.composite(state, 5, 20).unwrap()
    );
}

#[test]
fn test_warmth_shifts_colors() {
    let fixture = Fixture::new();
    let compositor = fixture.compositor();
    let cold = FeatureState {
        amplitude: 0.5,
        drift: 0.5,
        haze: 0.5,
        warmth: 0.0,
    };
    let warm = FeatureState { warmth: 1.0, ..cold };
    assert_ne!(
        compositor.composite(cold, 0, 10).unwrap(),
        compositor.composite(warm, 0, 10).unwrap()
    );
}

#[test]
fn test_phase_wraps() {
    let fixture = Fixture::new();
    let compositor = fixture.compositor();
    let steps = fixture.bank.shape().steps as f32;
    for global in 0..50 {
        let phase = compositor.phase(1.0, global);
        assert!((0.0..steps).contains(&phase));
    }
    assert_eq!(compositor.phase(0.0, 100), 0.0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_cancelled_render() {
    let fixture = Fixture::new();
    let series = diurnal_series(1, 9);
    let features = map_features(&series, 1.0);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fixture
        .compositor()
        .render_all(&features, series.timestamps(), 2, &cancel);
    assert!(matches!(result, Err(RenderError::Cancelled { total: 72, .. })));
}

#[test]
fn test_timeline_length_mismatch() {
    let fixture = Fixture::new();
    let series = calm_half_day();
    let features = map_features(&series, 1.0);

    let result = fixture.compositor().render_all(
        &features,
        &series.timestamps()[..3],
        0,
        &CancellationToken::new(),
    );
    assert!(matches!(
        result,
        Err(RenderError::TimelineLength {
            expected: 12,
            actual: 3
        })
    ));
}
