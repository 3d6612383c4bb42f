//! Benchmarks for the renderer crate - noise generation, compositing and
//! frame encoding.
//!
//! Run with: cargo bench --package renderer --bench render_benchmarks
//! Or a single group: cargo bench --package renderer -- noise_bank

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use renderer::compositor::Compositor;
use renderer::features::{map_features, FeatureState};
use renderer::noise::{BlurredRandomNoise, FieldShape, NoiseBackend, NoiseBank};
use renderer::palette::{PaletteLut, PaletteName, DEFAULT_LUT_SIZE};
use renderer::png;
use test_utils::diurnal_series;

/// Output sizes worth tracking: the default frame and a 2x frame.
const SIZES: [(usize, usize); 2] = [(320, 120), (640, 240)];

fn luts() -> (PaletteLut, PaletteLut) {
    (
        PaletteLut::build(PaletteName::Dusk, DEFAULT_LUT_SIZE, 0.2),
        PaletteLut::build(PaletteName::Coral, DEFAULT_LUT_SIZE, 0.2),
    )
}

// =============================================================================
// NOISE BANK BENCHMARKS
// =============================================================================

fn bench_noise_bank(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_bank");
    group.sample_size(10);

    // A short loop keeps one iteration under a few seconds
    let steps = 8;
    for (width, height) in SIZES {
        let shape = FieldShape::new(height, width, steps);
        group.throughput(Throughput::Elements(shape.total_len() as u64 * 5));

        for backend in [NoiseBackend::Coherent, NoiseBackend::Blurred] {
            let generator = backend.generator();
            group.bench_with_input(
                BenchmarkId::new(backend.as_str(), format!("{}x{}", width, height)),
                &shape,
                |b, shape| b.iter(|| NoiseBank::generate(black_box(*shape), generator.as_ref())),
            );
        }
    }

    group.finish();
}

// =============================================================================
// COMPOSITING BENCHMARKS
// =============================================================================

fn bench_composite_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("composite_frame");
    let (primary, secondary) = luts();
    let state = FeatureState {
        amplitude: 0.7,
        drift: 0.4,
        haze: 0.5,
        warmth: 0.6,
    };

    for (width, height) in SIZES {
        let bank = NoiseBank::generate(FieldShape::new(height, width, 16), &BlurredRandomNoise)
            .expect("bench noise bank");
        let compositor = Compositor::new(&bank, &primary, &secondary);

        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_function(BenchmarkId::new("single", format!("{}x{}", width, height)), |b| {
            b.iter(|| compositor.composite(black_box(state), 17, 100).expect("bench frame"))
        });
    }

    group.finish();
}

fn bench_feature_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_mapping");

    for days in [1, 6, 16] {
        let series = diurnal_series(days, 42);
        group.throughput(Throughput::Elements(series.len() as u64));
        group.bench_with_input(BenchmarkId::new("map_features", days), &series, |b, series| {
            b.iter(|| map_features(black_box(series), 1.0))
        });
    }

    group.finish();
}

// =============================================================================
// PNG ENCODING BENCHMARKS
// =============================================================================

fn bench_png_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("png_encoding");
    let (primary, secondary) = luts();

    for (width, height) in SIZES {
        let bank = NoiseBank::generate(FieldShape::new(height, width, 4), &BlurredRandomNoise)
            .expect("bench noise bank");
        let compositor = Compositor::new(&bank, &primary, &secondary);
        let frame = compositor.composite(
            FeatureState {
                amplitude: 0.5,
                drift: 0.5,
                haze: 0.5,
                warmth: 0.5,
            },
            0,
            1,
        )
        .expect("bench frame");

        group.throughput(Throughput::Bytes((width * height * 3) as u64));
        group.bench_with_input(
            BenchmarkId::new("frame", format!("{}x{}", width, height)),
            &frame,
            |b, frame| b.iter(|| png::encode_frame_png(black_box(frame))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_noise_bank,
    bench_composite_frame,
    bench_feature_mapping,
    bench_png_encoding,
);
criterion_main!(benches);
