//! End-to-end tests of the render pipeline with offline weather input.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use renderer::NoiseBackend;
use tempfile::TempDir;
use test_utils::{all_columns_missing, calm_half_day, diurnal_series};
use tokio_util::sync::CancellationToken;
use weather_art::sink::PngSequenceSink;
use weather_art::{
    render_frames, run, run_with_source, write_frames, OutputMode, OutputOptions, RenderOptions,
    RunConfig, SourceOptions,
};
use weather_common::{FetchWindow, Location, WeatherSeries};
use weather_source::{FetchRequest, FetchResult, WeatherSource};

/// Source that takes far longer than any test should wait.
struct StalledSource {
    calls: AtomicUsize,
}

#[async_trait]
impl WeatherSource for StalledSource {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn fetch(&self, _request: &FetchRequest) -> FetchResult<WeatherSeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(calm_half_day())
    }
}

fn small_render() -> RenderOptions {
    RenderOptions {
        width: 24,
        height: 12,
        steps: 6,
        inbetweens: 1,
        noise_backend: NoiseBackend::Blurred,
        ..RenderOptions::default()
    }
}

fn write_series(dir: &TempDir, series: &WeatherSeries) -> PathBuf {
    let path = dir.path().join("weather.json");
    std::fs::write(&path, serde_json::to_vec(series).unwrap()).unwrap();
    path
}

fn offline_config(dir: &TempDir, input: PathBuf, mode: OutputMode) -> RunConfig {
    RunConfig {
        location: Location::shenzhen(),
        window: FetchWindow::default(),
        source: SourceOptions {
            input: Some(input),
            cache_path: dir.path().join("cache.json"),
            cache_ttl: Duration::from_secs(60),
            max_retries: 1,
        },
        render: small_render(),
        output: OutputOptions {
            mode,
            out: dir.path().join("out/weather.mp4"),
            fps: 12,
            frames_dir: None,
            ffmpeg: PathBuf::from("/nonexistent/bin/ffmpeg-for-tests"),
            open_viewer: false,
        },
    }
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_render_frame_count_and_size() {
    let series = calm_half_day();
    let frames = render_frames(
        &series,
        &Location::shenzhen(),
        &small_render(),
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(frames.len(), series.len() * 2);
    assert!(frames.iter().all(|f| f.dimensions() == (24, 12)));
}

#[test]
fn test_overlay_changes_pixels() {
    let series = diurnal_series(1, 3);
    let location = Location::shenzhen();
    let cancel = CancellationToken::new();

    let plain = render_frames(
        &series,
        &location,
        &RenderOptions {
            width: 160,
            height: 60,
            overlay: false,
            ..small_render()
        },
        &cancel,
    )
    .unwrap();
    let labelled = render_frames(
        &series,
        &location,
        &RenderOptions {
            width: 160,
            height: 60,
            overlay: true,
            ..small_render()
        },
        &cancel,
    )
    .unwrap();

    assert_eq!(plain.len(), labelled.len());
    assert_ne!(plain[0], labelled[0]);
}

#[test]
fn test_unknown_palette_renders_like_default() {
    let series = calm_half_day();
    let location = Location::shenzhen();
    let cancel = CancellationToken::new();

    let render = |palette: &str| {
        render_frames(
            &series,
            &location,
            &RenderOptions {
                palette: palette.to_string(),
                overlay: false,
                ..small_render()
            },
            &cancel,
        )
        .unwrap()
    };

    assert_eq!(render("nonexistent"), render("dusk"));
}

#[test]
fn test_missing_columns_still_render() {
    let frames = render_frames(
        &all_columns_missing(6),
        &Location::shenzhen(),
        &small_render(),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(frames.len(), 12);
}

#[test]
fn test_cancelled_render_fails() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = render_frames(
        &calm_half_day(),
        &Location::shenzhen(),
        &small_render(),
        &cancel,
    );
    assert!(result.is_err());
}

// ============================================================================
// Full run
// ============================================================================

#[tokio::test]
async fn test_save_run_falls_back_to_gif() {
    let dir = TempDir::new().unwrap();
    let input = write_series(&dir, &calm_half_day());
    let mut config = offline_config(&dir, input, OutputMode::Save);
    config.output.frames_dir = Some(dir.path().join("frames"));

    let summary = run(config, CancellationToken::new()).await.unwrap();

    assert_eq!(summary.samples, 12);
    assert_eq!(summary.frames, 24);
    assert_eq!(summary.output, dir.path().join("out/weather.gif"));
    assert!(summary.output.exists());

    let frames_dir = dir.path().join("frames");
    assert!(PngSequenceSink::frame_path(&frames_dir, 0).exists());
    assert!(PngSequenceSink::frame_path(&frames_dir, 23).exists());
}

#[tokio::test]
async fn test_preview_run_writes_preview_gif() {
    let dir = TempDir::new().unwrap();
    let input = write_series(&dir, &calm_half_day());
    let config = offline_config(&dir, input, OutputMode::Preview);

    let summary = run(config, CancellationToken::new()).await.unwrap();
    assert_eq!(summary.output, dir.path().join("out/weather.preview.gif"));
    assert!(summary.output.exists());
}

#[tokio::test]
async fn test_interrupt_during_fetch_returns_promptly() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(&dir, dir.path().join("unused.json"), OutputMode::Save);
    let source = StalledSource {
        calls: AtomicUsize::new(0),
    };

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        interrupt.cancel();
    });

    let start = Instant::now();
    let err = tokio::time::timeout(
        Duration::from_secs(10),
        run_with_source(config, &source, cancel),
    )
    .await
    .expect("run must stop once cancelled")
    .unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(format!("{:#}", err).contains("cancelled while fetching"));
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_cancelled_write_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let output = OutputOptions {
        mode: OutputMode::Save,
        out: dir.path().join("out/weather.mp4"),
        frames_dir: Some(dir.path().join("frames")),
        ffmpeg: PathBuf::from("/nonexistent/bin/ffmpeg-for-tests"),
        open_viewer: false,
        ..OutputOptions::default()
    };
    let frames = vec![RgbImage::from_pixel(8, 4, Rgb([10, 20, 30])); 3];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let sink = output.sink(&cancel);
    let result = write_frames(&frames, &output, sink.as_ref(), &cancel);

    assert!(result.is_err());
    assert!(!dir.path().join("out/weather.gif").exists());
    assert!(!dir.path().join("frames").exists());
}

#[tokio::test]
async fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(&dir, dir.path().join("absent.json"), OutputMode::Save);

    let err = run(config, CancellationToken::new()).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to fetch weather"));
}
