//! End-to-end run: fetch, render, write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use image::RgbImage;
use rayon::prelude::*;
use renderer::noise::DEFAULT_STEPS;
use renderer::{
    map_features, Compositor, FieldShape, FrameLabels, NoiseBackend, NoiseBank, Overlay,
    PaletteLut, PaletteName, DEFAULT_LUT_SIZE,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use weather_common::{FetchWindow, Location, WeatherSeries};
use weather_source::{
    CachedSource, FetchRequest, FileSource, OpenMeteoClient, OpenMeteoConfig, RetryPolicy,
    WeatherCache, WeatherSource,
};

use crate::sink::{FallbackSink, FrameSink, PngSequenceSink, PreviewSink};

/// Where the weather comes from.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Offline JSON file; bypasses the network and the cache
    pub input: Option<PathBuf>,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub max_retries: u32,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            input: None,
            cache_path: PathBuf::from("out/weather_cache.json"),
            cache_ttl: Duration::from_secs(60 * 60),
            max_retries: RetryPolicy::default().max_attempts,
        }
    }
}

impl SourceOptions {
    pub fn build(&self) -> Result<Box<dyn WeatherSource>> {
        if let Some(input) = &self.input {
            info!(path = %input.display(), "Reading weather from file");
            return Ok(Box::new(FileSource::new(input)));
        }

        let client = OpenMeteoClient::new(OpenMeteoConfig::default())
            .context("Failed to build HTTP client")?;
        let cache = WeatherCache::new(&self.cache_path, self.cache_ttl);
        let policy = RetryPolicy {
            max_attempts: self.max_retries.max(1),
            ..RetryPolicy::default()
        };
        Ok(Box::new(CachedSource::new(client, cache, policy)))
    }
}

/// How frames are rendered.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub steps: usize,
    pub inbetweens: usize,
    pub sigma: f32,
    /// Palette name; unknown names fall back to the default palette
    pub palette: String,
    pub accent: f32,
    pub noise_backend: NoiseBackend,
    pub overlay: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 320,
            height: 120,
            steps: DEFAULT_STEPS,
            inbetweens: 2,
            sigma: 1.0,
            palette: PaletteName::DEFAULT.as_str().to_string(),
            accent: 0.2,
            noise_backend: NoiseBackend::default(),
            overlay: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Encode a video, falling back to GIF
    Save,
    /// Write a GIF preview and open it
    Preview,
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub mode: OutputMode,
    pub out: PathBuf,
    pub fps: u32,
    /// Also dump every frame as PNG here
    pub frames_dir: Option<PathBuf>,
    pub ffmpeg: PathBuf,
    /// Launch a viewer in preview mode
    pub open_viewer: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Preview,
            out: PathBuf::from("out/weather.mp4"),
            fps: 18,
            frames_dir: None,
            ffmpeg: PathBuf::from("ffmpeg"),
            open_viewer: true,
        }
    }
}

impl OutputOptions {
    /// Sink for the configured mode. A cancelled `cancel` stops the video
    /// fallback from running after an interrupted encode.
    pub fn sink(&self, cancel: &CancellationToken) -> Box<dyn FrameSink> {
        match self.mode {
            OutputMode::Save => {
                Box::new(FallbackSink::video(&self.ffmpeg).with_cancel(cancel.clone()))
            }
            OutputMode::Preview if self.open_viewer => Box::new(PreviewSink::new()),
            OutputMode::Preview => Box::new(PreviewSink::headless()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub location: Location,
    pub window: FetchWindow,
    pub source: SourceOptions,
    pub render: RenderOptions,
    pub output: OutputOptions,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub samples: usize,
    pub frames: usize,
    pub output: PathBuf,
}

/// Render `series` into finished frames, overlay included when enabled.
pub fn render_frames(
    series: &WeatherSeries,
    location: &Location,
    options: &RenderOptions,
    cancel: &CancellationToken,
) -> Result<Vec<RgbImage>> {
    let features = map_features(series, options.sigma);

    let palette = PaletteName::resolve(&options.palette);
    let primary = PaletteLut::build(palette, DEFAULT_LUT_SIZE, options.accent);
    let secondary = PaletteLut::build(PaletteName::Coral, DEFAULT_LUT_SIZE, options.accent);

    let shape = FieldShape::new(
        options.height as usize,
        options.width as usize,
        options.steps,
    );
    if cancel.is_cancelled() {
        bail!("Render cancelled before noise generation");
    }
    let generator = options.noise_backend.generator();
    let bank = NoiseBank::generate(shape, generator.as_ref()).context("Noise generation failed")?;
    if cancel.is_cancelled() {
        bail!("Render cancelled after noise generation");
    }

    let compositor = Compositor::new(&bank, &primary, &secondary);
    let mut frames = compositor
        .render_all(&features, series.timestamps(), options.inbetweens, cancel)
        .context("Frame rendering failed")?;

    if options.overlay {
        let overlay = Overlay::new().context("Failed to load overlay font")?;
        frames.par_iter_mut().for_each(|frame| {
            let labels = FrameLabels::new(location, frame.timestamp, &frame.features);
            overlay.annotate(&mut frame.image, &labels);
        });
    }

    info!(
        frames = frames.len(),
        palette = %palette,
        backend = bank.backend(),
        "Frames ready"
    );
    Ok(frames.into_iter().map(|frame| frame.image).collect())
}

/// Hand frames to the configured sink, plus the PNG dump when requested.
/// A failed PNG dump is a warning; a failed main sink is an error.
pub fn write_frames(
    frames: &[RgbImage],
    output: &OutputOptions,
    sink: &dyn FrameSink,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    if cancel.is_cancelled() {
        bail!("Run cancelled before writing output");
    }

    if let Some(dir) = &output.frames_dir {
        if let Err(e) = PngSequenceSink.consume(frames, output.fps, dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to write PNG sequence");
        }
        if cancel.is_cancelled() {
            bail!("Run cancelled while writing PNG sequence");
        }
    }

    sink.consume(frames, output.fps, &output.out)
        .with_context(|| format!("Failed to write output via {} sink", sink.name()))
}

/// Fetch, render and write one animation.
pub async fn run(config: RunConfig, cancel: CancellationToken) -> Result<RunSummary> {
    let source = config.source.build()?;
    run_with_source(config, source.as_ref(), cancel).await
}

/// [`run`] against an already built weather source.
pub async fn run_with_source(
    config: RunConfig,
    source: &dyn WeatherSource,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let start = Instant::now();
    let request = FetchRequest::new(config.location.clone(), config.window);

    let series = tokio::select! {
        result = source.fetch(&request) => result.with_context(|| {
            format!(
                "Failed to fetch weather for {} ({}, {})",
                request.location.name, request.location.latitude, request.location.longitude
            )
        })?,
        _ = cancel.cancelled() => {
            info!(source = source.name(), "Fetch interrupted");
            bail!("Run cancelled while fetching weather");
        }
    };
    info!(
        source = source.name(),
        samples = series.len(),
        first = %series.first_timestamp(),
        last = %series.last_timestamp(),
        "Weather series ready"
    );

    let samples = series.len();
    let location = config.location.clone();
    let render = config.render.clone();
    let render_cancel = cancel.clone();
    let frames = tokio::task::spawn_blocking(move || {
        render_frames(&series, &location, &render, &render_cancel)
    })
    .await
    .context("Render task panicked")??;

    let output = config.output.clone();
    let frame_count = frames.len();
    let written = tokio::task::spawn_blocking(move || {
        let sink = output.sink(&cancel);
        write_frames(&frames, &output, sink.as_ref(), &cancel)
    })
    .await
    .context("Output task panicked")??;

    info!(
        path = %written.display(),
        frames = frame_count,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Weather art complete"
    );

    Ok(RunSummary {
        samples,
        frames: frame_count,
        output: written,
    })
}
