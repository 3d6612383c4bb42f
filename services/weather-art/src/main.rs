//! Weather art CLI.
//!
//! Fetches recent hourly weather for one location and renders it as an
//! animated procedural texture, saved as video or shown as a GIF preview.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use renderer::noise::DEFAULT_STEPS;
use renderer::NoiseBackend;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use weather_common::FetchWindow;

use weather_art::config::load_location;
use weather_art::{OutputMode, OutputOptions, RenderOptions, RunConfig, SourceOptions};

#[derive(Parser, Debug)]
#[command(name = "weather-art")]
#[command(about = "Render recent weather as animated procedural art")]
struct Args {
    /// Days of past weather to fetch
    #[arg(long, env = "WEATHER_ART_DAYS", default_value = "5")]
    days: u32,

    /// Days of forecast to fetch
    #[arg(long, env = "WEATHER_ART_FORECAST_DAYS", default_value = "1")]
    forecast_days: u32,

    /// Output frame rate
    #[arg(long, env = "WEATHER_ART_FPS", default_value = "18")]
    fps: u32,

    /// Palette name (dusk, coral, twilight, deepsea)
    #[arg(long, env = "WEATHER_ART_PALETTE", default_value = "dusk")]
    palette: String,

    /// Palette accent strength, 0 disables
    #[arg(long, env = "WEATHER_ART_ACCENT", default_value = "0.2")]
    accent: f32,

    /// Frame width in pixels
    #[arg(long, env = "WEATHER_ART_WIDTH", default_value = "320")]
    width: u32,

    /// Frame height in pixels
    #[arg(long, env = "WEATHER_ART_HEIGHT", default_value = "120")]
    height: u32,

    /// Output video path
    #[arg(long, env = "WEATHER_ART_OUT", default_value = "out/weather.mp4")]
    out: PathBuf,

    /// Synthetic frames between hourly samples
    #[arg(long, env = "WEATHER_ART_INBETWEENS", default_value = "2")]
    inbetweens: usize,

    /// Temporal smoothing sigma in samples
    #[arg(long, env = "WEATHER_ART_SIGMA", default_value = "1.0")]
    sigma: f32,

    /// Save to file instead of previewing
    #[arg(long)]
    save: bool,

    /// Noise loop length in slices
    #[arg(long, env = "WEATHER_ART_STEPS", default_value_t = DEFAULT_STEPS)]
    steps: usize,

    /// Noise backend (coherent or blurred)
    #[arg(long, env = "WEATHER_ART_NOISE_BACKEND", default_value = "coherent")]
    noise_backend: String,

    /// Weather cache file
    #[arg(long, env = "WEATHER_ART_CACHE_PATH", default_value = "out/weather_cache.json")]
    cache_path: PathBuf,

    /// Cache time-to-live in minutes
    #[arg(long, env = "WEATHER_ART_CACHE_TTL_MINUTES", default_value = "60")]
    cache_ttl_minutes: u64,

    /// Maximum fetch attempts
    #[arg(long, env = "WEATHER_ART_MAX_RETRIES", default_value = "3")]
    max_retries: u32,

    /// Read weather from a JSON file instead of the network
    #[arg(long, env = "WEATHER_ART_INPUT")]
    input: Option<PathBuf>,

    /// Also write every frame as PNG into this directory
    #[arg(long, env = "WEATHER_ART_FRAMES_DIR")]
    frames_dir: Option<PathBuf>,

    /// Skip the text overlay
    #[arg(long)]
    no_overlay: bool,

    /// Location config file (YAML)
    #[arg(long, env = "WEATHER_ART_CONFIG")]
    config: Option<PathBuf>,

    /// ffmpeg binary used for video output
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log as JSON lines
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Render threads (defaults to one per core)
    #[arg(long, env = "WEATHER_ART_THREADS")]
    threads: Option<usize>,
}

fn main() -> ExitCode {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "weather-art failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

fn run(args: Args) -> Result<()> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure render thread pool")?;
        info!(threads, "Configured render thread pool");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let location = load_location(args.config.as_deref())?;

    let noise_backend = args.noise_backend.parse::<NoiseBackend>().unwrap_or_else(|e: String| {
        let fallback = NoiseBackend::default();
        warn!(error = %e, fallback = %fallback, "Unknown noise backend");
        fallback
    });

    let config = RunConfig {
        location,
        window: FetchWindow::new(args.days, args.forecast_days),
        source: SourceOptions {
            input: args.input,
            cache_path: args.cache_path,
            cache_ttl: Duration::from_secs(args.cache_ttl_minutes * 60),
            max_retries: args.max_retries,
        },
        render: RenderOptions {
            width: args.width,
            height: args.height,
            steps: args.steps,
            inbetweens: args.inbetweens,
            sigma: args.sigma,
            palette: args.palette,
            accent: args.accent,
            noise_backend,
            overlay: !args.no_overlay,
        },
        output: OutputOptions {
            mode: if args.save {
                OutputMode::Save
            } else {
                OutputMode::Preview
            },
            out: args.out,
            fps: args.fps,
            frames_dir: args.frames_dir,
            ffmpeg: args.ffmpeg,
            open_viewer: true,
        },
    };

    info!(
        location = %config.location.name,
        days = config.window.past_days,
        forecast_days = config.window.forecast_days,
        mode = ?config.output.mode,
        "Starting weather-art"
    );

    // Handle Ctrl+C
    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling run");
            ctrl_c_cancel.cancel();
        }
    });

    let summary = weather_art::run(config, cancel).await?;
    info!(
        samples = summary.samples,
        frames = summary.frames,
        output = %summary.output.display(),
        "Done"
    );
    Ok(())
}
