//! Frame sinks: where finished frames go.
//!
//! - [`Mp4Sink`]: H.264 video through an `ffmpeg` subprocess
//! - [`GifSink`]: looping animated GIF
//! - [`FallbackSink`]: primary sink, then a secondary one on failure
//! - [`PngSequenceSink`]: one PNG per frame
//! - [`PreviewSink`]: GIF preview opened in the platform viewer

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, DynamicImage, Frame as GifFrame, RgbImage};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

pub type SinkResult<T> = Result<T, SinkError>;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("No frames to write")]
    NoFrames,

    #[error("Frame {index} is {actual:?}, expected {expected:?}")]
    FrameSize {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding {path} failed: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("Output cancelled after {sink} failed: {message}")]
    Cancelled { sink: &'static str, message: String },

    #[error("All sinks failed (primary: {primary}; secondary: {secondary})")]
    AllFailed { primary: String, secondary: String },
}

impl SinkError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        SinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn encode(path: &Path, message: impl ToString) -> Self {
        SinkError::Encode {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// Consumes an ordered frame sequence.
pub trait FrameSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extension this sink writes, without the dot.
    fn extension(&self) -> &'static str;

    /// Write `frames` in order at `fps` to `target`, returning the path
    /// actually written.
    fn consume(&self, frames: &[RgbImage], fps: u32, target: &Path) -> SinkResult<PathBuf>;
}

/// Common frame size, or an error for an empty or ragged sequence.
fn frame_dimensions(frames: &[RgbImage]) -> SinkResult<(u32, u32)> {
    let first = frames.first().ok_or(SinkError::NoFrames)?;
    let expected = first.dimensions();
    for (index, frame) in frames.iter().enumerate() {
        if frame.dimensions() != expected {
            return Err(SinkError::FrameSize {
                index,
                expected,
                actual: frame.dimensions(),
            });
        }
    }
    Ok(expected)
}

fn ensure_parent(path: &Path) -> SinkResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))
        }
        _ => Ok(()),
    }
}

// ============================================================================
// MP4
// ============================================================================

/// Pipes raw `rgb24` frames into `ffmpeg` for `libx264` / `yuv420p` output.
/// Odd dimensions are padded to even, which `yuv420p` requires.
pub struct Mp4Sink {
    ffmpeg: PathBuf,
}

impl Mp4Sink {
    pub fn with_binary(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    fn args(width: u32, height: u32, fps: u32, target: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", width, height),
            "-r".into(),
            fps.to_string(),
            "-i".into(),
            "-".into(),
            "-vf".into(),
            "pad=ceil(iw/2)*2:ceil(ih/2)*2".into(),
            "-c:v".into(),
            "libx264".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            target.to_string_lossy().into_owned(),
        ]
    }
}

impl FrameSink for Mp4Sink {
    fn name(&self) -> &'static str {
        "mp4"
    }

    fn extension(&self) -> &'static str {
        "mp4"
    }

    #[instrument(skip_all, fields(frames = frames.len(), fps = fps, path = %target.display()))]
    fn consume(&self, frames: &[RgbImage], fps: u32, target: &Path) -> SinkResult<PathBuf> {
        let (width, height) = frame_dimensions(frames)?;
        ensure_parent(target)?;
        let start = Instant::now();

        let mut child = Command::new(&self.ffmpeg)
            .args(Self::args(width, height, fps.max(1), target))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                SinkError::Ffmpeg(format!("could not launch {}: {}", self.ffmpeg.display(), e))
            })?;

        // Frames go in on stdin; a write error usually means ffmpeg exited
        // early, and its stderr says why.
        let write_result = match child.stdin.take() {
            Some(stdin) => {
                let mut stdin = BufWriter::new(stdin);
                frames
                    .iter()
                    .try_for_each(|frame| stdin.write_all(frame.as_raw()))
                    .and_then(|_| stdin.flush())
            }
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| SinkError::Ffmpeg(format!("waiting for ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SinkError::Ffmpeg(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        write_result.map_err(|e| SinkError::Ffmpeg(format!("writing frames: {}", e)))?;

        info!(
            path = %target.display(),
            fps,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "MP4 written"
        );
        Ok(target.to_path_buf())
    }
}

// ============================================================================
// GIF
// ============================================================================

/// Infinitely looping animated GIF.
pub struct GifSink;

impl FrameSink for GifSink {
    fn name(&self) -> &'static str {
        "gif"
    }

    fn extension(&self) -> &'static str {
        "gif"
    }

    #[instrument(skip_all, fields(frames = frames.len(), fps = fps, path = %target.display()))]
    fn consume(&self, frames: &[RgbImage], fps: u32, target: &Path) -> SinkResult<PathBuf> {
        frame_dimensions(frames)?;
        ensure_parent(target)?;
        let start = Instant::now();

        let file = File::create(target).map_err(|e| SinkError::io(target, e))?;
        let mut encoder = GifEncoder::new(BufWriter::new(file));
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| SinkError::encode(target, e))?;

        let delay = Delay::from_numer_denom_ms(1000, fps.max(1));
        let gif_frames = frames.iter().map(|frame| {
            let rgba = DynamicImage::ImageRgb8(frame.clone()).into_rgba8();
            GifFrame::from_parts(rgba, 0, 0, delay)
        });
        encoder
            .encode_frames(gif_frames)
            .map_err(|e| SinkError::encode(target, e))?;

        info!(
            path = %target.display(),
            fps,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "GIF written"
        );
        Ok(target.to_path_buf())
    }
}

// ============================================================================
// Fallback
// ============================================================================

/// Tries `primary`; on failure writes with `secondary` at the same path with
/// the secondary's extension. No fallback runs once `cancel` is cancelled.
pub struct FallbackSink {
    primary: Box<dyn FrameSink>,
    secondary: Box<dyn FrameSink>,
    cancel: Option<CancellationToken>,
}

impl FallbackSink {
    pub fn new(primary: Box<dyn FrameSink>, secondary: Box<dyn FrameSink>) -> Self {
        Self {
            primary,
            secondary,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }

    /// MP4 through the given `ffmpeg`, falling back to GIF.
    pub fn video(ffmpeg: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(Mp4Sink::with_binary(ffmpeg)), Box::new(GifSink))
    }
}

impl FrameSink for FallbackSink {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn extension(&self) -> &'static str {
        self.primary.extension()
    }

    fn consume(&self, frames: &[RgbImage], fps: u32, target: &Path) -> SinkResult<PathBuf> {
        if frames.is_empty() {
            return Err(SinkError::NoFrames);
        }

        let primary_error = match self.primary.consume(frames, fps, target) {
            Ok(path) => return Ok(path),
            Err(e) => e,
        };

        // An interrupt also kills the ffmpeg child.
        if self.is_cancelled() {
            warn!(
                primary = self.primary.name(),
                error = %primary_error,
                "Output cancelled, skipping fallback"
            );
            return Err(SinkError::Cancelled {
                sink: self.primary.name(),
                message: primary_error.to_string(),
            });
        }

        let fallback_target = target.with_extension(self.secondary.extension());
        warn!(
            primary = self.primary.name(),
            secondary = self.secondary.name(),
            error = %primary_error,
            target = %fallback_target.display(),
            "Primary encoder failed, falling back"
        );

        self.secondary
            .consume(frames, fps, &fallback_target)
            .map_err(|secondary_error| SinkError::AllFailed {
                primary: primary_error.to_string(),
                secondary: secondary_error.to_string(),
            })
    }
}

// ============================================================================
// PNG sequence
// ============================================================================

/// Writes `frame_00000.png`, `frame_00001.png`, ... into the target
/// directory. Frame rate is ignored.
pub struct PngSequenceSink;

impl PngSequenceSink {
    pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("frame_{:05}.png", index))
    }
}

impl FrameSink for PngSequenceSink {
    fn name(&self) -> &'static str {
        "png-sequence"
    }

    fn extension(&self) -> &'static str {
        "png"
    }

    #[instrument(skip_all, fields(frames = frames.len(), dir = %target.display()))]
    fn consume(&self, frames: &[RgbImage], _fps: u32, target: &Path) -> SinkResult<PathBuf> {
        frame_dimensions(frames)?;
        fs::create_dir_all(target).map_err(|e| SinkError::io(target, e))?;

        for (index, frame) in frames.iter().enumerate() {
            let path = Self::frame_path(target, index);
            let png = renderer::png::encode_frame_png(frame)
                .map_err(|e| SinkError::encode(&path, e))?;
            fs::write(&path, png).map_err(|e| SinkError::io(&path, e))?;
        }

        info!(dir = %target.display(), frames = frames.len(), "PNG sequence written");
        Ok(target.to_path_buf())
    }
}

// ============================================================================
// Preview
// ============================================================================

/// Writes a GIF preview and opens it in the platform viewer. A viewer that
/// fails to launch is only a warning; the file stays on disk.
pub struct PreviewSink {
    launch_viewer: bool,
}

impl PreviewSink {
    pub fn new() -> Self {
        Self {
            launch_viewer: true,
        }
    }

    /// Write the preview file without opening it.
    pub fn headless() -> Self {
        Self {
            launch_viewer: false,
        }
    }

    /// `out/weather.mp4` previews as `out/weather.preview.gif`.
    pub fn preview_path(target: &Path) -> PathBuf {
        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "weather".to_string());
        target.with_file_name(format!("{}.preview.gif", stem))
    }
}

impl Default for PreviewSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for PreviewSink {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn extension(&self) -> &'static str {
        "gif"
    }

    fn consume(&self, frames: &[RgbImage], fps: u32, target: &Path) -> SinkResult<PathBuf> {
        let path = GifSink.consume(frames, fps, &Self::preview_path(target))?;

        if self.launch_viewer {
            match open::that(&path) {
                Ok(()) => info!(path = %path.display(), "Opened preview"),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not open a viewer, preview left on disk"
                ),
            }
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_path() {
        assert_eq!(
            PreviewSink::preview_path(Path::new("out/weather.mp4")),
            PathBuf::from("out/weather.preview.gif")
        );
    }

    #[test]
    fn test_frame_path() {
        assert_eq!(
            PngSequenceSink::frame_path(Path::new("frames"), 42),
            PathBuf::from("frames/frame_00042.png")
        );
    }

    #[test]
    fn test_mp4_args_pad_to_even() {
        let args = Mp4Sink::args(321, 121, 18, Path::new("out.mp4"));
        assert!(args.contains(&"321x121".to_string()));
        assert!(args.contains(&"pad=ceil(iw/2)*2:ceil(ih/2)*2".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_ragged_frames_rejected() {
        let frames = vec![RgbImage::new(4, 4), RgbImage::new(4, 5)];
        assert!(matches!(
            frame_dimensions(&frames),
            Err(SinkError::FrameSize { index: 1, .. })
        ));
        assert!(matches!(frame_dimensions(&[]), Err(SinkError::NoFrames)));
    }
}
