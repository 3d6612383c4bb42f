//! Error types for the rendering pipeline.

use thiserror::Error;

/// Result type alias using RenderError.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that stop a render. Recoverable conditions (missing columns,
/// unknown palette names, noise backend fallback) never surface here; they
/// are substituted with defaults and logged.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Feature series is empty")]
    EmptyFeatures,

    #[error("Invalid raster shape {width}x{height}")]
    InvalidShape { width: usize, height: usize },

    #[error("Noise field '{name}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("Timeline has {actual} timestamps for {expected} feature samples")]
    TimelineLength { expected: usize, actual: usize },

    #[error("Render cancelled after {completed} of {total} frames")]
    Cancelled { completed: usize, total: usize },

    #[error("PNG encoding failed: {0}")]
    Png(String),

    #[error("Overlay failed: {0}")]
    Overlay(String),
}
