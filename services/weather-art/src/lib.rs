//! Weather art service library.
//!
//! Wires a weather source to the renderer and writes the result:
//! - `config`: location YAML loading
//! - `pipeline`: fetch, render, write
//! - `sink`: video, GIF, PNG sequence and preview outputs

pub mod config;
pub mod pipeline;
pub mod sink;

pub use pipeline::{
    render_frames, run, run_with_source, write_frames, OutputMode, OutputOptions, RenderOptions,
    RunConfig, RunSummary, SourceOptions,
};
pub use sink::{FrameSink, SinkError, SinkResult};
