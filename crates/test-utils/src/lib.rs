//! Shared test utilities for the weather-art workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic weather series generators
//! - Common test fixtures (fixed start times, scenario series)
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{hourly_series, fixtures};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
