//! Common types shared across the weather-art workspace.

pub mod error;
pub mod location;
pub mod sample;
pub mod time;

pub use error::{WeatherError, WeatherResult};
pub use location::Location;
pub use sample::{Column, WeatherSample, WeatherSeries};
pub use time::{FetchWindow, TimeParseError};
