//! Geographic location of a weather series.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// A named point on the globe plus the offset used for local-time labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Offset from UTC in hours, used only for display.
    #[serde(default)]
    pub utc_offset_hours: f32,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            utc_offset_hours: 0.0,
        }
    }

    pub fn with_utc_offset(mut self, hours: f32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    /// Shenzhen, the location the renderer was first tuned against.
    pub fn shenzhen() -> Self {
        Self::new("Shenzhen", 22.5431, 114.0579).with_utc_offset(8.0)
    }

    /// Fixed offset for local-time display.
    ///
    /// Offsets chrono cannot represent (a day or more) fall back to UTC.
    pub fn fixed_offset(&self) -> FixedOffset {
        let seconds = (self.utc_offset_hours * 3600.0).round() as i32;
        FixedOffset::east_opt(seconds).unwrap_or(Utc.fix())
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::shenzhen()
    }
}
