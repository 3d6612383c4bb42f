//! Location configuration loading.
//!
//! The location comes from an optional YAML file:
//!
//! ```yaml
//! location:
//!   name: Oslo
//!   latitude: 59.9139
//!   longitude: 10.7522
//!   utc_offset_hours: 1
//! ```
//!
//! No file means the built-in default location.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};
use weather_common::Location;

/// Root of the YAML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtConfig {
    pub location: Location,
}

impl ArtConfig {
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: ArtConfig =
            serde_yaml::from_str(content).context("Failed to parse location config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let loc = &self.location;
        if loc.name.trim().is_empty() {
            bail!("location name must not be empty");
        }
        if !(-90.0..=90.0).contains(&loc.latitude) {
            bail!("latitude {} is outside [-90, 90]", loc.latitude);
        }
        if !(-180.0..=180.0).contains(&loc.longitude) {
            bail!("longitude {} is outside [-180, 180]", loc.longitude);
        }
        if !(-14.0..=14.0).contains(&loc.utc_offset_hours) {
            bail!("utc_offset_hours {} is outside [-14, 14]", loc.utc_offset_hours);
        }
        Ok(())
    }
}

/// Resolve the location to render.
///
/// `None` or a path that does not exist yields the default location; a file
/// that exists but does not parse is an error.
pub fn load_location(path: Option<&Path>) -> Result<Location> {
    let Some(path) = path else {
        let location = Location::default();
        info!(location = %location.name, "No config file given, using default location");
        return Ok(location);
    };

    if !path.exists() {
        let location = Location::default();
        warn!(
            path = %path.display(),
            location = %location.name,
            "Config file does not exist, using default location"
        );
        return Ok(location);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config = ArtConfig::from_yaml(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;

    info!(
        location = %config.location.name,
        latitude = config.location.latitude,
        longitude = config.location.longitude,
        "Loaded location config"
    );
    Ok(config.location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_location() {
        let yaml = r#"
location:
  name: Oslo
  latitude: 59.9139
  longitude: 10.7522
  utc_offset_hours: 1
"#;
        let config = ArtConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.location.name, "Oslo");
        assert_eq!(config.location.utc_offset_hours, 1.0);
    }

    #[test]
    fn test_offset_defaults_to_utc() {
        let yaml = "location: { name: Accra, latitude: 5.6, longitude: -0.19 }";
        let config = ArtConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.location.utc_offset_hours, 0.0);
    }

    #[test]
    fn test_rejects_bad_coordinates() {
        let yaml = "location: { name: Nowhere, latitude: 123.0, longitude: 0.0 }";
        assert!(ArtConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file_uses_default() {
        let location = load_location(Some(Path::new("/nonexistent/weather-art.yaml"))).unwrap();
        assert_eq!(location, Location::shenzhen());
        assert_eq!(load_location(None).unwrap(), Location::shenzhen());
    }

    #[test]
    fn test_broken_file_is_fatal() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "location: [this is not a location").unwrap();
        assert!(load_location(Some(file.path())).is_err());
    }
}
