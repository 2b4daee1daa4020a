//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the tide-config.toml file.
//! It describes the stations to predict for (harmonic constants, datum, time zone,
//! position) and the default prediction settings.
//!
//! ```toml
//! [prediction]
//! days = 3
//! year_blend_hours = 6.0
//! max_scan_step_secs = 300.0
//! kinds = ["high_tide", "low_tide", "sunrise", "sunset"]
//!
//! [[stations]]
//! name = "Portland, ME"
//! time_zone = "America/New_York"
//! latitude = 43.6567
//! longitude = -70.2467
//! station_type = "height"
//! units = "feet"
//! datum = 4.9
//! constituents = [
//!     { name = "M2", amplitude = 4.51, phase = 103.6 },
//!     { name = "S2", amplitude = 0.68, phase = 139.4 },
//! ]
//! ```

use crate::error::TideError;
use crate::filter::EventFilter;
use crate::model::{Constituent, Coordinates, HarmonicModel, StationType, Units};
use crate::predict::PredictionOptions;
use crate::synth;
use crate::EventKind;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "tide-config.toml";

/// Application configuration loaded from tide-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Prediction defaults
    #[serde(default)]
    pub prediction: PredictionConfig,
    /// Stations to predict for, in listing order
    pub stations: Vec<StationConfig>,
}

/// Window, tuning and event selection defaults
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Days to predict from the start instant
    pub days: u32,
    /// Half-width of the year-boundary blend, hours
    pub year_blend_hours: f64,
    /// Upper bound on the extrema scan step, seconds
    pub max_scan_step_secs: f64,
    /// Event kinds to list; empty means the station type's default set
    pub kinds: Vec<EventKind>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        let options = PredictionOptions::default();
        PredictionConfig {
            days: 3,
            year_blend_hours: options.year_blend_hours,
            max_scan_step_secs: options.max_scan_step_secs,
            kinds: Vec::new(),
        }
    }
}

impl PredictionConfig {
    pub fn options(&self) -> PredictionOptions {
        PredictionOptions {
            year_blend_hours: synth::clamp_blend_hours(self.year_blend_hours),
            max_scan_step_secs: self.max_scan_step_secs,
        }
    }

    /// Configured kinds, or the default set for `station_type`.
    pub fn filter_for(&self, station_type: StationType) -> EventFilter {
        if self.kinds.is_empty() {
            EventFilter::default_for(station_type)
        } else {
            self.kinds.iter().copied().collect()
        }
    }
}

/// One station's harmonic constants and descriptive fields
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StationConfig {
    /// Human-readable station name
    pub name: String,
    /// IANA zone for local display (e.g. "America/New_York")
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Degrees north; required for sun and moon rise/set
    pub latitude: Option<f64>,
    /// Degrees east (west is negative)
    pub longitude: Option<f64>,
    #[serde(default = "default_station_type")]
    pub station_type: StationType,
    pub units: Units,
    /// Mean level above chart datum, in `units`
    #[serde(default)]
    pub datum: f64,
    pub constituents: Vec<Constituent>,
}

fn default_time_zone() -> String {
    "UTC".to_string()
}

fn default_station_type() -> StationType {
    StationType::Height
}

impl StationConfig {
    /// Validate into an immutable model.
    pub fn to_model(&self) -> Result<HarmonicModel, TideError> {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        };
        HarmonicModel::new(
            self.name.clone(),
            self.station_type,
            self.units,
            self.datum,
            self.constituents.clone(),
            self.time_zone.clone(),
            coordinates,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        // Portland, ME harmonic constants relative to mean sea level
        Config {
            prediction: PredictionConfig::default(),
            stations: vec![StationConfig {
                name: "Portland, ME".to_string(),
                time_zone: "America/New_York".to_string(),
                latitude: Some(43.6567),
                longitude: Some(-70.2467),
                station_type: StationType::Height,
                units: Units::Feet,
                datum: 4.9, // MSL above MLLW
                constituents: vec![
                    Constituent::new("M2", 4.51, 103.6),
                    Constituent::new("N2", 1.03, 74.6),
                    Constituent::new("S2", 0.68, 139.4),
                    Constituent::new("K1", 0.46, 203.0),
                    Constituent::new("O1", 0.36, 189.6),
                    Constituent::new("K2", 0.19, 136.3),
                    Constituent::new("NU2", 0.21, 77.9),
                    Constituent::new("M4", 0.08, 190.4),
                ],
            }],
        }
    }
}

impl Config {
    /// Load configuration from tide-config.toml file
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match Self::try_load_from_path(&path) {
            Ok(config) => {
                info!(
                    "loaded {} station(s) from {}",
                    config.stations.len(),
                    path.as_ref().display()
                );
                config
            }
            Err(TideError::ConfigIo(_)) => {
                info!("no config file found, using default configuration (Portland, ME)");
                Self::default()
            }
            Err(e) => {
                warn!("invalid config file format: {e}");
                warn!("using default configuration (Portland, ME)");
                Self::default()
            }
        }
    }

    /// Load without falling back, for callers that want the error.
    pub fn try_load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, TideError> {
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    /// Save current configuration to tide-config.toml
    pub fn save(&self) -> Result<(), TideError> {
        self.save_to_path(CONFIG_FILE)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TideError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Case-insensitive lookup by station name.
    pub fn station(&self, name: &str) -> Option<&StationConfig> {
        self.stations
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.stations.len(), 1);
        assert_eq!(config.stations[0].name, "Portland, ME");
        assert_eq!(config.stations[0].datum, 4.9);
        assert_eq!(config.prediction.days, 3);
        assert_eq!(config.prediction.year_blend_hours, 6.0);
    }

    #[test]
    fn test_blend_hours_are_clamped() {
        let mut prediction = PredictionConfig::default();
        prediction.year_blend_hours = 1.0e6;
        assert_eq!(prediction.options().year_blend_hours, synth::MAX_BLEND_HOURS);

        prediction.year_blend_hours = -1.0;
        assert_eq!(prediction.options().year_blend_hours, 0.0);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.stations[0].name, "Portland, ME");
    }

    #[test]
    fn test_minimal_station_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [[stations]]
            name = "The Narrows"
            station_type = "current"
            units = "knots"
            constituents = [{ name = "M2", amplitude = 2.1, phase = 33.0 }]
            "#,
        )
        .unwrap();
        let station = &config.stations[0];
        assert_eq!(station.time_zone, "UTC");
        assert_eq!(config.prediction, PredictionConfig::default());

        let model = station.to_model().unwrap();
        assert_eq!(model.station_type(), StationType::Current);
        assert!(model.coordinates().is_none());
        assert_eq!(
            config.prediction.filter_for(model.station_type()),
            EventFilter::default_for(StationType::Current)
        );
    }

    #[test]
    fn test_kinds_parse_from_snake_case() {
        let config: Config = toml::from_str(
            r#"
            stations = []
            [prediction]
            kinds = ["high_tide", "full_moon"]
            "#,
        )
        .unwrap();
        let filter = config.prediction.filter_for(StationType::Height);
        assert!(filter.contains(EventKind::FullMoon));
        assert!(!filter.contains(EventKind::LowTide));
    }

    #[test]
    fn test_default_station_builds() {
        let model = Config::default().stations[0].to_model().unwrap();
        assert_eq!(model.constituents().len(), 8);
        assert!(model.coordinates().is_some());
    }
}
