//! # Station Harmonic Model
//!
//! The immutable per-station data every prediction is computed from. A model
//! is built once by whatever loads station data, validated on construction,
//! and then shared read-only (typically as `Arc<HarmonicModel>`) across any
//! number of concurrent queries.
//!
//! Phases are Greenwich (UTC) referenced epochs in degrees; amplitudes and
//! the datum share the station's native [`Units`].

use crate::constituents;
use crate::error::TideError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Whether the model predicts water level or current speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationType {
    Height,
    Current,
}

/// Native unit of the model's amplitudes and datum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    Feet,
    Meters,
    Knots,
}

impl Units {
    pub fn abbreviation(self) -> &'static str {
        match self {
            Units::Feet => "ft",
            Units::Meters => "m",
            Units::Knots => "kt",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Station position in degrees (north and east positive).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Station-specific constants for one harmonic constituent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    /// Name in the constituent table (e.g. "M2")
    pub name: String,
    /// Amplitude in the station's units
    pub amplitude: f64,
    /// Phase lag (epoch) in degrees, UTC referenced
    pub phase: f64,
}

impl Constituent {
    pub fn new(name: impl Into<String>, amplitude: f64, phase: f64) -> Self {
        Constituent {
            name: name.into(),
            amplitude,
            phase,
        }
    }
}

/// A loaded station: datum, type, constituents and descriptive metadata.
///
/// Deserialization goes through [`HarmonicModel::new`], so a decoded model
/// is as validated as a constructed one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelFields")]
pub struct HarmonicModel {
    name: String,
    station_type: StationType,
    units: Units,
    datum: f64,
    constituents: Vec<Constituent>,
    time_zone: String,
    coordinates: Option<Coordinates>,
    extra_metadata: Vec<(String, String)>,
}

/// Wire form of [`HarmonicModel`], checked before it becomes one.
#[derive(Deserialize)]
struct ModelFields {
    name: String,
    station_type: StationType,
    units: Units,
    datum: f64,
    constituents: Vec<Constituent>,
    time_zone: String,
    coordinates: Option<Coordinates>,
    #[serde(default)]
    extra_metadata: Vec<(String, String)>,
}

impl TryFrom<ModelFields> for HarmonicModel {
    type Error = TideError;

    fn try_from(fields: ModelFields) -> Result<Self, Self::Error> {
        let mut model = HarmonicModel::new(
            fields.name,
            fields.station_type,
            fields.units,
            fields.datum,
            fields.constituents,
            fields.time_zone,
            fields.coordinates,
        )?;
        model.extra_metadata = fields.extra_metadata;
        Ok(model)
    }
}

impl HarmonicModel {
    /// Build a model, rejecting empty constituent lists, negative or
    /// non-finite amplitudes, non-finite phases and duplicate names. Aliases
    /// of one table entry (e.g. `RHO` and `RHO1`) count as duplicates.
    ///
    /// Whether each name exists in the constituent table is checked when a
    /// prediction function is built, not here.
    pub fn new(
        name: impl Into<String>,
        station_type: StationType,
        units: Units,
        datum: f64,
        constituents: Vec<Constituent>,
        time_zone: impl Into<String>,
        coordinates: Option<Coordinates>,
    ) -> Result<Self, TideError> {
        let name = name.into();
        if constituents.is_empty() {
            return Err(TideError::EmptyModel(name));
        }

        let mut seen = HashSet::new();
        for c in &constituents {
            if !c.amplitude.is_finite() || c.amplitude < 0.0 {
                return Err(TideError::InvalidConstituent {
                    name: c.name.clone(),
                    reason: "amplitude must be finite and non-negative",
                });
            }
            if !c.phase.is_finite() {
                return Err(TideError::InvalidConstituent {
                    name: c.name.clone(),
                    reason: "phase must be finite",
                });
            }
            let key = constituents::lookup(&c.name)
                .map(|def| def.name.to_string())
                .unwrap_or_else(|| c.name.trim().to_ascii_uppercase());
            if !seen.insert(key) {
                return Err(TideError::DuplicateConstituent(c.name.clone()));
            }
        }
        if !datum.is_finite() {
            return Err(TideError::InvalidConstituent {
                name: "datum".to_string(),
                reason: "datum must be finite",
            });
        }

        Ok(HarmonicModel {
            name,
            station_type,
            units,
            datum,
            constituents,
            time_zone: time_zone.into(),
            coordinates,
            extra_metadata: Vec::new(),
        })
    }

    /// Attach free-form descriptive fields (source, datum name, ...).
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_metadata.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn station_type(&self) -> StationType {
        self.station_type
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn datum(&self) -> f64 {
        self.datum
    }

    pub fn constituents(&self) -> &[Constituent] {
        &self.constituents
    }

    /// IANA zone name used for local display
    pub fn time_zone(&self) -> &str {
        &self.time_zone
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Name/value pairs describing the station, in display order.
    pub fn metadata(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Name".to_string(), self.name.clone()),
            (
                "Type".to_string(),
                match self.station_type {
                    StationType::Height => "Tide station".to_string(),
                    StationType::Current => "Current station".to_string(),
                },
            ),
            ("Time zone".to_string(), self.time_zone.clone()),
        ];
        if let Some(coords) = self.coordinates {
            rows.push(("Coordinates".to_string(), format_coordinates(coords)));
        }
        rows.push((
            "Datum".to_string(),
            format!("{:.3} {}", self.datum, self.units),
        ));
        rows.push((
            "Constituents".to_string(),
            self.constituents.len().to_string(),
        ));
        rows.extend(self.extra_metadata.iter().cloned());
        rows
    }
}

/// Format as e.g. `43.6567° N, 70.2467° W`.
fn format_coordinates(coords: Coordinates) -> String {
    let ns = if coords.latitude >= 0.0 { 'N' } else { 'S' };
    let ew = if coords.longitude >= 0.0 { 'E' } else { 'W' };
    format!(
        "{:.4}° {}, {:.4}° {}",
        coords.latitude.abs(),
        ns,
        coords.longitude.abs(),
        ew
    )
}
