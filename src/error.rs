//! # Prediction Errors and Warnings
//!
//! Every fallible operation in the library returns [`TideError`]. Failures are
//! fatal for the query that raised them: there is no partial-result mode, a
//! query either yields its complete event sequence or an error.
//!
//! Conditions that degrade a result without invalidating it are reported as
//! [`PredictionWarning`] values attached to the returned sequence and logged
//! through the `log` facade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Errors that can occur while building models or predicting events.
#[derive(Error, Debug)]
pub enum TideError {
    /// A constituent name has no known astronomical formula
    #[error("unknown constituent: {0}")]
    UnknownConstituent(String),

    /// Query window is empty or inverted
    #[error("invalid range: end {end} is not after start {start}")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Orbital element polynomials are only trusted for a bounded span of years
    #[error("year {0} is outside the supported range 1700-2299")]
    YearOutOfRange(i32),

    /// A station must carry at least one constituent
    #[error("station {0} has no constituents")]
    EmptyModel(String),

    /// Negative or non-finite amplitude/phase
    #[error("constituent {name} has invalid parameters: {reason}")]
    InvalidConstituent { name: String, reason: &'static str },

    /// Same constituent listed twice in one station
    #[error("constituent {0} appears more than once")]
    DuplicateConstituent(String),

    /// Event kind name that does not match any [`crate::EventKind`]
    #[error("unknown event kind: {0}")]
    UnknownEventKind(String),

    /// Configuration file could not be read or written
    #[error("config IO: {0}")]
    ConfigIo(#[from] io::Error),

    /// Configuration file is not valid TOML for [`crate::config::Config`]
    #[error("config parse: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("config serialize: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Non-fatal conditions attached to an otherwise valid prediction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionWarning {
    /// The synthesized curve has no extrema over a window long enough to
    /// contain some, so the station model is flat or nearly flat.
    DegenerateStation { station: String },
}

impl std::fmt::Display for PredictionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionWarning::DegenerateStation { station } => {
                write!(f, "station {station} produced no tidal extrema")
            }
        }
    }
}
