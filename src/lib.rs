//! # Tide Prediction Core Library
//!
//! This library predicts tide and tidal-current events for a station from its
//! harmonic constants: high and low waters, maximum currents and slacks, plus
//! sunrise, sunset, moonrise, moonset and the principal moon phases.
//!
//! ## Design Philosophy
//!
//! ### Pure Computation
//! - **No hidden state**: every prediction is a function of the station
//!   model, the window and the filter. Identical inputs give identical output.
//! - **Shared read-only models**: a [`HarmonicModel`] never changes after
//!   construction and can be shared across threads behind an `Arc`.
//! - **One memo**: per-year node factors are cached in a
//!   [`NodeFactorCache`], which any number of threads may hit concurrently.
//!
//! ### Precision
//! Extrema and slacks are bracketed on a scan of a few minutes and refined
//! by bisection to a millisecond, then reported rounded to the whole second.
//!
//! ### Data Flow
//! 1. **Astronomy**: orbital elements → node factors and equilibrium arguments per year
//! 2. **Synthesis**: model + factors → continuous [`TideFunction`]
//! 3. **Extraction**: scan, bracket, refine → raw tide/current events
//! 4. **Ephemeris**: sun and moon positions → rise/set and phase events
//! 5. **Assembly**: sort, de-duplicate, filter → [`EventSequence`]
//!
//! ## Core Types
//!
//! - [`TideEvent`]: one predicted event with its timestamp and kind
//! - [`EventKind`]: the closed set of event kinds, in tie-break priority order
//!
//! # Example
//! ```
//! use chrono::{TimeZone, Utc};
//! use tide_predict_lib::{
//!     predict_events, Constituent, EventFilter, HarmonicModel, StationType, Units,
//! };
//!
//! let station = HarmonicModel::new(
//!     "Example Harbor",
//!     StationType::Height,
//!     Units::Meters,
//!     1.5,
//!     vec![Constituent::new("M2", 1.0, 120.0), Constituent::new("S2", 0.3, 150.0)],
//!     "UTC",
//!     None,
//! )
//! .unwrap();
//!
//! let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
//! let events = predict_events(&station, start, end, &EventFilter::tides()).unwrap();
//! assert!(events.len() >= 6);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Module declarations
pub mod assemble;
pub mod astronomy;
pub mod config;
pub mod constituents;
pub mod ephemeris;
pub mod error;
pub mod extract;
pub mod filter;
pub mod model;
pub mod predict;
pub mod presentation;
pub mod synth;

pub use assemble::{assemble, EventSequence};
pub use astronomy::{node_factors_for, NodeFactor, NodeFactorCache, NodeFactors};
pub use error::{PredictionWarning, TideError};
pub use filter::EventFilter;
pub use model::{Constituent, Coordinates, HarmonicModel, StationType, Units};
pub use predict::{predict_events, PredictionOptions, Predictor};
pub use synth::TideFunction;

/// Every kind of event the predictor emits.
///
/// Declaration order is the tie-break priority when two events share a
/// timestamp: tide and current extrema first, then slacks, then astronomical
/// markers. It is also the bit order of [`EventFilter::bits`], so variants
/// must only ever be appended.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    HighTide,
    LowTide,
    MaxCurrent,
    MinCurrent,
    SlackRising,
    SlackFalling,
    Sunrise,
    Sunset,
    Moonrise,
    Moonset,
    NewMoon,
    FirstQuarter,
    FullMoon,
    LastQuarter,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::HighTide,
        EventKind::LowTide,
        EventKind::MaxCurrent,
        EventKind::MinCurrent,
        EventKind::SlackRising,
        EventKind::SlackFalling,
        EventKind::Sunrise,
        EventKind::Sunset,
        EventKind::Moonrise,
        EventKind::Moonset,
        EventKind::NewMoon,
        EventKind::FirstQuarter,
        EventKind::FullMoon,
        EventKind::LastQuarter,
    ];

    /// Sun and moon markers, which carry no value.
    pub fn is_astronomical(self) -> bool {
        self >= EventKind::Sunrise
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            EventKind::HighTide => "High Tide",
            EventKind::LowTide => "Low Tide",
            EventKind::MaxCurrent => "Max Current",
            EventKind::MinCurrent => "Min Current",
            EventKind::SlackRising => "Slack, Flood Begins",
            EventKind::SlackFalling => "Slack, Ebb Begins",
            EventKind::Sunrise => "Sunrise",
            EventKind::Sunset => "Sunset",
            EventKind::Moonrise => "Moonrise",
            EventKind::Moonset => "Moonset",
            EventKind::NewMoon => "New Moon",
            EventKind::FirstQuarter => "First Quarter",
            EventKind::FullMoon => "Full Moon",
            EventKind::LastQuarter => "Last Quarter",
        }
    }

    /// Snake-case identifier, as used in config files and on the command line.
    pub fn key(self) -> &'static str {
        match self {
            EventKind::HighTide => "high_tide",
            EventKind::LowTide => "low_tide",
            EventKind::MaxCurrent => "max_current",
            EventKind::MinCurrent => "min_current",
            EventKind::SlackRising => "slack_rising",
            EventKind::SlackFalling => "slack_falling",
            EventKind::Sunrise => "sunrise",
            EventKind::Sunset => "sunset",
            EventKind::Moonrise => "moonrise",
            EventKind::Moonset => "moonset",
            EventKind::NewMoon => "new_moon",
            EventKind::FirstQuarter => "first_quarter",
            EventKind::FullMoon => "full_moon",
            EventKind::LastQuarter => "last_quarter",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventKind {
    type Err = TideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.key() == wanted)
            .ok_or_else(|| TideError::UnknownEventKind(s.to_string()))
    }
}

/// One predicted event.
///
/// `value` is the height or current speed in the station's units for tide
/// and current kinds, and `None` for astronomical kinds. `is_rising` is only
/// set for slacks.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use tide_predict_lib::{EventKind, TideEvent};
///
/// let high = TideEvent {
///     timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 4, 12, 30).unwrap(),
///     kind: EventKind::HighTide,
///     value: Some(9.8),
///     is_rising: None,
///     reduced_precision: false,
/// };
/// assert!(!high.kind.is_astronomical());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    /// UTC instant, whole seconds
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub value: Option<f64>,
    pub is_rising: Option<bool>,
    /// Set when refinement did not converge and the time is only as good as
    /// the coarse scan step
    #[serde(default)]
    pub reduced_precision: bool,
}
