//! # Event Presentation
//!
//! Turns an [`EventSequence`] into what people and devices consume: text lines
//! in station-local time for the terminal, and a compact serializable list
//! for companion devices (watches, e-ink clocks) that only understand Unix
//! timestamps and labels.
//!
//! Local time uses the station's IANA zone via `chrono-tz`. An unknown zone
//! name falls back to UTC with a logged warning rather than failing the whole
//! listing.

use crate::assemble::EventSequence;
use crate::model::HarmonicModel;
use crate::{EventKind, TideEvent};
use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};

/// One event as sent to a companion device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Unix seconds
    pub timestamp: i64,
    pub kind: EventKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rising: Option<bool>,
}

/// Parse an IANA zone name, falling back to UTC.
pub fn resolve_time_zone(name: &str) -> Tz {
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!("unknown time zone {name:?}, showing UTC");
            Tz::UTC
        }
    }
}

/// Companion-device list for `sequence`, values in the station's units.
pub fn watch_events(sequence: &EventSequence, model: &HarmonicModel) -> Vec<WatchEvent> {
    sequence
        .iter()
        .map(|event| WatchEvent {
            timestamp: event.timestamp.timestamp(),
            kind: event.kind,
            label: event.kind.label().to_string(),
            value: event.value,
            units: event
                .value
                .map(|_| model.units().abbreviation().to_string()),
            rising: event.is_rising,
        })
        .collect()
}

/// Format one event as a line of station-local text.
///
/// e.g. `Sat 06/01 04:12 AM EDT  High Tide            9.81 ft`
pub fn event_line(event: &TideEvent, tz: Tz, model: &HarmonicModel) -> String {
    let local = event.timestamp.with_timezone(&tz);
    let mut line = format!(
        "{}  {:<20}",
        local.format("%a %m/%d %I:%M %p %Z"),
        event.kind.label()
    );
    if let Some(value) = event.value {
        line.push_str(&format!("{:>7.2} {}", value, model.units()));
    }
    if event.reduced_precision {
        line.push_str("  (approx.)");
    }
    line.trim_end().to_string()
}

/// All events of `sequence` as local-time lines.
pub fn event_lines(sequence: &EventSequence, model: &HarmonicModel) -> Vec<String> {
    let tz = resolve_time_zone(model.time_zone());
    sequence
        .iter()
        .map(|event| event_line(event, tz, model))
        .collect()
}
