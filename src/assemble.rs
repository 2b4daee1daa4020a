//! # Event Sequence Assembler
//!
//! Merges raw tide, current and astronomical events into the final ordered,
//! filtered sequence handed back to callers.

use crate::error::PredictionWarning;
use crate::filter::EventFilter;
use crate::TideEvent;
use serde::{Deserialize, Serialize};

/// Finite, time-ordered result of one prediction query.
///
/// Timestamps never decrease; events sharing a timestamp are ordered by
/// [`crate::EventKind`] priority and no `(timestamp, kind)` pair repeats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSequence {
    events: Vec<TideEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<PredictionWarning>,
}

impl EventSequence {
    pub fn iter(&self) -> std::slice::Iter<'_, TideEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[TideEvent] {
        &self.events
    }

    /// Non-fatal conditions raised while predicting.
    pub fn warnings(&self) -> &[PredictionWarning] {
        &self.warnings
    }

    pub fn push_warning(&mut self, warning: PredictionWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    pub fn into_events(self) -> Vec<TideEvent> {
        self.events
    }
}

impl IntoIterator for EventSequence {
    type Item = TideEvent;
    type IntoIter = std::vec::IntoIter<TideEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a EventSequence {
    type Item = &'a TideEvent;
    type IntoIter = std::slice::Iter<'a, TideEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Sort, de-duplicate and filter raw events.
///
/// Sorting is stable on `(timestamp, kind)`, so when the same pair appears
/// twice (an event found by two adjacent sub-windows) the first one found is
/// kept.
pub fn assemble(mut raw: Vec<TideEvent>, filter: &EventFilter) -> EventSequence {
    raw.retain(|e| filter.contains(e.kind));
    raw.sort_by(|a, b| (a.timestamp, a.kind).cmp(&(b.timestamp, b.kind)));
    raw.dedup_by(|later, earlier| later.timestamp == earlier.timestamp && later.kind == earlier.kind);

    EventSequence {
        events: raw,
        warnings: Vec::new(),
    }
}
