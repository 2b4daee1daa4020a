//! # Event Filter
//!
//! A closed set of [`EventKind`]s selecting which events a query returns.
//!
//! The API works in kinds. The integer encoding exists only for persisted
//! preferences and serialization: bit `n` is the `n`-th variant of
//! [`EventKind`] in declaration order. That mapping is stable; new kinds are
//! only ever appended.
//!
//! | bit | kind | bit | kind |
//! |---|---|---|---|
//! | 0 | HighTide | 7 | Sunset |
//! | 1 | LowTide | 8 | Moonrise |
//! | 2 | MaxCurrent | 9 | Moonset |
//! | 3 | MinCurrent | 10 | NewMoon |
//! | 4 | SlackRising | 11 | FirstQuarter |
//! | 5 | SlackFalling | 12 | FullMoon |
//! | 6 | Sunrise | 13 | LastQuarter |

use crate::model::StationType;
use crate::EventKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct EventFilter {
    bits: u32,
}

fn bit(kind: EventKind) -> u32 {
    1 << (kind as u32)
}

impl EventFilter {
    /// No kinds selected.
    pub fn empty() -> Self {
        EventFilter { bits: 0 }
    }

    /// Every kind.
    pub fn all() -> Self {
        EventKind::ALL.into_iter().collect()
    }

    /// High and low tides.
    pub fn tides() -> Self {
        [EventKind::HighTide, EventKind::LowTide].into_iter().collect()
    }

    /// Max/min currents and both slacks.
    pub fn currents() -> Self {
        [
            EventKind::MaxCurrent,
            EventKind::MinCurrent,
            EventKind::SlackRising,
            EventKind::SlackFalling,
        ]
        .into_iter()
        .collect()
    }

    /// Sun and moon markers.
    pub fn astronomical() -> Self {
        EventKind::ALL
            .into_iter()
            .filter(|k| k.is_astronomical())
            .collect()
    }

    /// Kinds relevant to a station type plus all astronomical markers.
    pub fn default_for(station_type: StationType) -> Self {
        let water = match station_type {
            StationType::Height => Self::tides(),
            StationType::Current => Self::currents(),
        };
        water.union(Self::astronomical())
    }

    /// Decode a persisted bit mask, ignoring bits that map to no kind.
    pub fn from_bits(bits: u32) -> Self {
        EventFilter {
            bits: bits & Self::all().bits,
        }
    }

    /// Encode for persistence.
    pub fn bits(self) -> u32 {
        self.bits
    }

    pub fn contains(self, kind: EventKind) -> bool {
        self.bits & bit(kind) != 0
    }

    pub fn insert(&mut self, kind: EventKind) {
        self.bits |= bit(kind);
    }

    pub fn remove(&mut self, kind: EventKind) {
        self.bits &= !bit(kind);
    }

    pub fn union(self, other: Self) -> Self {
        EventFilter {
            bits: self.bits | other.bits,
        }
    }

    pub fn intersection(self, other: Self) -> Self {
        EventFilter {
            bits: self.bits & other.bits,
        }
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// True if any sun or moon kind is selected.
    pub fn wants_astronomical(self) -> bool {
        !self.intersection(Self::astronomical()).is_empty()
    }

    /// Selected kinds in priority order.
    pub fn kinds(self) -> impl Iterator<Item = EventKind> {
        EventKind::ALL.into_iter().filter(move |&k| self.contains(k))
    }
}

impl FromIterator<EventKind> for EventFilter {
    fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
        let mut filter = EventFilter::empty();
        for kind in iter {
            filter.insert(kind);
        }
        filter
    }
}

impl From<u32> for EventFilter {
    fn from(bits: u32) -> Self {
        EventFilter::from_bits(bits)
    }
}

impl From<EventFilter> for u32 {
    fn from(filter: EventFilter) -> Self {
        filter.bits
    }
}

impl fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_encoding_is_stable() {
        assert_eq!(EventFilter::tides().bits(), 0b11);
        assert_eq!(EventFilter::currents().bits(), 0b11_1100);
        assert_eq!(
            std::iter::once(EventKind::LastQuarter)
                .collect::<EventFilter>()
                .bits(),
            1 << 13
        );
        assert_eq!(EventFilter::all().bits(), (1 << 14) - 1);
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let filter = EventFilter::from_bits(u32::MAX);
        assert_eq!(filter, EventFilter::all());
    }

    #[test]
    fn default_depends_on_station_type() {
        let height = EventFilter::default_for(StationType::Height);
        assert!(height.contains(EventKind::HighTide));
        assert!(height.contains(EventKind::Sunrise));
        assert!(!height.contains(EventKind::SlackRising));

        let current = EventFilter::default_for(StationType::Current);
        assert!(current.contains(EventKind::SlackFalling));
        assert!(!current.contains(EventKind::LowTide));
    }

    #[test]
    fn insert_and_remove() {
        let mut filter = EventFilter::empty();
        assert!(!filter.wants_astronomical());
        filter.insert(EventKind::Moonrise);
        assert!(filter.wants_astronomical());
        filter.remove(EventKind::Moonrise);
        assert!(filter.is_empty());
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&EventFilter::tides()).unwrap();
        assert_eq!(json, "3");
        let back: EventFilter = serde_json::from_str("3").unwrap();
        assert_eq!(back, EventFilter::tides());
    }
}
