//! # Sun and Moon Ephemeris
//!
//! Low-precision solar and lunar positions, good to a few minutes of time for
//! rise/set and a quarter of an hour for phases, which is all a tide table
//! needs. Formulas follow the Astronomical Almanac's low-precision series.
//!
//! Events are found with the same scan-and-bisect primitive as tide extrema:
//! - **Sunrise/Sunset**: altitude of the sun's centre crosses −0.833°
//!   (refraction plus semi-diameter)
//! - **Moonrise/Moonset**: altitude crosses `0.7275·π − 0.5667°`, π being the
//!   horizontal parallax
//! - **Phases**: the moon's elongation from the sun in ecliptic longitude
//!   passes 0°, 90°, 180° and 270°
//!
//! Rise and set need station coordinates; phases do not.

use crate::astronomy::{julian_date, normalize, unix_seconds, wrap180};
use crate::extract::{crossings, window_instant};
use crate::filter::EventFilter;
use crate::model::Coordinates;
use crate::{EventKind, TideEvent};
use chrono::{DateTime, Utc};

/// Julian date of J2000.0
const JD_2000: f64 = 2_451_545.0;

/// Sun's altitude at rise and set, degrees
const SUN_HORIZON: f64 = -0.833;

/// Rise/set scan step, seconds
const RISE_SET_STEP_SECS: f64 = 600.0;

/// Phase scan step, seconds. Elongation moves ~3° in this time.
const PHASE_STEP_SECS: f64 = 6.0 * 3600.0;

/// Elongation jumps larger than this between samples are the ±180° wrap
const PHASE_MAX_JUMP: f64 = 90.0;

const PHASES: [(EventKind, f64); 4] = [
    (EventKind::NewMoon, 0.0),
    (EventKind::FirstQuarter, 90.0),
    (EventKind::FullMoon, 180.0),
    (EventKind::LastQuarter, 270.0),
];

/// Apparent position of a body, degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    /// Ecliptic longitude, `[0, 360)`
    pub longitude: f64,
    pub right_ascension: f64,
    pub declination: f64,
    /// Horizontal parallax (zero for the sun)
    pub parallax: f64,
}

/// Days since J2000.0 for `t` Unix seconds.
fn days_since_j2000(t: f64) -> f64 {
    julian_date(t) - JD_2000
}

fn obliquity(days: f64) -> f64 {
    (23.439 - 0.000_000_4 * days).to_radians()
}

fn sin_deg(x: f64) -> f64 {
    x.to_radians().sin()
}

fn cos_deg(x: f64) -> f64 {
    x.to_radians().cos()
}

fn sun_at(days: f64) -> Position {
    let mean_longitude = normalize(280.460 + 0.985_647_4 * days);
    let anomaly = (357.528 + 0.985_600_3 * days).to_radians();
    let lambda = mean_longitude + 1.915 * anomaly.sin() + 0.020 * (2.0 * anomaly).sin();

    let eps = obliquity(days);
    let l = lambda.to_radians();
    Position {
        longitude: normalize(lambda),
        right_ascension: (eps.cos() * l.sin()).atan2(l.cos()).to_degrees(),
        declination: (eps.sin() * l.sin()).asin().to_degrees(),
        parallax: 0.0,
    }
}

fn moon_at(days: f64) -> Position {
    let t = days / 36_525.0;
    let lambda = 218.32 + 481_267.881 * t
        + 6.29 * sin_deg(135.0 + 477_198.87 * t)
        - 1.27 * sin_deg(259.3 - 413_335.36 * t)
        + 0.66 * sin_deg(235.7 + 890_534.22 * t)
        + 0.21 * sin_deg(269.9 + 954_397.74 * t)
        - 0.19 * sin_deg(357.5 + 35_999.05 * t)
        - 0.11 * sin_deg(186.5 + 966_404.03 * t);
    let beta = 5.13 * sin_deg(93.3 + 483_202.02 * t)
        + 0.28 * sin_deg(228.2 + 960_400.89 * t)
        - 0.28 * sin_deg(318.3 + 6_003.15 * t)
        - 0.17 * sin_deg(217.6 - 407_332.21 * t);
    let parallax = 0.9508
        + 0.0518 * cos_deg(135.0 + 477_198.87 * t)
        + 0.0095 * cos_deg(259.3 - 413_335.36 * t)
        + 0.0078 * cos_deg(235.7 + 890_534.22 * t)
        + 0.0028 * cos_deg(269.9 + 954_397.74 * t);

    let eps = obliquity(days);
    let (l, b) = (lambda.to_radians(), beta.to_radians());
    Position {
        longitude: normalize(lambda),
        right_ascension: (l.sin() * eps.cos() - b.tan() * eps.sin())
            .atan2(l.cos())
            .to_degrees(),
        declination: (b.sin() * eps.cos() + b.cos() * eps.sin() * l.sin())
            .asin()
            .to_degrees(),
        parallax,
    }
}

/// Sun position at an instant.
pub fn sun_position(instant: DateTime<Utc>) -> Position {
    sun_at(days_since_j2000(unix_seconds(instant)))
}

/// Moon position at an instant.
pub fn moon_position(instant: DateTime<Utc>) -> Position {
    moon_at(days_since_j2000(unix_seconds(instant)))
}

/// Geometric altitude of `body` seen from `at`, degrees.
fn altitude(at: Coordinates, body: &Position, days: f64) -> f64 {
    let gmst = normalize(280.460_618_37 + 360.985_647_366_29 * days);
    let hour_angle = (gmst + at.longitude - body.right_ascension).to_radians();
    let (lat, dec) = (at.latitude.to_radians(), body.declination.to_radians());
    (lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos())
        .asin()
        .to_degrees()
}

/// Moon's elongation east of the sun, `[0, 360)`.
pub fn moon_elongation(instant: DateTime<Utc>) -> f64 {
    let days = days_since_j2000(unix_seconds(instant));
    normalize(moon_at(days).longitude - sun_at(days).longitude)
}

/// Sun, moon and phase events in `[start, end)` for the kinds `filter` selects.
///
/// Without `coordinates` only moon phases can be produced.
pub fn astronomical_events(
    coordinates: Option<Coordinates>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter: &EventFilter,
) -> Vec<TideEvent> {
    let mut events = Vec::new();
    let (lo, hi) = (unix_seconds(start), unix_seconds(end));

    let mut push = |t: f64, kind: EventKind, converged: bool| {
        if let Some(timestamp) = window_instant(t, start, end) {
            events.push(TideEvent {
                timestamp,
                kind,
                value: None,
                is_rising: None,
                reduced_precision: !converged,
            });
        }
    };

    if let Some(at) = coordinates {
        let step = RISE_SET_STEP_SECS;
        if filter.contains(EventKind::Sunrise) || filter.contains(EventKind::Sunset) {
            let sun_height = |t: f64| {
                let days = days_since_j2000(t);
                altitude(at, &sun_at(days), days) - SUN_HORIZON
            };
            for c in crossings(sun_height, lo - step, hi + step, step, None) {
                let kind = if c.rising {
                    EventKind::Sunrise
                } else {
                    EventKind::Sunset
                };
                if filter.contains(kind) {
                    push(c.t, kind, c.converged);
                }
            }
        }

        if filter.contains(EventKind::Moonrise) || filter.contains(EventKind::Moonset) {
            let moon_height = |t: f64| {
                let days = days_since_j2000(t);
                let moon = moon_at(days);
                altitude(at, &moon, days) - (0.7275 * moon.parallax - 0.5667)
            };
            for c in crossings(moon_height, lo - step, hi + step, step, None) {
                let kind = if c.rising {
                    EventKind::Moonrise
                } else {
                    EventKind::Moonset
                };
                if filter.contains(kind) {
                    push(c.t, kind, c.converged);
                }
            }
        }
    }

    let step = PHASE_STEP_SECS;
    for (kind, target) in PHASES {
        if !filter.contains(kind) {
            continue;
        }
        let offset = |t: f64| {
            let days = days_since_j2000(t);
            wrap180(moon_at(days).longitude - sun_at(days).longitude - target)
        };
        for c in crossings(offset, lo - step, hi + step, step, Some(PHASE_MAX_JUMP)) {
            if c.rising {
                push(c.t, kind, c.converged);
            }
        }
    }

    events.sort_by(|a, b| (a.timestamp, a.kind).cmp(&(b.timestamp, b.kind)));
    events
}
