//! # Event Extraction Engine
//!
//! Locates extrema and zero crossings of a [`TideFunction`] inside a query
//! window.
//!
//! ## Algorithm
//! 1. **Scan**: step across the window at an interval short enough that the
//!    fastest constituent completes only a fraction of a cycle per step
//! 2. **Bracket**: a sign change of the derivative between two samples
//!    brackets an extremum; a sign change of the value brackets a slack
//! 3. **Refine**: bisect each bracket down to a millisecond
//! 4. **Classify**: derivative `+ → −` is a high (max current), `− → +` a
//!    low (min current); slacks take the sign of the derivative at the
//!    crossing
//!
//! ## Window Boundaries
//! The scan starts one step before the window and ends one step after it so
//! an extremum sitting exactly on `start` is still bracketed. An event is
//! kept only if its rounded timestamp lies in `[start, end)`; nothing outside
//! the window is reported.
//!
//! The same scan-and-refine primitive drives the sun and moon events in
//! [`crate::ephemeris`].

use crate::astronomy::unix_seconds;
use crate::model::StationType;
use crate::synth::TideFunction;
use crate::{EventKind, TideEvent};
use chrono::{DateTime, Utc};

/// Refined brackets are narrower than this, seconds
const TOLERANCE_SECS: f64 = 1e-3;

/// Bisection halves a 5-minute bracket below tolerance in ~19 steps
const MAX_ITERATIONS: usize = 64;

/// Scan steps per period of the fastest constituent
const STEPS_PER_CYCLE: f64 = 24.0;

/// Lower bound on the scan step, seconds
const MIN_STEP_SECS: f64 = 30.0;

/// Default upper bound on the scan step, seconds
pub const DEFAULT_MAX_STEP_SECS: f64 = 300.0;

/// A located sign change of some function of time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Crossing {
    /// Unix seconds
    pub t: f64,
    /// Function went from negative to non-negative
    pub rising: bool,
    /// False when refinement fell back to the coarse bracket midpoint
    pub converged: bool,
}

/// Find every sign change of `f` on `[lo, hi]`, sampling every `step` seconds.
///
/// Brackets whose endpoint values differ by more than `max_jump` are skipped;
/// this rejects the wrap-around discontinuity of angular functions.
pub(crate) fn crossings<F>(f: F, lo: f64, hi: f64, step: f64, max_jump: Option<f64>) -> Vec<Crossing>
where
    F: Fn(f64) -> f64,
{
    let mut found = Vec::new();
    if hi <= lo || step <= 0.0 {
        return found;
    }

    let samples = ((hi - lo) / step).ceil() as usize;
    let mut a = lo;
    let mut fa = f(a);
    for k in 1..=samples {
        let b = (lo + k as f64 * step).min(hi);
        let fb = f(b);

        let rising = fa < 0.0 && fb >= 0.0;
        let falling = fa > 0.0 && fb <= 0.0;
        let plausible = max_jump.map_or(true, |jump| (fb - fa).abs() <= jump);
        if (rising || falling) && plausible {
            let (t, converged) = refine(&f, a, b, fa > 0.0);
            found.push(Crossing {
                t,
                rising,
                converged,
            });
        }

        a = b;
        fa = fb;
    }
    found
}

/// Bisect a bracket whose left end has sign `left_positive`.
fn refine<F>(f: &F, lo: f64, hi: f64, left_positive: bool) -> (f64, bool)
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = (lo, hi);
    for _ in 0..MAX_ITERATIONS {
        if b - a <= TOLERANCE_SECS {
            return (0.5 * (a + b), true);
        }
        let m = 0.5 * (a + b);
        let fm = f(m);
        if fm.is_nan() {
            break;
        }
        if (fm > 0.0) == left_positive {
            a = m;
        } else {
            b = m;
        }
    }
    if b - a <= TOLERANCE_SECS {
        (0.5 * (a + b), true)
    } else {
        (0.5 * (lo + hi), false)
    }
}

/// Scan step for a function, in seconds.
pub fn scan_step_secs(function: &TideFunction, max_step_secs: f64) -> f64 {
    let max_step = max_step_secs.max(MIN_STEP_SECS);
    function
        .shortest_period_hours()
        .map(|period| (period * 3600.0 / STEPS_PER_CYCLE).clamp(MIN_STEP_SECS, max_step))
        .unwrap_or(max_step)
}

/// Round to the whole second and keep only instants inside `[start, end)`.
pub(crate) fn window_instant(
    t: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(t.round() as i64, 0).filter(|ts| *ts >= start && *ts < end)
}

/// Extrema (and, for current stations, slacks) of `function` in `[start, end)`.
///
/// Events come back in time order. An empty result is valid: a window
/// shorter than a tidal cycle may contain no turning point.
pub fn tide_events(
    function: &TideFunction,
    station_type: StationType,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    max_step_secs: f64,
) -> Vec<TideEvent> {
    let step = scan_step_secs(function, max_step_secs);
    let lo = unix_seconds(start) - step;
    let hi = unix_seconds(end) + step;

    let (high, low) = match station_type {
        StationType::Height => (EventKind::HighTide, EventKind::LowTide),
        StationType::Current => (EventKind::MaxCurrent, EventKind::MinCurrent),
    };

    let mut events: Vec<TideEvent> = crossings(|t| function.derivative(t), lo, hi, step, None)
        .into_iter()
        .filter_map(|c| {
            let timestamp = window_instant(c.t, start, end)?;
            Some(TideEvent {
                timestamp,
                kind: if c.rising { low } else { high },
                value: Some(function.value(c.t)),
                is_rising: None,
                reduced_precision: !c.converged,
            })
        })
        .collect();

    if station_type == StationType::Current {
        let slacks = crossings(|t| function.value(t), lo, hi, step, None)
            .into_iter()
            .filter_map(|c| {
                let timestamp = window_instant(c.t, start, end)?;
                let slope = function.derivative(c.t);
                let rising = if slope != 0.0 { slope > 0.0 } else { c.rising };
                Some(TideEvent {
                    timestamp,
                    kind: if rising {
                        EventKind::SlackRising
                    } else {
                        EventKind::SlackFalling
                    },
                    value: Some(function.value(c.t)),
                    is_rising: Some(rising),
                    reduced_precision: !c.converged,
                })
            });
        events.extend(slacks);
        events.sort_by(|a, b| (a.timestamp, a.kind).cmp(&(b.timestamp, b.kind)));
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sine_zero_crossings() {
        // sin with a 1000 s period: zeros every 500 s
        let period = 1000.0;
        let f = |t: f64| (t / period * std::f64::consts::TAU).sin();
        let found = crossings(f, 100.0, 2100.0, 37.0, None);

        let times: Vec<f64> = found.iter().map(|c| c.t).collect();
        assert_eq!(times.len(), 4, "{times:?}");
        for (c, expected) in found.iter().zip([500.0, 1000.0, 1500.0, 2000.0]) {
            assert!((c.t - expected).abs() < 0.01, "{} vs {expected}", c.t);
            assert!(c.converged);
        }
        assert!(!found[0].rising);
        assert!(found[1].rising);
    }

    #[test]
    fn exact_zero_on_a_sample_is_found_once() {
        let f = |t: f64| 100.0 - t;
        let found = crossings(f, 0.0, 200.0, 50.0, None);
        assert_eq!(found.len(), 1);
        assert!((found[0].t - 100.0).abs() < 1e-3);
    }

    #[test]
    fn jump_guard_skips_wraparound() {
        // Sawtooth rising through 0 at t = 360 and wrapping at t = 180 and 540
        let f = |t: f64| (t + 180.0).rem_euclid(360.0) - 180.0;
        let all = crossings(f, 10.0, 700.0, 20.0, None);
        let guarded = crossings(f, 10.0, 700.0, 20.0, Some(90.0));
        assert_eq!(all.iter().filter(|c| !c.rising).count(), 2);
        assert_eq!(guarded.len(), 1);
        assert!(guarded[0].rising);
        assert!((guarded[0].t - 360.0).abs() < 1e-3);
    }

    #[test]
    fn nan_falls_back_to_bracket_midpoint() {
        let f = |t: f64| if t > 10.0 && t < 20.0 { f64::NAN } else { 15.0 - t };
        let found = crossings(f, 0.0, 30.0, 30.0, None);
        assert_eq!(found.len(), 1);
        assert!(!found[0].converged);
        assert_eq!(found[0].t, 15.0);
    }

    #[test]
    fn flat_function_has_no_crossings() {
        assert!(crossings(|_| 0.0, 0.0, 1000.0, 10.0, None).is_empty());
    }

    #[test]
    fn window_instant_rounds_and_bounds() {
        let start = DateTime::from_timestamp(1_000, 0).unwrap();
        let end = DateTime::from_timestamp(2_000, 0).unwrap();
        assert_eq!(window_instant(999.6, start, end), Some(start));
        assert_eq!(window_instant(999.4, start, end), None);
        assert_eq!(window_instant(1_999.4, start, end).map(|t| t.timestamp()), Some(1_999));
        assert_eq!(window_instant(1_999.6, start, end), None);
    }
}
