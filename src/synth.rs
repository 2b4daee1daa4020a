//! # Tide Function Synthesizer
//!
//! Turns a [`HarmonicModel`] plus per-year [`NodeFactors`] into a continuous
//! function of time:
//!
//! ```text
//! value(t) = datum + Σ A·f(year) · cos(speed·hours_since_jan1 + (V0+u)(year) − g)
//! ```
//!
//! ## Year Boundaries
//!
//! f and u are held constant for a whole year, so the raw sum jumps slightly
//! at midnight on January 1. Within `blend_hours` on either side of the
//! boundary the amplitude and phase of every term are linearly interpolated
//! between the two years, with equal weight at the boundary instant itself.
//!
//! ## Performance
//!
//! Evaluation is O(constituents) with all per-year constants folded at
//! construction, so the extrema search can call it freely.

use crate::astronomy::{self, NodeFactors};
use crate::constituents;
use crate::error::TideError;
use crate::model::HarmonicModel;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Half-step for the central-difference derivative, seconds
const DERIVATIVE_STEP_SECS: f64 = 1.0;

/// Blend half-width used by [`value_at`], hours
pub const DEFAULT_BLEND_HOURS: f64 = 6.0;

/// Widest accepted blend. Blends from two boundaries must not overlap.
pub const MAX_BLEND_HOURS: f64 = 720.0;

/// Per-year constants folded from the node factors.
#[derive(Clone, Debug)]
struct YearTerms {
    year: i32,
    /// January 1 00:00 UTC in Unix seconds
    epoch: f64,
    /// A·f for each constituent
    amplitudes: Vec<f64>,
    /// (V0+u) − g in degrees for each constituent
    phases: Vec<f64>,
}

impl YearTerms {
    /// Total phase of term `i` at `t`, in degrees (not reduced).
    fn phase_at(&self, speed: f64, i: usize, t: f64) -> f64 {
        speed * (t - self.epoch) / 3600.0 + self.phases[i]
    }
}

/// A pure, deterministic time → value mapping for one station.
#[derive(Clone, Debug)]
pub struct TideFunction {
    datum: f64,
    /// Degrees per hour, aligned with the model's constituents
    speeds: Vec<f64>,
    /// Sorted by year, contiguous
    years: Vec<YearTerms>,
    blend_secs: f64,
}

impl TideFunction {
    /// Fold a model with the factors for every year it will be evaluated in.
    ///
    /// `factors` must be non-empty and cover contiguous years; evaluation
    /// outside them clamps to the nearest covered year. Fails with
    /// [`TideError::UnknownConstituent`] if any model constituent is missing
    /// from the table.
    pub fn new(
        model: &HarmonicModel,
        factors: &[Arc<NodeFactors>],
        blend_hours: f64,
    ) -> Result<Self, TideError> {
        let speeds = model
            .constituents()
            .iter()
            .map(|c| {
                constituents::lookup(&c.name)
                    .map(|def| def.speed())
                    .ok_or_else(|| TideError::UnknownConstituent(c.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut factors: Vec<&Arc<NodeFactors>> = factors.iter().collect();
        factors.sort_by_key(|nf| nf.year());
        factors.dedup_by_key(|nf| nf.year());

        let years = factors
            .into_iter()
            .map(|nf| {
                let mut amplitudes = Vec::with_capacity(speeds.len());
                let mut phases = Vec::with_capacity(speeds.len());
                for c in model.constituents() {
                    let factor = nf
                        .get(&c.name)
                        .ok_or_else(|| TideError::UnknownConstituent(c.name.clone()))?;
                    amplitudes.push(c.amplitude * factor.node_factor);
                    phases.push(factor.equilibrium_argument - c.phase);
                }
                Ok(YearTerms {
                    year: nf.year(),
                    epoch: astronomy::unix_seconds(nf.epoch()),
                    amplitudes,
                    phases,
                })
            })
            .collect::<Result<Vec<_>, TideError>>()?;

        if years.is_empty() {
            return Err(TideError::EmptyModel(model.name().to_string()));
        }

        Ok(TideFunction {
            datum: model.datum(),
            speeds,
            years,
            blend_secs: clamp_blend_hours(blend_hours) * 3600.0,
        })
    }

    /// Predicted value at `instant`.
    pub fn value_at(&self, instant: DateTime<Utc>) -> f64 {
        self.value(astronomy::unix_seconds(instant))
    }

    /// Rate of change per hour at `instant`.
    pub fn derivative_at(&self, instant: DateTime<Utc>) -> f64 {
        self.derivative(astronomy::unix_seconds(instant))
    }

    /// Value at `t` Unix seconds.
    pub(crate) fn value(&self, t: f64) -> f64 {
        let idx = self.year_index(t);
        let current = &self.years[idx];

        // Blend partner and weight of the later year
        let blend = if self.blend_secs > 0.0 {
            let since_start = t - current.epoch;
            let next = self.years.get(idx + 1);
            if idx > 0 && since_start < self.blend_secs {
                Some((&self.years[idx - 1], current, 0.5 + since_start / (2.0 * self.blend_secs)))
            } else if let Some(next) = next.filter(|n| n.epoch - t < self.blend_secs) {
                Some((current, next, 0.5 - (next.epoch - t) / (2.0 * self.blend_secs)))
            } else {
                None
            }
        } else {
            None
        };

        let sum: f64 = match blend {
            None => self
                .speeds
                .iter()
                .enumerate()
                .map(|(i, &speed)| {
                    current.amplitudes[i] * current.phase_at(speed, i, t).to_radians().cos()
                })
                .sum(),
            Some((early, late, w)) => self
                .speeds
                .iter()
                .enumerate()
                .map(|(i, &speed)| {
                    let a = early.phase_at(speed, i, t);
                    let b = late.phase_at(speed, i, t);
                    let phase = a + w * astronomy::wrap180(b - a);
                    let amplitude = early.amplitudes[i] + w * (late.amplitudes[i] - early.amplitudes[i]);
                    amplitude * phase.to_radians().cos()
                })
                .sum(),
        };

        self.datum + sum
    }

    /// Central-difference derivative at `t` Unix seconds, units per hour.
    pub(crate) fn derivative(&self, t: f64) -> f64 {
        let h = DERIVATIVE_STEP_SECS;
        (self.value(t + h) - self.value(t - h)) / (2.0 * h) * 3600.0
    }

    fn year_index(&self, t: f64) -> usize {
        self.years
            .partition_point(|y| y.epoch <= t)
            .saturating_sub(1)
    }

    /// Years whose factors are folded in, ascending.
    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.years.iter().map(|y| y.year)
    }

    /// True when no term has a non-zero amplitude.
    pub fn is_flat(&self) -> bool {
        self.years
            .iter()
            .all(|y| y.amplitudes.iter().all(|&a| a == 0.0))
    }

    /// Period in hours of the largest-amplitude constituent.
    pub fn dominant_period_hours(&self) -> Option<f64> {
        let amplitudes = &self.years[0].amplitudes;
        amplitudes
            .iter()
            .zip(&self.speeds)
            .filter(|(&a, _)| a > 0.0)
            .max_by(|a, b| a.0.total_cmp(b.0))
            .map(|(_, &speed)| 360.0 / speed)
    }

    /// Period in hours of the fastest constituent with non-zero amplitude.
    pub fn shortest_period_hours(&self) -> Option<f64> {
        let amplitudes = &self.years[0].amplitudes;
        amplitudes
            .iter()
            .zip(&self.speeds)
            .filter(|(&a, _)| a > 0.0)
            .map(|(_, &speed)| speed)
            .max_by(f64::total_cmp)
            .map(|speed| 360.0 / speed)
    }
}

/// `hours` limited to `0..=MAX_BLEND_HOURS`; NaN means no blending.
pub fn clamp_blend_hours(hours: f64) -> f64 {
    if hours.is_nan() {
        0.0
    } else {
        hours.clamp(0.0, MAX_BLEND_HOURS)
    }
}

/// One-off evaluation of `model` at `instant`.
///
/// Builds a throwaway [`TideFunction`]; prefer keeping the function when
/// evaluating many instants.
pub fn value_at(
    model: &HarmonicModel,
    factors: &[Arc<NodeFactors>],
    instant: DateTime<Utc>,
) -> Result<f64, TideError> {
    Ok(TideFunction::new(model, factors, DEFAULT_BLEND_HOURS)?.value_at(instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Constituent, StationType, Units};
    use chrono::{Duration, TimeZone};

    fn model(constituents: Vec<Constituent>) -> HarmonicModel {
        HarmonicModel::new(
            "Test",
            StationType::Height,
            Units::Meters,
            0.5,
            constituents,
            "UTC",
            None,
        )
        .unwrap()
    }

    fn factors(years: std::ops::RangeInclusive<i32>) -> Vec<Arc<NodeFactors>> {
        years
            .map(|y| Arc::new(NodeFactors::for_year_all(y).unwrap()))
            .collect()
    }

    #[test]
    fn value_matches_harmonic_sum_mid_year() {
        let m = model(vec![
            Constituent::new("M2", 1.2, 35.0),
            Constituent::new("S2", 0.3, 80.0),
        ]);
        let nf = factors(2024..=2024);
        let function = TideFunction::new(&m, &nf, 6.0).unwrap();

        let t = Utc.with_ymd_and_hms(2024, 5, 17, 13, 30, 0).unwrap();
        let hours = (t - nf[0].epoch()).num_seconds() as f64 / 3600.0;
        let expected = 0.5
            + ["M2", "S2"]
                .iter()
                .zip([(1.2, 35.0), (0.3, 80.0)])
                .map(|(name, (amp, phase))| {
                    let f = nf[0].get(name).unwrap();
                    let speed = constituents::lookup(name).unwrap().speed();
                    amp * f.node_factor
                        * (speed * hours + f.equilibrium_argument - phase)
                            .to_radians()
                            .cos()
                })
                .sum::<f64>();

        assert!((function.value_at(t) - expected).abs() < 1e-9);
    }

    #[test]
    fn one_off_evaluation_matches_function() {
        let m = model(vec![Constituent::new("K1", 0.4, 200.0)]);
        let nf = factors(2023..=2025);
        let t = Utc.with_ymd_and_hms(2024, 12, 31, 22, 0, 0).unwrap();
        let function = TideFunction::new(&m, &nf, DEFAULT_BLEND_HOURS).unwrap();
        assert_eq!(value_at(&m, &nf, t).unwrap(), function.value_at(t));
    }

    #[test]
    fn unknown_constituent_fails_construction() {
        let m = model(vec![Constituent::new("QQ3", 1.0, 0.0)]);
        let err = TideFunction::new(&m, &factors(2024..=2024), 6.0).unwrap_err();
        assert!(matches!(err, TideError::UnknownConstituent(name) if name == "QQ3"));
    }

    #[test]
    fn year_boundary_is_continuous_when_blended() {
        let m = model(vec![
            Constituent::new("M2", 1.5, 100.0),
            Constituent::new("K1", 0.4, 200.0),
            Constituent::new("O1", 0.3, 190.0),
            Constituent::new("L2", 0.1, 90.0),
        ]);
        let function = TideFunction::new(&m, &factors(2024..=2025), 6.0).unwrap();
        let boundary = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let before = function.value_at(boundary - Duration::seconds(1));
        let after = function.value_at(boundary + Duration::seconds(1));
        assert!((after - before).abs() < 0.01, "jump {}", after - before);
    }

    #[test]
    fn oversized_blend_is_clamped() {
        let m = model(vec![
            Constituent::new("M2", 1.5, 100.0),
            Constituent::new("K1", 0.4, 200.0),
            Constituent::new("O1", 0.3, 190.0),
        ]);
        let nf = factors(2023..=2025);
        let huge = TideFunction::new(&m, &nf, 1.0e6).unwrap();
        let widest = TideFunction::new(&m, &nf, MAX_BLEND_HOURS).unwrap();
        let boundary = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let before = huge.value_at(boundary - Duration::seconds(1));
        let after = huge.value_at(boundary + Duration::seconds(1));
        assert!((after - before).abs() < 0.01, "jump {}", after - before);

        let t = Utc.with_ymd_and_hms(2024, 12, 20, 6, 0, 0).unwrap();
        assert_eq!(huge.value_at(t), widest.value_at(t));
        assert_eq!(clamp_blend_hours(f64::INFINITY), MAX_BLEND_HOURS);
        assert_eq!(clamp_blend_hours(-3.0), 0.0);
        assert!(clamp_blend_hours(f64::NAN) == 0.0);
    }

    #[test]
    fn unblended_boundary_jumps() {
        let boundary = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let largest_jump = [0.0, 45.0, 90.0, 135.0]
            .into_iter()
            .map(|phase| {
                let m = model(vec![Constituent::new("L2", 1.0, phase)]);
                let function = TideFunction::new(&m, &factors(2024..=2025), 0.0).unwrap();
                let before = function.value_at(boundary - Duration::milliseconds(1));
                (function.value_at(boundary) - before).abs()
            })
            .fold(0.0, f64::max);
        assert!(largest_jump > 0.01, "largest jump {largest_jump}");
    }

    #[test]
    fn derivative_tracks_analytic_slope() {
        let m = model(vec![Constituent::new("M2", 1.0, 0.0)]);
        let nf = factors(2024..=2024);
        let function = TideFunction::new(&m, &nf, 6.0).unwrap();
        let t = Utc.with_ymd_and_hms(2024, 8, 1, 4, 0, 0).unwrap();

        let speed = constituents::lookup("M2").unwrap().speed();
        let f = nf[0].get("M2").unwrap();
        let hours = (t - nf[0].epoch()).num_seconds() as f64 / 3600.0;
        let analytic = -f.node_factor
            * speed.to_radians()
            * (speed * hours + f.equilibrium_argument).to_radians().sin();

        assert!((function.derivative_at(t) - analytic).abs() < 1e-6);
    }

    #[test]
    fn periods_come_from_nonzero_terms() {
        let m = model(vec![
            Constituent::new("M2", 1.0, 0.0),
            Constituent::new("M4", 0.1, 0.0),
            Constituent::new("M8", 0.0, 0.0),
        ]);
        let function = TideFunction::new(&m, &factors(2024..=2024), 6.0).unwrap();
        assert!((function.dominant_period_hours().unwrap() - 12.42).abs() < 0.01);
        assert!((function.shortest_period_hours().unwrap() - 6.21).abs() < 0.01);
        assert!(!function.is_flat());
    }
}
