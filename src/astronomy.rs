//! # Astronomical Argument Calculator
//!
//! Computes the year-specific corrections that turn a station's static
//! harmonic constants into a prediction for a particular year:
//!
//! - **Node factor (f)**: amplitude multiplier accounting for the 18.6-year
//!   regression of the lunar node and the 8.85-year cycle of lunar perigee
//! - **Equilibrium argument (V0 + u)**: phase of the equilibrium constituent
//!   at 00:00 UTC on January 1, plus its nodal phase correction
//!
//! ## Conventions
//!
//! Orbital elements use Schureman's polynomials in Julian centuries from
//! 1899-12-31 12:00 UT. V0 is evaluated at the start of the year; f and u
//! at mid-year, where a single value per year is the least wrong.
//!
//! All angles are degrees until the trig call.
//!
//! ## Caching
//!
//! Factors depend only on the year, never on the station, so
//! [`NodeFactorCache`] keeps one table per year shared across all stations
//! and threads.

use crate::constituents::{self, ConstituentDef, NodalBasis};
use crate::error::TideError;
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, PoisonError, RwLock};

/// Years for which the orbital polynomials are trusted.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1700..=2299;

/// Obliquity of the ecliptic used by Schureman (degrees)
const OMEGA: f64 = 23.452_294_4;
/// Inclination of the lunar orbit to the ecliptic (degrees)
const INCLINATION: f64 = 5.145_396_4;

/// Julian date of 1899-12-31 12:00 UT, the Schureman epoch
const JD_1900: f64 = 2_415_020.0;

/// Half of a 365-day year in seconds
const HALF_YEAR_SECS: f64 = 182.5 * 86_400.0;

/// Mean orbital elements of moon and sun, degrees in `[0, 360)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitalElements {
    /// Mean longitude of the moon
    pub s: f64,
    /// Mean longitude of the sun
    pub h: f64,
    /// Longitude of lunar perigee
    pub p: f64,
    /// Longitude of the moon's ascending node
    pub n: f64,
    /// Longitude of solar perigee
    pub p1: f64,
}

impl OrbitalElements {
    /// Elements at the given Julian date.
    pub fn at_julian_date(jd: f64) -> Self {
        let t = (jd - JD_1900) / 36_525.0;
        let t2 = t * t;
        let t3 = t2 * t;
        OrbitalElements {
            s: normalize(270.434_164 + 481_267.883_1 * t - 0.001_133_3 * t2 + 0.000_001_9 * t3),
            h: normalize(279.696_678 + 36_000.768_925 * t + 0.000_302_5 * t2),
            p: normalize(334.329_556 + 4_069.034_7 * t - 0.010_325 * t2 - 0.000_012_5 * t3),
            n: normalize(259.183_275 - 1_934.142 * t + 0.002_078 * t2 + 0.000_002_2 * t3),
            p1: normalize(281.220_844 + 1.719_175 * t + 0.000_452_778 * t2 + 0.000_003_33 * t3),
        }
    }

    /// Elements at a UTC instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::at_julian_date(julian_date(unix_seconds(instant)))
    }
}

/// Angles derived from the node and perigee that drive the nodal corrections.
#[derive(Clone, Copy, Debug)]
struct NodalAngles {
    /// Obliquity of the lunar orbit to the equator (radians)
    i: f64,
    nu: f64,
    xi: f64,
    nu_prime: f64,
    nu_second: f64,
    /// Lunar perigee measured from the lunar intersection, `p - xi` (radians)
    big_p: f64,
}

impl NodalAngles {
    fn from_elements(el: &OrbitalElements) -> Self {
        let w = OMEGA.to_radians();
        let inc = INCLINATION.to_radians();
        let n = el.n.to_radians();

        let i = (inc.cos() * w.cos() - inc.sin() * w.sin() * n.cos()).acos();

        let half_n = (0.5 * n).tan();
        let e1 = ((0.5 * (w - inc)).cos() / (0.5 * (w + inc)).cos() * half_n).atan();
        let e2 = ((0.5 * (w - inc)).sin() / (0.5 * (w + inc)).sin() * half_n).atan();
        let nu = wrap180((e1 - e2).to_degrees());
        let xi = wrap180((n - (e1 + e2)).to_degrees());

        let nu_r = nu.to_radians();
        let sin_2i = (2.0 * i).sin();
        let nu_prime = (sin_2i * nu_r.sin())
            .atan2(sin_2i * nu_r.cos() + 0.3347)
            .to_degrees();
        let sin2_i = i.sin().powi(2);
        let nu_second = 0.5
            * (sin2_i * (2.0 * nu_r).sin())
                .atan2(sin2_i * (2.0 * nu_r).cos() + 0.0727)
                .to_degrees();

        NodalAngles {
            i,
            nu,
            xi,
            nu_prime,
            nu_second,
            big_p: (el.p - xi).to_radians(),
        }
    }

    /// Node factor and nodal phase (degrees) for one basis formula.
    fn basis(&self, basis: NodalBasis) -> (f64, f64) {
        let i = self.i;
        let (sin_i, cos_i) = i.sin_cos();
        let cos_half = (0.5 * i).cos();
        let tan_half = (0.5 * i).tan();
        let f_o1 = sin_i * cos_half.powi(2) / 0.3800;
        let f_m2 = cos_half.powi(4) / 0.9154;
        let (nu, xi) = (self.nu, self.xi);
        let p2 = 2.0 * self.big_p;

        match basis {
            NodalBasis::Mm => ((2.0 / 3.0 - sin_i.powi(2)) / 0.5021, 0.0),
            NodalBasis::Mf => (sin_i.powi(2) / 0.1578, -2.0 * xi),
            NodalBasis::O1 => (f_o1, 2.0 * xi - nu),
            NodalBasis::K1 => {
                let sin_2i = (2.0 * i).sin();
                let f = (0.8965 * sin_2i.powi(2)
                    + 0.6001 * sin_2i * nu.to_radians().cos()
                    + 0.1006)
                    .sqrt();
                (f, -self.nu_prime)
            }
            NodalBasis::J1 => ((2.0 * i).sin() / 0.7214, -nu),
            NodalBasis::OO1 => (sin_i * (0.5 * i).sin().powi(2) / 0.0164, -2.0 * xi - nu),
            NodalBasis::M1 => {
                let q = ((5.0 * cos_i - 1.0) * self.big_p.sin())
                    .atan2((7.0 * cos_i + 1.0) * self.big_p.cos());
                let inv_qa = (0.25
                    + 1.5 * cos_i / cos_half.powi(2) * p2.cos()
                    + 2.25 * cos_i.powi(2) / cos_half.powi(4))
                .sqrt();
                // total argument carries xi - nu + Q; p is already in V
                (f_o1 * inv_qa, wrap180((q - self.big_p).to_degrees()) - nu)
            }
            NodalBasis::M2 => (f_m2, 2.0 * xi - 2.0 * nu),
            NodalBasis::K2 => {
                let f = (19.0444 * sin_i.powi(4)
                    + 2.7702 * sin_i.powi(2) * (2.0 * nu).to_radians().cos()
                    + 0.0981)
                    .sqrt();
                (f, -2.0 * self.nu_second)
            }
            NodalBasis::L2 => {
                let t2 = tan_half.powi(2);
                let r = p2.sin().atan2(1.0 / (6.0 * t2) - p2.cos()).to_degrees();
                let inv_ra = (1.0 - 12.0 * t2 * p2.cos() + 36.0 * t2 * t2).sqrt();
                (f_m2 * inv_ra, 2.0 * xi - 2.0 * nu - r)
            }
            NodalBasis::M3 => (cos_half.powi(6) / 0.8758, 3.0 * xi - 3.0 * nu),
        }
    }

    /// Combined f and u for a constituent's nodal family.
    fn correction(&self, def: &ConstituentDef) -> (f64, f64) {
        def.nodal
            .iter()
            .fold((1.0, 0.0), |(f, u), &(basis, k)| {
                let (fb, ub) = self.basis(basis);
                (f * fb.powi(k.unsigned_abs() as i32), u + k as f64 * ub)
            })
    }
}

/// Year-specific correction for one constituent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeFactor {
    /// Amplitude multiplier (f)
    pub node_factor: f64,
    /// V0 + u in degrees, `[0, 360)`
    pub equilibrium_argument: f64,
}

/// Corrections for a set of constituents, valid for one calendar year.
#[derive(Clone, Debug)]
pub struct NodeFactors {
    year: i32,
    epoch: DateTime<Utc>,
    factors: HashMap<&'static str, NodeFactor>,
}

impl NodeFactors {
    /// Factors for every constituent in the table.
    pub fn for_year_all(year: i32) -> Result<Self, TideError> {
        Self::compute(year, constituents::TABLE.iter())
    }

    /// Factors for the named constituents only.
    ///
    /// Fails with [`TideError::UnknownConstituent`] on the first name the
    /// table does not know.
    pub fn for_year(year: i32, names: &[&str]) -> Result<Self, TideError> {
        let defs = names
            .iter()
            .map(|name| {
                constituents::lookup(name)
                    .ok_or_else(|| TideError::UnknownConstituent(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::compute(year, defs.into_iter())
    }

    fn compute<'a>(
        year: i32,
        defs: impl Iterator<Item = &'a ConstituentDef>,
    ) -> Result<Self, TideError> {
        let epoch = year_start(year)?;
        let epoch_secs = unix_seconds(epoch);

        let start = OrbitalElements::at_julian_date(julian_date(epoch_secs));
        let middle = OrbitalElements::at_julian_date(julian_date(epoch_secs + HALF_YEAR_SECS));
        let angles = NodalAngles::from_elements(&middle);

        // Mean solar hour angle at 00:00 UTC
        let arguments = [180.0, start.s, start.h, start.p, start.p1];

        let factors = defs
            .map(|def| {
                let v0: f64 = def
                    .doodson
                    .iter()
                    .zip(arguments.iter())
                    .map(|(&k, arg)| k as f64 * arg)
                    .sum::<f64>()
                    + def.phase;
                let (f, u) = angles.correction(def);
                (
                    def.name,
                    NodeFactor {
                        node_factor: f,
                        equilibrium_argument: normalize(v0 + u),
                    },
                )
            })
            .collect();

        Ok(NodeFactors {
            year,
            epoch,
            factors,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// 00:00 UTC on January 1 of [`Self::year`], the reference for V0.
    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Look up a constituent by name (case-insensitive, aliases accepted).
    pub fn get(&self, name: &str) -> Option<&NodeFactor> {
        constituents::lookup(name).and_then(|def| self.factors.get(def.name))
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

/// Corrections for the named constituents in `year`.
pub fn node_factors_for(year: i32, names: &[&str]) -> Result<NodeFactors, TideError> {
    NodeFactors::for_year(year, names)
}

/// Per-year memo of full-table [`NodeFactors`], safe to share across threads.
///
/// Inserts are first-writer-wins: two threads racing on the same year both
/// compute identical tables and whichever lands second is dropped.
#[derive(Debug, Default)]
pub struct NodeFactorCache {
    years: RwLock<HashMap<i32, Arc<NodeFactors>>>,
}

impl NodeFactorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(&self, year: i32) -> Result<Arc<NodeFactors>, TideError> {
        if let Some(hit) = self
            .years
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&year)
        {
            return Ok(Arc::clone(hit));
        }

        debug!("computing node factors for {year}");
        let computed = Arc::new(NodeFactors::for_year_all(year)?);

        let mut years = self.years.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(years.entry(year).or_insert(computed)))
    }

    /// Number of cached years.
    pub fn len(&self) -> usize {
        self.years.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// -- Time helpers shared by the synthesizer and ephemeris --

/// 00:00 UTC on January 1, rejecting unsupported years.
pub fn year_start(year: i32) -> Result<DateTime<Utc>, TideError> {
    if !SUPPORTED_YEARS.contains(&year) {
        return Err(TideError::YearOutOfRange(year));
    }
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or(TideError::YearOutOfRange(year))
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn unix_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + instant.timestamp_subsec_nanos() as f64 * 1e-9
}

pub fn julian_date(unix_secs: f64) -> f64 {
    unix_secs / 86_400.0 + 2_440_587.5
}

/// Reduce an angle to `[0, 360)`.
pub fn normalize(degrees: f64) -> f64 {
    degrees.rem_euclid(360.0)
}

/// Reduce an angle to `[-180, 180)`.
pub fn wrap180(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_factors_match_published_2006_values() {
        // 2006 is near a major lunar standstill: M2 small, diurnals large
        let nf = node_factors_for(2006, &["M2", "K1", "O1", "K2", "S2"]).unwrap();
        let f = |name: &str| nf.get(name).unwrap().node_factor;
        assert!((f("M2") - 0.963).abs() < 0.005, "M2 f = {}", f("M2"));
        assert!((f("K1") - 1.113).abs() < 0.005, "K1 f = {}", f("K1"));
        assert!((f("O1") - 1.183).abs() < 0.005, "O1 f = {}", f("O1"));
        assert!((f("K2") - 1.316).abs() < 0.01, "K2 f = {}", f("K2"));
        assert_eq!(f("S2"), 1.0);
    }

    #[test]
    fn solar_constituents_have_no_nodal_phase() {
        let nf = node_factors_for(2024, &["S2", "S4"]).unwrap();
        // At 00:00 UTC the mean sun hour angle is 180°, so 2T = 360° ≡ 0°
        let s2 = nf.get("S2").unwrap();
        assert!(s2.equilibrium_argument.abs() < 1e-9 || (s2.equilibrium_argument - 360.0).abs() < 1e-9);
        assert_eq!(s2.node_factor, 1.0);
    }

    #[test]
    fn unknown_constituent_is_rejected() {
        let err = node_factors_for(2024, &["M2", "XX7"]).unwrap_err();
        match err {
            TideError::UnknownConstituent(name) => assert_eq!(name, "XX7"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn years_outside_supported_range_fail() {
        assert!(matches!(
            node_factors_for(1500, &["M2"]),
            Err(TideError::YearOutOfRange(1500))
        ));
        assert!(node_factors_for(1700, &["M2"]).is_ok());
        assert!(node_factors_for(2299, &["M2"]).is_ok());
    }

    #[test]
    fn equilibrium_argument_advances_with_speed_across_years() {
        // V0 of next year equals this year's V0 advanced by a year of speed,
        // up to the small nodal change in u.
        let this = NodeFactors::for_year_all(2024).unwrap();
        let next = NodeFactors::for_year_all(2025).unwrap();
        let hours = (next.epoch() - this.epoch()).num_hours() as f64;
        for name in ["M2", "S2", "N2", "K1", "O1"] {
            let speed = constituents::lookup(name).unwrap().speed();
            let predicted = this.get(name).unwrap().equilibrium_argument + speed * hours;
            let drift = wrap180(next.get(name).unwrap().equilibrium_argument - predicted);
            assert!(drift.abs() < 5.0, "{name} drift {drift}");
        }
    }

    #[test]
    fn node_factors_stay_physical_over_a_nodal_cycle() {
        for year in 2000..2019 {
            let nf = NodeFactors::for_year_all(year).unwrap();
            for def in constituents::TABLE {
                let f = nf.get(def.name).unwrap().node_factor;
                assert!(f.is_finite() && f > 0.0, "{} in {year}: f = {f}", def.name);
            }
        }
    }

    #[test]
    fn cache_returns_shared_tables() {
        let cache = NodeFactorCache::new();
        let a = cache.get_or_compute(2030).unwrap();
        let b = cache.get_or_compute(2030).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.get_or_compute(1200).is_err());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn wrap_helpers() {
        assert_eq!(normalize(-90.0), 270.0);
        assert_eq!(wrap180(190.0), -170.0);
        assert_eq!(wrap180(-180.0), -180.0);
    }
}
