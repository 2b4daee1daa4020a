//! # Harmonic Constituent Table
//!
//! The fixed table of constituents the predictor knows how to drive. Each
//! entry carries its Doodson-style multipliers over the five slowly varying
//! astronomical arguments and the family of nodal corrections it follows.
//!
//! ## Arguments
//!
//! The equilibrium argument of a constituent is
//!
//! ```text
//! V = a·T + b·s + c·h + d·p + e·p1 + phase
//! ```
//!
//! where `T` is the hour angle of the mean sun at Greenwich, `s` the mean
//! longitude of the moon, `h` the mean longitude of the sun, `p` the
//! longitude of lunar perigee and `p1` the longitude of solar perigee. The
//! speed follows from the same multipliers applied to the hourly rates of
//! those arguments, so a constituent's speed and its argument can never drift
//! apart.
//!
//! ## Nodal Families
//!
//! Amplitude (f) and phase (u) corrections come from a small set of basis
//! formulas. Compound and shallow-water constituents combine them: f is the
//! product of the basis factors raised to the absolute multiplier, u the sum
//! of the basis phases times the signed multiplier.

/// Hourly rates of `T, s, h, p, p1` in degrees per mean solar hour.
///
/// Derived from the linear terms of the orbital element polynomials in
/// [`crate::astronomy`] (per Julian century of 876 600 hours).
pub const ARGUMENT_RATES: [f64; 5] = [
    15.0,
    481_267.883_1 / 876_600.0,
    36_000.768_925 / 876_600.0,
    4_069.034_7 / 876_600.0,
    1.719_175 / 876_600.0,
];

/// Basis formulas for nodal corrections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodalBasis {
    Mm,
    Mf,
    O1,
    K1,
    J1,
    OO1,
    M1,
    M2,
    K2,
    L2,
    M3,
}

/// One row of the constituent table.
#[derive(Clone, Copy, Debug)]
pub struct ConstituentDef {
    pub name: &'static str,
    /// Multipliers of `T, s, h, p, p1`
    pub doodson: [i8; 5],
    /// Constant phase term in degrees
    pub phase: f64,
    /// Empty for purely solar constituents (f = 1, u = 0)
    pub nodal: &'static [(NodalBasis, i8)],
}

impl ConstituentDef {
    /// Angular speed in degrees per mean solar hour.
    pub fn speed(&self) -> f64 {
        self.doodson
            .iter()
            .zip(ARGUMENT_RATES.iter())
            .map(|(&k, rate)| k as f64 * rate)
            .sum()
    }

    /// Period in hours.
    pub fn period_hours(&self) -> f64 {
        360.0 / self.speed()
    }
}

use NodalBasis::*;

macro_rules! constituent {
    ($name:literal, [$t:literal, $s:literal, $h:literal, $p:literal, $p1:literal], $phase:literal, $nodal:expr) => {
        ConstituentDef {
            name: $name,
            doodson: [$t, $s, $h, $p, $p1],
            phase: $phase,
            nodal: $nodal,
        }
    };
}

/// Every constituent the astronomical argument calculator supports.
pub static TABLE: &[ConstituentDef] = &[
    // Long period
    constituent!("SA", [0, 0, 1, 0, 0], 0.0, &[]),
    constituent!("SSA", [0, 0, 2, 0, 0], 0.0, &[]),
    constituent!("MM", [0, 1, 0, -1, 0], 0.0, &[(Mm, 1)]),
    constituent!("MSF", [0, 2, -2, 0, 0], 0.0, &[(M2, -1)]),
    constituent!("MF", [0, 2, 0, 0, 0], 0.0, &[(Mf, 1)]),
    // Diurnal
    constituent!("2Q1", [1, -4, 1, 2, 0], 90.0, &[(O1, 1)]),
    constituent!("Q1", [1, -3, 1, 1, 0], 90.0, &[(O1, 1)]),
    constituent!("RHO1", [1, -3, 3, -1, 0], 90.0, &[(O1, 1)]),
    constituent!("O1", [1, -2, 1, 0, 0], 90.0, &[(O1, 1)]),
    constituent!("M1", [1, -1, 1, 1, 0], -90.0, &[(M1, 1)]),
    constituent!("P1", [1, 0, -1, 0, 0], 90.0, &[]),
    constituent!("S1", [1, 0, 0, 0, 0], 0.0, &[]),
    constituent!("K1", [1, 0, 1, 0, 0], -90.0, &[(K1, 1)]),
    constituent!("J1", [1, 1, 1, -1, 0], -90.0, &[(J1, 1)]),
    constituent!("OO1", [1, 2, 1, 0, 0], -90.0, &[(OO1, 1)]),
    // Semidiurnal
    constituent!("2N2", [2, -4, 2, 2, 0], 0.0, &[(M2, 1)]),
    constituent!("MU2", [2, -4, 4, 0, 0], 0.0, &[(M2, 1)]),
    constituent!("N2", [2, -3, 2, 1, 0], 0.0, &[(M2, 1)]),
    constituent!("NU2", [2, -3, 4, -1, 0], 0.0, &[(M2, 1)]),
    constituent!("M2", [2, -2, 2, 0, 0], 0.0, &[(M2, 1)]),
    constituent!("LAM2", [2, -1, 0, 1, 0], 180.0, &[(M2, 1)]),
    constituent!("L2", [2, -1, 2, -1, 0], 180.0, &[(L2, 1)]),
    constituent!("T2", [2, 0, -1, 0, 1], 0.0, &[]),
    constituent!("S2", [2, 0, 0, 0, 0], 0.0, &[]),
    constituent!("R2", [2, 0, 1, 0, -1], 180.0, &[]),
    constituent!("K2", [2, 0, 2, 0, 0], 0.0, &[(K2, 1)]),
    constituent!("2SM2", [2, 2, -2, 0, 0], 0.0, &[(M2, -1)]),
    // Terdiurnal
    constituent!("2MK3", [3, -4, 3, 0, 0], 90.0, &[(M2, 2), (K1, -1)]),
    constituent!("M3", [3, -3, 3, 0, 0], 0.0, &[(M3, 1)]),
    constituent!("MK3", [3, -2, 3, 0, 0], -90.0, &[(M2, 1), (K1, 1)]),
    // Shallow water
    constituent!("MN4", [4, -5, 4, 1, 0], 0.0, &[(M2, 2)]),
    constituent!("M4", [4, -4, 4, 0, 0], 0.0, &[(M2, 2)]),
    constituent!("MS4", [4, -2, 2, 0, 0], 0.0, &[(M2, 1)]),
    constituent!("S4", [4, 0, 0, 0, 0], 0.0, &[]),
    constituent!("M6", [6, -6, 6, 0, 0], 0.0, &[(M2, 3)]),
    constituent!("S6", [6, 0, 0, 0, 0], 0.0, &[]),
    constituent!("M8", [8, -8, 8, 0, 0], 0.0, &[(M2, 4)]),
];

/// Find a constituent by name, ignoring case and accepting common aliases.
pub fn lookup(name: &str) -> Option<&'static ConstituentDef> {
    let upper = name.trim().to_ascii_uppercase();
    let canonical = match upper.as_str() {
        "RHO" => "RHO1",
        "LAMBDA2" | "LDA2" => "LAM2",
        other => other,
    };
    TABLE.iter().find(|def| def.name == canonical)
}
