// SPDX-License-Identifier: AGPL-3.0-only

//! Navarro-Frenk-White density profile.
//!
//! The profile is parameterized here by its fundamental pair (ρ_s, r_s);
//! a spherical-overdensity mass (M, c, R) maps onto it via
//! ρ_s = M / (4π r_s³ f(c)) with r_s = R/c.

use crate::error::NthPressError;
use std::f64::consts::PI;

/// NFW shape function f(x) = ln(1+x) - x/(1+x).
///
/// Monotonically increasing, f(0) = 0. Appears in every enclosed-mass and
/// potential expression for the profile.
pub fn f(x: f64) -> f64 {
    (1.0 + x).ln() - x / (1.0 + x)
}

/// Characteristic density ρ_s (Msun h²/kpc³) and scale radius r_s (kpc/h)
/// for a halo of mass `m` (Msun/h), concentration `c`, and definition
/// radius `r` (kpc/h).
pub fn fundamental_parameters(m: f64, c: f64, r: f64) -> Result<(f64, f64), NthPressError> {
    if !(c > 0.0) {
        return Err(NthPressError::InvalidParameter {
            name: "concentration",
            value: c,
        });
    }
    if !(r > 0.0) {
        return Err(NthPressError::InvalidParameter {
            name: "radius",
            value: r,
        });
    }
    let rs = r / c;
    let rho_s = m / (4.0 * PI * rs.powi(3) * f(c));
    Ok((rho_s, rs))
}

/// Mass enclosed within radius `r` for a halo of mass `m`, concentration
/// `c`, and definition radius `r_def`. Exact for the NFW profile:
/// M(<r) = M f(c r/R) / f(c).
pub fn enclosed_mass(m: f64, c: f64, r_def: f64, r: f64) -> f64 {
    m * f(c * r / r_def) / f(c)
}

/// Local density at radius `r` (kpc/h) for fundamental parameters
/// (ρ_s, r_s): ρ(r) = ρ_s / [(r/r_s)(1 + r/r_s)²].
pub fn density(r: f64, rho_s: f64, rs: f64) -> f64 {
    let x = r / rs;
    rho_s / (x * (1.0 + x) * (1.0 + x))
}
