// SPDX-License-Identifier: AGPL-3.0-only

//! Dynamical and turbulence-dissipation timescales.

use crate::constants::{G, KM_PER_KPC, S_PER_GYR};
use std::f64::consts::PI;

/// Orbital dynamical time at radius `r` (kpc/h) enclosing mass `m_enc`
/// (Msun/h), in Gyr: t_dyn = 2π √(r³ / G M(<r)).
///
/// The h factors in r³ and M leave one net 1/h, which converts the comoving
/// unit system back to physical time.
pub fn t_dyn(r: f64, m_enc: f64, h: f64) -> f64 {
    2.0 * PI * (r.powi(3) / (G * m_enc)).sqrt() * KM_PER_KPC / h / S_PER_GYR
}

/// Turbulence dissipation timescale t_d = β t_dyn / 2 (the erratum
/// convention, where the factor 2 converts the orbital period to a
/// crossing time).
pub fn t_dissipation(r: f64, m_enc: f64, h: f64, beta: f64) -> f64 {
    0.5 * beta * t_dyn(r, m_enc, h)
}
