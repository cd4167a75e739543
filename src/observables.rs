// SPDX-License-Identifier: AGPL-3.0-only

//! Synthetic Sunyaev-Zel'dovich observables.
//!
//! The thermal pressure profile is projected to a Compton-y profile by a
//! discrete Abel sum on the logarithmic radial grid, then integrated over
//! circular apertures to the spherically integrated Y_SZ. Apertures are
//! defined as multiples of spherical-overdensity radii, and each aperture
//! pairs Y_SZ with the halo mass under the same definition, which is what
//! the scaling-relation fits consume.

use crate::constants::SIGMA_T_BY_MEC2;
use crate::cosmology::{Cosmology, MassDefinition};
use crate::error::NthPressError;
use crate::integrator::FnthProfile;
use crate::numeric::{quad_adaptive, CubicSpline, QuadResult};
use crate::physics::nfw;
use crate::thermo::ThermoProfiles;
use crate::tolerances;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Line-of-sight Compton-y at each grid radius.
///
/// Discrete Abel projection on a log-spaced grid:
/// y(r_i) = σ_T/(m_e c²) Σ_{j>i} P_th(r_j) r_j² Δln r / √(r_j² - r_i²).
/// The outermost point has no shells beyond it and projects to zero, so
/// the grid must extend past the largest aperture of interest.
pub fn compton_y(radii: &[f64], p_thermal: &[f64]) -> Result<Vec<f64>, NthPressError> {
    let n = radii.len();
    if n < 3 || p_thermal.len() != n {
        return Err(NthPressError::InvalidParameter {
            name: "projection_grid",
            value: n as f64,
        });
    }
    let dlnr = (radii[1] / radii[0]).ln();
    // the Abel sum weights assume constant logarithmic spacing
    if radii
        .windows(2)
        .any(|w| ((w[1] / w[0]).ln() - dlnr).abs() > 1e-8 * dlnr.abs())
    {
        return Err(NthPressError::InvalidParameter {
            name: "projection_grid_spacing",
            value: dlnr,
        });
    }
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = 0.0;
        for j in i + 1..n {
            sum += p_thermal[j] * radii[j] * radii[j] * dlnr
                / (radii[j] * radii[j] - radii[i] * radii[i]).sqrt();
        }
        y[i] = SIGMA_T_BY_MEC2 * sum;
    }
    Ok(y)
}

/// Spherically integrated Compton parameter within `r_ap`:
/// Y = 2π ∫ y(r) r dr, in (kpc/h)², with the quadrature's convergence
/// state. Rejects apertures outside the tabulated grid.
pub fn y_sz(radii: &[f64], y: &[f64], r_ap: f64) -> Result<QuadResult, NthPressError> {
    let integrand: Vec<f64> = radii.iter().zip(y).map(|(&r, &yi)| yi * r).collect();
    let spline = CubicSpline::new(radii, &integrand).ok_or(NthPressError::InvalidParameter {
        name: "projection_grid",
        value: radii.len() as f64,
    })?;
    let lo = radii[0];
    let outer = *radii.last().unwrap_or(&lo);
    if r_ap <= lo || r_ap > outer * (1.0 + 1e-9) {
        return Err(NthPressError::InvalidParameter {
            name: "aperture_radius",
            value: r_ap,
        });
    }
    let q = quad_adaptive(|r| spline.eval(r), lo, r_ap.min(outer), tolerances::QUAD_REL);
    Ok(QuadResult {
        value: 2.0 * PI * q.value,
        abs_err: 2.0 * PI * q.abs_err,
        converged: q.converged,
    })
}

/// One measurement aperture: a multiple of a spherical-overdensity radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aperture {
    pub def: MassDefinition,
    pub radius_multiplier: f64,
}

impl Aperture {
    pub fn label(&self) -> String {
        format!("{}R_{}", self.radius_multiplier, self.def.label())
    }
}

/// The standard aperture battery spanning cluster interiors out to the
/// infall region: R_vir, 1-5 R_500c, and 0.5-2 R_200m.
pub fn aperture_battery() -> Vec<Aperture> {
    let mut out = vec![Aperture {
        def: MassDefinition::Vir,
        radius_multiplier: 1.0,
    }];
    for m in [1.0, 2.0, 3.0, 4.0, 5.0] {
        out.push(Aperture {
            def: MassDefinition::Critical(500),
            radius_multiplier: m,
        });
    }
    for m in [0.5, 0.875, 1.0, 1.25, 1.625, 2.0] {
        out.push(Aperture {
            def: MassDefinition::Mean(200),
            radius_multiplier: m,
        });
    }
    out
}

/// SZ and X-ray observables of one halo through one aperture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaloObservables {
    pub aperture: Aperture,
    /// NFW mass enclosed within the aperture radius, Msun/h
    pub mass: f64,
    /// Aperture radius, kpc/h
    pub r_aperture: f64,
    /// Integrated Compton parameter, (kpc/h)²
    pub y_sz: f64,
    /// Gas-mass-weighted temperature within the aperture, keV
    pub t_mgas: f64,
    /// Gas mass within the aperture, Msun/h
    pub m_gas: f64,
    /// False when any quadrature behind these values hit its depth limit;
    /// the values then carry best available estimates
    pub quad_converged: bool,
}

/// Measure one evolved halo through one aperture. The reported mass is
/// the NFW mass integrated out to the full aperture radius, so apertures
/// with a radius multiplier pair Y_SZ with the mass actually enclosed.
pub fn observe_halo(
    cosmo: &Cosmology,
    evolved: &FnthProfile,
    thermo: &ThermoProfiles,
    y: &[f64],
    ap: &Aperture,
) -> Result<HaloObservables, NthPressError> {
    let (_m_def, r_def, _c_def) = cosmo.change_mass_definition(
        evolved.mass,
        evolved.c,
        evolved.z,
        MassDefinition::Vir,
        ap.def,
    )?;
    let r_ap = ap.radius_multiplier * r_def;
    let ysz = y_sz(&thermo.radii, y, r_ap)?;
    let t_mgas = thermo.mass_weighted_temperature(r_ap)?;
    let m_gas = thermo.gas_mass(r_ap);
    Ok(HaloObservables {
        aperture: *ap,
        mass: nfw::enclosed_mass(evolved.mass, evolved.c, evolved.radius, r_ap),
        r_aperture: r_ap,
        y_sz: ysz.value,
        t_mgas: t_mgas.value,
        m_gas: m_gas.value,
        quad_converged: thermo.quad_converged && ysz.converged && t_mgas.converged && m_gas.converged,
    })
}
