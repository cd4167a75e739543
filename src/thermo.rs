// SPDX-License-Identifier: AGPL-3.0-only

//! Thermodynamic gas profiles of an evolved halo.
//!
//! The total pressure is set by the polytropic gas model, P_tot = ρ_gas
//! σ²_tot; the evolved nonthermal fraction partitions it into thermal and
//! nonthermal parts, P_th = (1 - f_nth) P_tot. Temperatures are thermal:
//! only the thermal dispersion contributes to T_gas.
//!
//! Pressure carries the crate's native units, Msun h² kpc⁻³ km² s⁻²; the
//! Compton-y normalization constant in [`crate::constants`] absorbs the
//! conversion to cgs.

use crate::constants::{MP_KEV_BY_KMS2, MU_PLASMA};
use crate::cosmology::Cosmology;
use crate::error::NthPressError;
use crate::integrator::FnthProfile;
use crate::numeric::{quad_adaptive, CubicSpline, QuadResult};
use crate::physics::komatsu_seljak::GasProfile;
use crate::tolerances;

/// Gas temperature in keV from the thermal part of the dispersion:
/// T = μ m_p (1 - f_nth) σ²_tot / k_B.
pub fn temperature_kev(f_nth: f64, sig2_tot: f64) -> f64 {
    MU_PLASMA * MP_KEV_BY_KMS2 * (1.0 - f_nth) * sig2_tot
}

/// Radial thermodynamic profiles of one evolved halo at its final snapshot.
#[derive(Debug, Clone)]
pub struct ThermoProfiles {
    /// Physical radii, kpc/h
    pub radii: Vec<f64>,
    /// Thermal pressure, Msun h² kpc⁻³ km² s⁻²
    pub p_thermal: Vec<f64>,
    /// Total pressure, same units
    pub p_total: Vec<f64>,
    /// Gas temperature, keV
    pub t_gas: Vec<f64>,
    /// Gas density, Msun h²/kpc³
    pub rho_gas: Vec<f64>,
    /// False when the gas normalization quadrature hit its depth limit
    pub quad_converged: bool,
    gas: GasProfile,
}

impl ThermoProfiles {
    /// Evaluate the gas model on the evolved halo's grid.
    pub fn from_evolved(cosmo: &Cosmology, p: &FnthProfile) -> Result<Self, NthPressError> {
        let gas = GasProfile::new(p.mass, p.radius, p.c, cosmo.baryon_fraction())?;
        let f_nth = p.f_nth();
        let n = p.fractions.len();
        let mut radii = Vec::with_capacity(n);
        let mut p_thermal = Vec::with_capacity(n);
        let mut p_total = Vec::with_capacity(n);
        let mut t_gas = Vec::with_capacity(n);
        let mut rho_gas = Vec::with_capacity(n);
        for j in 0..n {
            let x = p.fractions[j];
            let rho = gas.rho_gas(x);
            let p_tot = rho * p.sig2_tot[j];
            radii.push(x * p.radius);
            rho_gas.push(rho);
            p_total.push(p_tot);
            p_thermal.push((1.0 - f_nth[j]) * p_tot);
            t_gas.push(temperature_kev(f_nth[j], p.sig2_tot[j]));
        }
        Ok(Self {
            radii,
            p_thermal,
            p_total,
            t_gas,
            rho_gas,
            quad_converged: gas.quad_converged,
            gas,
        })
    }

    /// Gas mass enclosed within `r_ap` (kpc/h), Msun/h, with the
    /// quadrature's convergence state.
    pub fn gas_mass(&self, r_ap: f64) -> QuadResult {
        self.gas.enclosed_gas_mass(r_ap)
    }

    /// Gas-mass-weighted temperature within `r_ap`, keV:
    /// ∫ T ρ_gas r² dr / ∫ ρ_gas r² dr over [r_min, r_ap]. Rejects
    /// apertures outside the tabulated grid.
    pub fn mass_weighted_temperature(&self, r_ap: f64) -> Result<QuadResult, NthPressError> {
        let weight: Vec<f64> = self
            .radii
            .iter()
            .zip(&self.rho_gas)
            .map(|(&r, &rho)| rho * r * r)
            .collect();
        let weighted: Vec<f64> = self
            .t_gas
            .iter()
            .zip(&weight)
            .map(|(&t, &w)| t * w)
            .collect();
        let num_spline = CubicSpline::new(&self.radii, &weighted)
            .ok_or(NthPressError::InvalidParameter {
                name: "aperture_grid",
                value: self.radii.len() as f64,
            })?;
        let den_spline = CubicSpline::new(&self.radii, &weight)
            .ok_or(NthPressError::InvalidParameter {
                name: "aperture_grid",
                value: self.radii.len() as f64,
            })?;
        let lo = self.radii[0];
        let outer = *self.radii.last().unwrap_or(&lo);
        if r_ap <= lo || r_ap > outer * (1.0 + 1e-9) {
            return Err(NthPressError::InvalidParameter {
                name: "aperture_radius",
                value: r_ap,
            });
        }
        let hi = r_ap.min(outer);
        let num = quad_adaptive(|r| num_spline.eval(r), lo, hi, tolerances::QUAD_REL);
        let den = quad_adaptive(|r| den_spline.eval(r), lo, hi, tolerances::QUAD_REL);
        let value = num.value / den.value;
        // first-order propagation of the two quadrature error estimates
        let abs_err = (num.abs_err + value.abs() * den.abs_err) / den.value.abs();
        Ok(QuadResult {
            value,
            abs_err,
            converged: num.converged && den.converged,
        })
    }
}
