// SPDX-License-Identifier: AGPL-3.0-only

//! Komatsu & Seljak (2001, 2002) polytropic gas model in an NFW potential.
//!
//! The gas is assumed in hydrostatic equilibrium with a polytropic equation
//! of state P ∝ ρ^Γ, with the polytropic index Γ(c) and mass-temperature
//! normalization η0(c) fit so that the gas traces the dark matter in the
//! halo outskirts. Both fits are functions of concentration only.
//!
//! Everything here is expressed against the dimensionless radius x = r/R,
//! where R is the halo's definition radius, so profiles can be evaluated on
//! a fixed fractional grid across snapshots.

use crate::constants::G;
use crate::error::NthPressError;
use crate::numeric::{quad_adaptive, QuadResult};
use crate::physics::nfw;
use crate::tolerances;
use std::f64::consts::PI;

/// Polytropic index Γ(c), Komatsu & Seljak (2002) eq. 25 fit.
pub fn gamma(c: f64) -> f64 {
    1.15 + 0.01 * (c - 6.5)
}

/// Normalization η0(c), Komatsu & Seljak (2002) eq. 26 fit.
pub fn eta0(c: f64) -> f64 {
    let d = c - 6.5;
    0.00676 * d * d + 0.206 * d + 2.48
}

/// Polytropic gas profile for one halo snapshot.
///
/// Construction normalizes the central gas density ρ0 so that the enclosed
/// gas mass at the definition radius equals f_b times the halo mass.
#[derive(Debug, Clone)]
pub struct GasProfile {
    /// Halo mass, Msun/h
    pub mass: f64,
    /// Definition radius, kpc/h
    pub radius: f64,
    /// Concentration
    pub c: f64,
    /// Polytropic index Γ(c)
    pub gamma: f64,
    /// Normalization η0(c)
    pub eta0: f64,
    /// Central gas density, Msun h²/kpc³
    rho0: f64,
    /// False when the ρ0 normalization quadrature hit its depth limit;
    /// ρ0 then carries the best available estimate
    pub quad_converged: bool,
}

impl GasProfile {
    pub fn new(mass: f64, radius: f64, c: f64, baryon_fraction: f64) -> Result<Self, NthPressError> {
        if !(c > 0.0) {
            return Err(NthPressError::InvalidParameter {
                name: "concentration",
                value: c,
            });
        }
        if !(mass > 0.0) {
            return Err(NthPressError::InvalidParameter {
                name: "mass",
                value: mass,
            });
        }
        let mut p = Self {
            mass,
            radius,
            c,
            gamma: gamma(c),
            eta0: eta0(c),
            rho0: 0.0,
            quad_converged: true,
        };
        // ρ0 = f_b M / (4π R³ ∫₀¹ θ(x)^{1/(Γ-1)} x² dx)
        let exp = 1.0 / (p.gamma - 1.0);
        let shape = quad_adaptive(
            |x| p.theta(x).max(0.0).powf(exp) * x * x,
            0.0,
            1.0,
            tolerances::QUAD_REL,
        );
        p.rho0 = baryon_fraction * mass / (4.0 * PI * radius.powi(3) * shape.value);
        p.quad_converged = shape.converged;
        Ok(p)
    }

    /// Dimensionless NFW potential at x = r/R, normalized so φ(0) = -c/f(c).
    fn phi(&self, x: f64) -> f64 {
        let c = self.c;
        if x <= 1e-12 {
            return -c / nfw::f(c);
        }
        -(c / nfw::f(c)) * (1.0 + c * x).ln() / (c * x)
    }

    /// Dimensionless temperature profile θ(x) = T(x)/T(0).
    ///
    /// θ = 1 + ((Γ-1)/Γ)(3/η0)(φ0 - φ(x)); monotonically decreasing from 1
    /// at the center. Can go negative far outside R for high concentrations;
    /// callers evaluating beyond the definition radius should clamp.
    pub fn theta(&self, x: f64) -> f64 {
        let phi0 = -self.c / nfw::f(self.c);
        1.0 + (self.gamma - 1.0) / self.gamma * 3.0 / self.eta0 * (phi0 - self.phi(x))
    }

    /// Total (thermal + nonthermal) 1D velocity dispersion squared at x,
    /// km²/s². σ²_tot = θ(x) η0 G M / (3R); the h factors in M and R cancel.
    pub fn sig2_tot(&self, x: f64) -> f64 {
        self.theta(x).max(0.0) * self.eta0 * G * self.mass / (3.0 * self.radius)
    }

    /// Gas density at x, Msun h²/kpc³.
    pub fn rho_gas(&self, x: f64) -> f64 {
        self.rho0 * self.theta(x).max(0.0).powf(1.0 / (self.gamma - 1.0))
    }

    /// Total pressure at x, Msun h² kpc⁻³ km² s⁻²: P_tot = ρ_gas σ²_tot.
    pub fn p_tot(&self, x: f64) -> f64 {
        self.rho_gas(x) * self.sig2_tot(x)
    }

    /// Gas mass enclosed within r (kpc/h), Msun/h, with the quadrature's
    /// convergence state.
    pub fn enclosed_gas_mass(&self, r: f64) -> QuadResult {
        let exp = 1.0 / (self.gamma - 1.0);
        let shape = quad_adaptive(
            |x| self.theta(x).max(0.0).powf(exp) * x * x,
            0.0,
            r / self.radius,
            tolerances::QUAD_REL,
        );
        let scale = 4.0 * PI * self.rho0 * self.radius.powi(3);
        QuadResult {
            value: scale * shape.value,
            abs_err: scale * shape.abs_err,
            converged: shape.converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosmology::{Cosmology, MassDefinition};

    fn test_profile() -> GasProfile {
        let cosmo = Cosmology::planck18();
        let m = 1e14;
        let r = cosmo.m_to_r(m, 0.0, MassDefinition::Vir).expect("vir");
        GasProfile::new(m, r, 6.0, cosmo.baryon_fraction()).expect("profile")
    }

    #[test]
    fn polytropic_fits_at_reference_concentration() {
        // at c = 6.5 both fits reduce to their constant terms
        assert!((gamma(6.5) - 1.15).abs() < tolerances::EXACT_F64);
        assert!((eta0(6.5) - 2.48).abs() < tolerances::EXACT_F64);
    }

    #[test]
    fn theta_is_one_at_center_and_decreasing() {
        let p = test_profile();
        assert!((p.theta(0.0) - 1.0).abs() < tolerances::EXACT_F64);
        let mut prev = p.theta(1e-6);
        for i in 1..=20 {
            let x = 0.1 * i as f64;
            let cur = p.theta(x);
            assert!(cur < prev, "θ({x}) = {cur} not < {prev}");
            prev = cur;
        }
        assert!(p.theta(1.0) > 0.0, "θ(1) must stay positive for cluster halos");
    }

    #[test]
    fn gas_mass_normalization() {
        // enclosed gas mass at R equals f_b M by construction
        let cosmo = Cosmology::planck18();
        let p = test_profile();
        let expected = cosmo.baryon_fraction() * p.mass;
        let got = p.enclosed_gas_mass(p.radius);
        assert!(got.converged);
        assert!(
            ((got.value - expected) / expected).abs() < tolerances::GAS_MASS_ROUNDTRIP_REL,
            "M_gas(R) = {}, expected {expected}",
            got.value
        );
    }

    #[test]
    fn smooth_profile_quadratures_converge() {
        let p = test_profile();
        assert!(p.quad_converged);
        assert!(p.enclosed_gas_mass(0.3 * p.radius).converged);
    }

    #[test]
    fn velocity_dispersion_scale() {
        // σ_tot for a 1e14 Msun/h cluster is several hundred km/s
        let p = test_profile();
        let sig = p.sig2_tot(0.5).sqrt();
        assert!(sig > 300.0 && sig < 1500.0, "σ_tot(0.5R) = {sig} km/s");
    }

    #[test]
    fn gas_density_decreases_outward() {
        let p = test_profile();
        assert!(p.rho_gas(0.1) > p.rho_gas(0.5));
        assert!(p.rho_gas(0.5) > p.rho_gas(1.0));
    }

    #[test]
    fn total_pressure_is_density_times_dispersion() {
        let p = test_profile();
        for x in [0.1, 0.5, 1.0] {
            let expect = p.rho_gas(x) * p.sig2_tot(x);
            assert!((p.p_tot(x) - expect).abs() <= tolerances::EXACT_F64 * expect);
        }
        assert!(p.p_tot(0.1) > p.p_tot(1.0));
    }
}
