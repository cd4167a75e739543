// SPDX-License-Identifier: AGPL-3.0-only

//! Explicit flat-ΛCDM cosmology parameter objects and spherical-overdensity
//! mass definitions.
//!
//! Cosmology is a plain immutable value threaded through every call. There
//! is no ambient "current cosmology" singleton, so ensemble runs can be
//! parallelized and cosmologies swapped between runs without races.
//!
//! Units follow [`crate::constants`]: masses Msun/h, radii physical kpc/h,
//! densities Msun h²/kpc³, times Gyr.

use crate::constants::{H0_TO_INV_GYR, RHO_CRIT_0};
use crate::error::NthPressError;
use crate::physics::nfw;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Flat ΛCDM parameter set. Ω_Λ = 1 − Ω_m; radiation neglected (the model
/// is only evaluated at z <= ~10 where radiation is irrelevant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cosmology {
    /// Short name used in cache keys and scan output
    pub name: String,
    /// Hubble constant, km/s/Mpc
    pub h0: f64,
    /// Matter density parameter at z=0
    pub om0: f64,
    /// Baryon density parameter at z=0
    pub ob0: f64,
    /// Power-spectrum normalization (carried for provenance; not used by
    /// the evolution core, which consumes externally generated histories)
    pub sigma8: f64,
    /// Scalar spectral index (provenance only)
    pub ns: f64,
}

impl Cosmology {
    /// WMAP 5-year parameters.
    pub fn wmap5() -> Self {
        Self {
            name: "WMAP5".into(),
            h0: 70.2,
            om0: 0.272,
            ob0: 0.0455,
            sigma8: 0.817,
            ns: 0.961,
        }
    }

    /// Planck 2018 parameters.
    pub fn planck18() -> Self {
        Self {
            name: "planck18".into(),
            h0: 67.66,
            om0: 0.3111,
            ob0: 0.049,
            sigma8: 0.8102,
            ns: 0.9665,
        }
    }

    /// Perturbed copy with a different Ω_m (cosmology battery for scans).
    pub fn with_om0(&self, name: &str, om0: f64) -> Self {
        Self {
            name: name.into(),
            om0,
            ..self.clone()
        }
    }

    /// Perturbed copy with a different σ8.
    pub fn with_sigma8(&self, name: &str, sigma8: f64) -> Self {
        Self {
            name: name.into(),
            sigma8,
            ..self.clone()
        }
    }

    /// Perturbed copy with a different H0.
    pub fn with_h0(&self, name: &str, h0: f64) -> Self {
        Self {
            name: name.into(),
            h0,
            ..self.clone()
        }
    }

    /// Dimensionless Hubble parameter h = H0/100.
    pub fn h(&self) -> f64 {
        self.h0 / 100.0
    }

    /// Dark-energy density parameter (flatness).
    pub fn ode0(&self) -> f64 {
        1.0 - self.om0
    }

    /// Cosmic baryon fraction f_b = Ω_b/Ω_m.
    pub fn baryon_fraction(&self) -> f64 {
        self.ob0 / self.om0
    }

    /// E(z) = H(z)/H0 for flat matter+Λ.
    pub fn e_z(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        (self.om0 * zp1.powi(3) + self.ode0()).sqrt()
    }

    /// Matter density parameter at redshift z.
    pub fn omega_m_z(&self, z: f64) -> f64 {
        let zp1 = 1.0 + z;
        self.om0 * zp1.powi(3) / self.e_z(z).powi(2)
    }

    /// Cosmic age at redshift z in Gyr (closed form for flat matter+Λ).
    pub fn age(&self, z: f64) -> f64 {
        let h0_gyr = self.h0 * H0_TO_INV_GYR;
        let ol = self.ode0();
        if ol <= 0.0 {
            // Einstein-de Sitter limit
            return 2.0 / (3.0 * h0_gyr) * (1.0 + z).powf(-1.5);
        }
        let arg = (ol / self.om0).sqrt() * (1.0 + z).powf(-1.5);
        2.0 / (3.0 * h0_gyr * ol.sqrt()) * arg.asinh()
    }

    /// Lookback time to redshift z in Gyr.
    pub fn lookback_time(&self, z: f64) -> f64 {
        self.age(0.0) - self.age(z)
    }

    /// Invert age(z) by bisection; `t` in Gyr must lie within (0, age(0)].
    pub fn z_at_age(&self, t: f64) -> f64 {
        let (mut lo, mut hi) = (0.0_f64, 30.0_f64);
        // age is monotonically decreasing in z
        for _ in 0..80 {
            let mid = 0.5 * (lo + hi);
            if self.age(mid) > t {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    /// Critical density at redshift z, Msun h²/kpc³.
    pub fn rho_crit(&self, z: f64) -> f64 {
        RHO_CRIT_0 * self.e_z(z).powi(2)
    }

    /// Mean matter density at redshift z, Msun h²/kpc³.
    pub fn rho_m(&self, z: f64) -> f64 {
        RHO_CRIT_0 * self.om0 * (1.0 + z).powi(3)
    }

    /// Spherical-overdensity radius for mass `m` (Msun/h) at `z`, kpc/h.
    pub fn m_to_r(&self, m: f64, z: f64, def: MassDefinition) -> Result<f64, NthPressError> {
        if !(m > 0.0) {
            return Err(NthPressError::InvalidParameter {
                name: "mass",
                value: m,
            });
        }
        let rho_ref = def.reference_density(self, z);
        Ok((3.0 * m / (4.0 * PI * rho_ref)).powf(1.0 / 3.0))
    }

    /// Convert an NFW halo between mass definitions.
    ///
    /// Given (m, c) under `def_in` at `z`, finds the radius where the mean
    /// enclosed NFW density matches `def_out`'s threshold (bisection on the
    /// monotonically decreasing mean-density profile) and returns
    /// (m_out, r_out, c_out).
    pub fn change_mass_definition(
        &self,
        m: f64,
        c: f64,
        z: f64,
        def_in: MassDefinition,
        def_out: MassDefinition,
    ) -> Result<(f64, f64, f64), NthPressError> {
        if !(c > 0.0) {
            return Err(NthPressError::InvalidParameter {
                name: "concentration",
                value: c,
            });
        }
        let r_in = self.m_to_r(m, z, def_in)?;
        let (rho_s, rs) = nfw::fundamental_parameters(m, c, r_in)?;
        let rho_target = def_out.reference_density(self, z);
        // mean enclosed density at R: 3 ρ_s f(R/rs) (rs/R)³
        let mean_density = |r: f64| 3.0 * rho_s * nfw::f(r / rs) * (rs / r).powi(3);
        let (mut lo, mut hi) = (1e-3 * r_in, 1e2 * r_in);
        if mean_density(lo) < rho_target || mean_density(hi) > rho_target {
            return Err(NthPressError::InvalidParameter {
                name: "overdensity_bracket",
                value: rho_target,
            });
        }
        for _ in 0..200 {
            let mid = 0.5 * (lo + hi);
            if mean_density(mid) > rho_target {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let r_out = 0.5 * (lo + hi);
        let m_out = 4.0 * PI / 3.0 * rho_target * r_out.powi(3);
        Ok((m_out, r_out, r_out / rs))
    }
}

/// Spherical-overdensity mass definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MassDefinition {
    /// Bryan & Norman (1998) virial overdensity w.r.t. critical density
    Vir,
    /// Fixed overdensity w.r.t. critical density (200c, 500c, ...)
    Critical(u32),
    /// Fixed overdensity w.r.t. mean matter density (200m, ...)
    Mean(u32),
}

impl MassDefinition {
    /// Parse labels like "vir", "500c", "200m".
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        if s == "vir" {
            return Some(Self::Vir);
        }
        let (num, suffix) = s.split_at(s.len().checked_sub(1)?);
        let delta: u32 = num.parse().ok()?;
        match suffix {
            "c" => Some(Self::Critical(delta)),
            "m" => Some(Self::Mean(delta)),
            _ => None,
        }
    }

    /// Display label ("vir", "500c", "200m").
    pub fn label(&self) -> String {
        match self {
            Self::Vir => "vir".into(),
            Self::Critical(d) => format!("{d}c"),
            Self::Mean(d) => format!("{d}m"),
        }
    }

    /// The definition's density threshold at redshift z, Msun h²/kpc³.
    pub fn reference_density(&self, cosmo: &Cosmology, z: f64) -> f64 {
        match self {
            Self::Vir => {
                // Bryan & Norman (1998) fit for flat cosmologies
                let x = cosmo.omega_m_z(z) - 1.0;
                let delta = 18.0 * PI * PI + 82.0 * x - 39.0 * x * x;
                delta * cosmo.rho_crit(z)
            }
            Self::Critical(d) => f64::from(*d) * cosmo.rho_crit(z),
            Self::Mean(d) => f64::from(*d) * cosmo.rho_m(z),
        }
    }
}
