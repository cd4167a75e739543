// SPDX-License-Identifier: AGPL-3.0-only

//! Physical constants in the crate unit system.
//!
//! Masses in Msun/h, lengths in physical kpc/h, velocities in km/s, times
//! in Gyr, temperatures in keV. Densities come out in Msun h²/kpc³.

/// Gravitational constant, kpc·(km/s)²/Msun.
pub const G: f64 = 4.300917270e-6;

/// Kilometres per kiloparsec.
pub const KM_PER_KPC: f64 = 3.0856775814913673e16;

/// Seconds per gigayear (Julian).
pub const S_PER_GYR: f64 = 3.1556952e16;

/// Hubble constant conversion: H0 [km/s/Mpc] × this = H0 [1/Gyr].
pub const H0_TO_INV_GYR: f64 = S_PER_GYR / (1.0e3 * KM_PER_KPC);

/// Critical density of the universe at z=0, Msun h²/kpc³.
pub const RHO_CRIT_0: f64 = 2.77536627e2;

/// Thomson cross-section over electron rest energy, kpc²·s²/(Msun·km²).
/// Converts ∫P_th dl (crate units) to the dimensionless Compton-y.
pub const SIGMA_T_BY_MEC2: f64 = 1.697e-18;

/// Proton rest energy conversion, keV/(km/s)²; turns μ·σ² into k_B·T.
pub const MP_KEV_BY_KMS2: f64 = 1.044e-5;

/// Mean molecular weight of the fully ionized intracluster plasma.
pub const MU_PLASMA: f64 = 0.6;
