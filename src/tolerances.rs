// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized numeric tolerances with physical justification.
//!
//! Every tolerance threshold used in tests and validation binaries is
//! defined here with documentation of its origin. No ad-hoc magic numbers.

// ═══════════════════════════════════════════════════════════════════
// Machine-precision tolerances (IEEE 754 f64)
// ═══════════════════════════════════════════════════════════════════

/// Tolerance for operations that should be exact in f64 arithmetic.
///
/// f64 has ~15.9 significant digits; 1e-10 allows a few digits of
/// accumulated rounding in compositions of closed-form expressions.
pub const EXACT_F64: f64 = 1e-10;

/// Threshold below which an expected value is treated as zero when
/// forming relative errors.
pub const NEAR_ZERO_EXPECTED: f64 = 1e-12;

// ═══════════════════════════════════════════════════════════════════
// Quadrature tolerances
// ═══════════════════════════════════════════════════════════════════

/// Relative tolerance for adaptive quadrature of smooth profile integrands
/// (gas-density normalization, enclosed gas mass, Y_SZ aperture integral).
///
/// 1e-6 relative keeps quadrature error two orders of magnitude below the
/// percent-level scatter statistics consumed downstream.
pub const QUAD_REL: f64 = 1e-6;

/// Acceptance tolerance for the gas-mass normalization round-trip
/// M_gas(<R_ref) = f_b · M. The round-trip composes two independent
/// quadratures, so the threshold is looser than [`QUAD_REL`].
pub const GAS_MASS_ROUNDTRIP_REL: f64 = 1e-4;

// ═══════════════════════════════════════════════════════════════════
// Statistical recovery tolerances
// ═══════════════════════════════════════════════════════════════════

/// Relative accuracy for recovering an injected power-law slope from
/// N >= 1000 synthetic samples with log-normal scatter.
pub const SLOPE_RECOVERY_REL: f64 = 0.01;

/// Relative accuracy for recovering injected fractional scatter; sample
/// standard deviation of N=1000 draws fluctuates at the few-percent level.
pub const SCATTER_RECOVERY_REL: f64 = 0.10;

// ═══════════════════════════════════════════════════════════════════
// Physical-model sanity windows
// ═══════════════════════════════════════════════════════════════════

/// Expected window for f_nth(R_vir) of the fiducial cluster: 1e14 Msun/h
/// at z=0 on the mean McBride growth track with beta=1.0, eta=0.7
/// (Shi & Komatsu 2014 style results). Individual scattered accretion
/// draws can land outside it.
pub const FNTH_RVIR_WINDOW: (f64, f64) = (0.05, 0.30);
