// SPDX-License-Identifier: AGPL-3.0-only

//! Halo structure kernels: NFW mass profiles, the Komatsu-Seljak polytropic
//! gas model, and dynamical timescales.

pub mod komatsu_seljak;
pub mod nfw;
pub mod timescale;
