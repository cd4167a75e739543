// SPDX-License-Identifier: AGPL-3.0-only

//! nthpress: nonthermal pressure in galaxy cluster halos and its imprint
//! on Sunyaev-Zel'dovich scaling relations.
//!
//! The pipeline runs in four stages:
//!
//! 1. **Histories** ([`mah`]): mass accretion histories, either external
//!    merger-tree tracks or synthetic McBride growth curves, with a choice
//!    of concentration model along the track.
//! 2. **Evolution** ([`integrator`]): the Shi & Komatsu (2014) relaxation
//!    equation for the nonthermal velocity dispersion, stepped across
//!    snapshots on a fixed fractional radial grid.
//! 3. **Thermodynamics** ([`thermo`], [`observables`]): polytropic gas
//!    profiles partitioned by the evolved nonthermal fraction, projected
//!    to Compton-y and integrated to Y_SZ through overdensity apertures.
//! 4. **Statistics** ([`stats`]): power-law Y_SZ-M fits with standard and
//!    robust scatter, bootstrap confidence intervals, and ensemble
//!    profile aggregation.
//!
//! Everything is CPU-side f64; ensembles parallelize over halos with
//! rayon. Evolved ensembles can be persisted through [`cache`] to keep
//! parameter scans cheap.

pub mod cache;
pub mod constants;
pub mod cosmology;
pub mod error;
pub mod integrator;
pub mod mah;
pub mod numeric;
pub mod observables;
pub mod physics;
pub mod stats;
pub mod thermo;
pub mod tolerances;
pub mod validation;

pub use cosmology::{Cosmology, MassDefinition};
pub use error::NthPressError;
pub use integrator::{evolve_ensemble, evolve_fnth, EvolutionParams, FnthProfile, RadialGrid};
pub use mah::{
    summary_histories, ConcentrationModel, MahProvider, MassHistory, SummaryHistories,
    SyntheticMcBride,
};
