// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for halo evolution and observable computation.
//!
//! Replaces `Result<_, String>` in public APIs with a proper enum so callers
//! can pattern-match on failure modes (bad physical parameters, malformed
//! accretion history) rather than parsing opaque strings. Per-halo failures
//! in ensemble mode are reported with the halo's index and never abort
//! sibling computations.

use std::fmt;

/// Errors arising from halo model evaluation or accretion-history handling.
#[derive(Debug, Clone, PartialEq)]
pub enum NthPressError {
    /// A physical parameter is outside its valid domain (non-positive mass,
    /// concentration, or radius; polytropic exponent singular).
    InvalidParameter {
        /// Parameter name as it appears in the API
        name: &'static str,
        /// Offending value
        value: f64,
    },

    /// An accretion history failed validation (redshift ordering, NaN mass,
    /// too few snapshots after truncation to z <= z_init).
    MalformedHistory(String),

    /// A concentration value was requested from a history that does not
    /// carry tabulated concentrations.
    MissingConcentration,

    /// Cache record could not be read or written (wraps IO/serde message).
    Cache(String),
}

impl fmt::Display for NthPressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid physical parameter {name} = {value}")
            }
            Self::MalformedHistory(msg) => write!(f, "Malformed accretion history: {msg}"),
            Self::MissingConcentration => {
                write!(
                    f,
                    "Accretion history carries no tabulated concentrations; \
                     use a derived concentration model"
                )
            }
            Self::Cache(msg) => write!(f, "Cache access failed: {msg}"),
        }
    }
}

impl std::error::Error for NthPressError {}
