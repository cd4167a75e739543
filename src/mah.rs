// SPDX-License-Identifier: AGPL-3.0-only

//! Mass accretion histories and concentration models.
//!
//! A [`MassHistory`] is the evolution input: one halo's virial mass sampled
//! at decreasing redshift (increasing cosmic time). Histories come either
//! from external merger-tree catalogs (deserialized and validated here) or
//! from the built-in [`SyntheticMcBride`] generator, which draws smooth
//! McBride et al. (2009) growth tracks with per-halo scatter and is the
//! workhorse for tests and scaling scans.

use crate::cosmology::Cosmology;
use crate::error::NthPressError;
use crate::numeric::Lcg;
use crate::stats::{mean_and_std, percentile, AggregationMode};
use serde::{Deserialize, Serialize};

/// One halo's mass accretion history, ordered forward in cosmic time
/// (strictly decreasing redshift). Masses are virial masses in Msun/h.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassHistory {
    /// Redshift of each snapshot, strictly decreasing
    pub z: Vec<f64>,
    /// Cosmic age of each snapshot, Gyr
    pub t: Vec<f64>,
    /// Virial mass at each snapshot, Msun/h
    pub mass: Vec<f64>,
}

impl MassHistory {
    /// Build a history from (z, mass) samples, computing snapshot ages from
    /// the cosmology. Rejects histories that are too short, unordered, or
    /// carry non-finite or non-positive masses.
    pub fn new(cosmo: &Cosmology, z: Vec<f64>, mass: Vec<f64>) -> Result<Self, NthPressError> {
        if z.len() != mass.len() {
            return Err(NthPressError::MalformedHistory(format!(
                "{} redshifts but {} masses",
                z.len(),
                mass.len()
            )));
        }
        if z.len() < 4 {
            return Err(NthPressError::MalformedHistory(format!(
                "only {} snapshots; need at least 4",
                z.len()
            )));
        }
        if z.windows(2).any(|w| w[1] >= w[0]) {
            return Err(NthPressError::MalformedHistory(
                "redshifts must be strictly decreasing".into(),
            ));
        }
        if let Some(m) = mass.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
            return Err(NthPressError::MalformedHistory(format!(
                "non-positive or non-finite mass {m}"
            )));
        }
        let t = z.iter().map(|&zi| cosmo.age(zi)).collect();
        Ok(Self { z, t, mass })
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Final (observation) snapshot mass.
    pub fn final_mass(&self) -> f64 {
        *self.mass.last().unwrap_or(&f64::NAN)
    }

    /// Index of the first snapshot at or below `z_init`, where the
    /// relaxation integration starts. None when the whole history sits
    /// above `z_init`.
    pub fn first_index_below(&self, z_init: f64) -> Option<usize> {
        self.z.iter().position(|&z| z <= z_init)
    }

    /// Cosmic time when the halo first crossed a fraction `frac` of its
    /// mass at snapshot `i`, linearly interpolated between the bracketing
    /// snapshots. Falls back to the earliest snapshot time when the
    /// history never dips below the threshold.
    pub fn formation_time(&self, i: usize, frac: f64) -> f64 {
        let target = frac * self.mass[i];
        let Some(j) = self.mass[..=i].iter().position(|&m| m >= target) else {
            return self.t[i];
        };
        if j == 0 {
            return self.t[0];
        }
        let (m0, m1) = (self.mass[j - 1], self.mass[j]);
        let w = (target - m0) / (m1 - m0);
        self.t[j - 1] + w * (self.t[j] - self.t[j - 1])
    }
}

/// Concentration prescription applied along a history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConcentrationModel {
    /// Concentrations tabulated alongside the history (merger-tree input);
    /// must match the history length
    FromHistory(Vec<f64>),
    /// Zhao et al. (2009) mass-accretion-time model:
    /// c(t) = 4 [1 + (t / 3.4 t_04)^6.5]^(1/8), with t_04 the time the
    /// halo assembled 4% of its current mass
    MassAccretionTime,
    /// Duffy et al. (2008) mass-redshift fit for virial masses
    Duffy08,
}

impl ConcentrationModel {
    /// Concentration at snapshot `i` of `hist`.
    pub fn concentration(&self, hist: &MassHistory, i: usize) -> Result<f64, NthPressError> {
        match self {
            Self::FromHistory(c) => {
                if c.len() != hist.len() {
                    return Err(NthPressError::MissingConcentration);
                }
                let ci = c[i];
                if !(ci.is_finite() && ci > 0.0) {
                    return Err(NthPressError::InvalidParameter {
                        name: "concentration",
                        value: ci,
                    });
                }
                Ok(ci)
            }
            Self::MassAccretionTime => {
                let t04 = hist.formation_time(i, 0.04);
                let ratio = hist.t[i] / (3.4 * t04);
                Ok(4.0 * (1.0 + ratio.powf(6.5)).powf(1.0 / 8.0))
            }
            Self::Duffy08 => {
                let m = hist.mass[i];
                let z = hist.z[i];
                Ok(7.85 * (m / 2e12).powf(-0.081) * (1.0 + z).powf(-0.71))
            }
        }
    }
}

/// Source of mass accretion histories.
pub trait MahProvider {
    fn generate(&self, cosmo: &Cosmology) -> Result<Vec<MassHistory>, NthPressError>;
}

/// Synthetic McBride et al. (2009) growth tracks:
/// M(z) = M_obs (1+z)^b exp(-γ z), with γ drawn per halo around
/// `gamma_mean` with Gaussian scatter. Snapshots are uniform in cosmic
/// time between `z_max` and `z_obs`, matching merger-tree output cadence.
#[derive(Debug, Clone)]
pub struct SyntheticMcBride {
    /// Observation masses, one history per entry, Msun/h
    pub mass_obs: Vec<f64>,
    /// Observation redshift
    pub z_obs: f64,
    /// Earliest redshift sampled
    pub z_max: f64,
    /// Snapshots per history
    pub n_steps: usize,
    /// Power-law growth exponent b
    pub beta_slope: f64,
    /// Mean exponential growth rate γ
    pub gamma_mean: f64,
    /// Per-halo Gaussian scatter on γ
    pub gamma_scatter: f64,
    /// RNG seed; identical seeds give identical ensembles
    pub seed: u64,
}

impl SyntheticMcBride {
    /// Log-spaced ensemble of `n` masses between `m_lo` and `m_hi` at
    /// `z_obs = 0` with the fiducial McBride parameters.
    pub fn log_spaced(m_lo: f64, m_hi: f64, n: usize, seed: u64) -> Self {
        let lg_lo = m_lo.log10();
        let lg_hi = m_hi.log10();
        let mass_obs = (0..n)
            .map(|i| {
                let frac = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.5 };
                10f64.powf(lg_lo + frac * (lg_hi - lg_lo))
            })
            .collect();
        Self {
            mass_obs,
            z_obs: 0.0,
            z_max: 10.0,
            n_steps: 100,
            beta_slope: 0.1,
            gamma_mean: 0.6,
            gamma_scatter: 0.25,
            seed,
        }
    }
}

impl MahProvider for SyntheticMcBride {
    fn generate(&self, cosmo: &Cosmology) -> Result<Vec<MassHistory>, NthPressError> {
        if self.n_steps < 4 {
            return Err(NthPressError::InvalidParameter {
                name: "n_steps",
                value: self.n_steps as f64,
            });
        }
        if self.z_max <= self.z_obs {
            return Err(NthPressError::InvalidParameter {
                name: "z_max",
                value: self.z_max,
            });
        }
        let t_start = cosmo.age(self.z_max);
        let t_end = cosmo.age(self.z_obs);
        let dt = (t_end - t_start) / (self.n_steps - 1) as f64;
        let mut rng = Lcg::new(self.seed);
        let mut histories = Vec::with_capacity(self.mass_obs.len());
        for &m_obs in &self.mass_obs {
            // tracks shrink toward z_obs unless γ > b; the floor keeps
            // pathological draws monotonically growing
            let gamma =
                (self.gamma_mean + self.gamma_scatter * rng.gaussian()).max(2.0 * self.beta_slope);
            let mut z = Vec::with_capacity(self.n_steps);
            let mut mass = Vec::with_capacity(self.n_steps);
            for k in 0..self.n_steps {
                let zk = if k == self.n_steps - 1 {
                    self.z_obs
                } else {
                    cosmo.z_at_age(t_start + k as f64 * dt)
                };
                let dz = zk - self.z_obs;
                z.push(zk);
                mass.push(m_obs * (1.0 + dz).powf(self.beta_slope) * (-gamma * dz).exp());
            }
            histories.push(MassHistory::new(cosmo, z, mass)?);
        }
        Ok(histories)
    }
}

/// Summary accretion tracks of an ensemble: a central history bracketed
/// by lower and upper companions. Running all three through the
/// relaxation integrator gives summary f_nth trajectories; the evolution
/// is nonlinear in the history, so this is a different statistic from
/// aggregating individually evolved profiles.
#[derive(Debug, Clone)]
pub struct SummaryHistories {
    pub lower: MassHistory,
    pub central: MassHistory,
    pub upper: MassHistory,
}

/// Aggregate an ensemble of histories snapshot by snapshot. All histories
/// must share the redshift grid.
///
/// `Mean` brackets the mean with one standard deviation, `LogMean` does
/// the same in log mass, and `Median` brackets with the 16th and 84th
/// percentiles. A lower track driven to non-positive mass fails history
/// validation.
pub fn summary_histories(
    cosmo: &Cosmology,
    histories: &[MassHistory],
    mode: AggregationMode,
) -> Result<SummaryHistories, NthPressError> {
    let Some(first) = histories.first() else {
        return Err(NthPressError::MalformedHistory("empty ensemble".into()));
    };
    let z = &first.z;
    for h in histories {
        if h.len() != z.len()
            || h.z
                .iter()
                .zip(z)
                .any(|(a, b)| (a - b).abs() > 1e-10 * (1.0 + b.abs()))
        {
            return Err(NthPressError::MalformedHistory(
                "histories do not share a snapshot grid".into(),
            ));
        }
    }
    let n = z.len();
    let mut lower = Vec::with_capacity(n);
    let mut central = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    for j in 0..n {
        let column: Vec<f64> = histories.iter().map(|h| h.mass[j]).collect();
        let (lo, mid, hi) = match mode {
            AggregationMode::Mean => {
                let (m, s) = mean_and_std(&column);
                (m - s, m, m + s)
            }
            AggregationMode::LogMean => {
                // history validation guarantees positive masses
                let logs: Vec<f64> = column.iter().map(|m| m.ln()).collect();
                let (mu, s) = mean_and_std(&logs);
                ((mu - s).exp(), mu.exp(), (mu + s).exp())
            }
            AggregationMode::Median => (
                percentile(&column, 16.0),
                percentile(&column, 50.0),
                percentile(&column, 84.0),
            ),
        };
        lower.push(lo);
        central.push(mid);
        upper.push(hi);
    }
    Ok(SummaryHistories {
        lower: MassHistory::new(cosmo, z.clone(), lower)?,
        central: MassHistory::new(cosmo, z.clone(), central)?,
        upper: MassHistory::new(cosmo, z.clone(), upper)?,
    })
}
