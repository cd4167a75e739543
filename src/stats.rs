// SPDX-License-Identifier: AGPL-3.0-only

//! Scaling-relation fits and ensemble statistics.
//!
//! The Y_SZ-M relation is fit as a power law by ordinary least squares in
//! log10-log10 space. Scatter is reported two ways: the standard deviation
//! of the log residuals converted to percent, and a robust percentile
//! width (P84 - P16)/2 that ignores tails. Confidence intervals come from
//! a seeded bootstrap so scan output is reproducible.

use crate::error::NthPressError;
use crate::numeric::Lcg;
use serde::{Deserialize, Serialize};

/// Power-law fit y = 10^norm x^slope with residual scatter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerLawFit {
    pub slope: f64,
    /// log10 normalization (intercept of the log-log fit)
    pub norm_log10: f64,
    /// Percent scatter from the residual standard deviation
    pub scatter_pct: f64,
    /// Percent scatter from (P84 - P16)/2 of the residuals
    pub robust_scatter_pct: f64,
    /// Pairs used in the fit
    pub n_used: usize,
    /// Pairs dropped for non-finite or non-positive values
    pub n_excluded: usize,
}

impl PowerLawFit {
    /// Predicted y at x.
    pub fn predict(&self, x: f64) -> f64 {
        10f64.powf(self.norm_log10) * x.powf(self.slope)
    }
}

/// Convert a dex scatter to percent: (10^σ - 1) · 100.
fn dex_to_pct(sigma_dex: f64) -> f64 {
    (10f64.powf(sigma_dex) - 1.0) * 100.0
}

/// OLS power-law fit in log10 space. Pairs with a non-positive or
/// non-finite member are excluded and counted; at least 3 usable pairs
/// are required.
pub fn fit_power_law(x: &[f64], y: &[f64]) -> Result<PowerLawFit, NthPressError> {
    if x.len() != y.len() {
        return Err(NthPressError::InvalidParameter {
            name: "fit_lengths",
            value: y.len() as f64,
        });
    }
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(&xi, &yi)| xi.is_finite() && yi.is_finite() && xi > 0.0 && yi > 0.0)
        .map(|(&xi, &yi)| (xi.log10(), yi.log10()))
        .collect();
    let n_excluded = x.len() - pairs.len();
    let n = pairs.len();
    if n < 3 {
        return Err(NthPressError::InvalidParameter {
            name: "fit_points",
            value: n as f64,
        });
    }
    let nf = n as f64;
    let sx: f64 = pairs.iter().map(|p| p.0).sum();
    let sy: f64 = pairs.iter().map(|p| p.1).sum();
    let sxx: f64 = pairs.iter().map(|p| p.0 * p.0).sum();
    let sxy: f64 = pairs.iter().map(|p| p.0 * p.1).sum();
    let denom = nf * sxx - sx * sx;
    if denom.abs() < 1e-300 {
        return Err(NthPressError::InvalidParameter {
            name: "fit_mass_range",
            value: denom,
        });
    }
    let slope = (nf * sxy - sx * sy) / denom;
    let norm = (sy - slope * sx) / nf;

    let resids: Vec<f64> = pairs.iter().map(|&(lx, ly)| ly - (norm + slope * lx)).collect();
    let mean_r = resids.iter().sum::<f64>() / nf;
    let var = resids.iter().map(|r| (r - mean_r).powi(2)).sum::<f64>() / nf;
    let p16 = percentile(&resids, 16.0);
    let p84 = percentile(&resids, 84.0);

    Ok(PowerLawFit {
        slope,
        norm_log10: norm,
        scatter_pct: dex_to_pct(var.sqrt()),
        robust_scatter_pct: dex_to_pct(0.5 * (p84 - p16)),
        n_used: n,
        n_excluded,
    })
}

/// Percentile of a sample by linear interpolation between order statistics.
/// `p` in [0, 100]. Returns NaN for empty input.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = rank - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Mean and standard deviation of a sample. NaN for empty input.
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Bootstrap distribution of the sample mean: draw `sample_size` values
/// from `values` with replacement, `n_resamples` times, and return each
/// resample's mean. `sample_size` is independent of the input length, so
/// a large per-halo pool can be resampled at the size of an observed
/// cluster sample. Seeded and deterministic; summarize the output with
/// [`mean_and_std`] or [`percentile`].
pub fn bootstrap_resample(
    values: &[f64],
    n_resamples: usize,
    sample_size: usize,
    seed: u64,
) -> Result<Vec<f64>, NthPressError> {
    if values.is_empty() {
        return Err(NthPressError::InvalidParameter {
            name: "sample_values",
            value: 0.0,
        });
    }
    if n_resamples == 0 {
        return Err(NthPressError::InvalidParameter {
            name: "n_resamples",
            value: 0.0,
        });
    }
    if sample_size == 0 {
        return Err(NthPressError::InvalidParameter {
            name: "sample_size",
            value: 0.0,
        });
    }
    let mut rng = Lcg::new(seed);
    let mut means = Vec::with_capacity(n_resamples);
    for _ in 0..n_resamples {
        let mut sum = 0.0;
        for _ in 0..sample_size {
            sum += values[rng.index(values.len())];
        }
        means.push(sum / sample_size as f64);
    }
    Ok(means)
}

/// Bootstrap 16-84 confidence interval on the fit's percent scatter:
/// resample halo pairs with replacement `n_resamples` times and take the
/// percentile band of the refit scatters. Seeded and deterministic.
pub fn bootstrap_scatter_pct(
    x: &[f64],
    y: &[f64],
    n_resamples: usize,
    seed: u64,
) -> Result<(f64, f64), NthPressError> {
    if n_resamples == 0 {
        return Err(NthPressError::InvalidParameter {
            name: "n_resamples",
            value: 0.0,
        });
    }
    // validate the full sample up front
    fit_power_law(x, y)?;
    let n = x.len();
    let mut rng = Lcg::new(seed);
    let mut scatters = Vec::with_capacity(n_resamples);
    let mut rx = vec![0.0; n];
    let mut ry = vec![0.0; n];
    for _ in 0..n_resamples {
        for k in 0..n {
            let i = rng.index(n);
            rx[k] = x[i];
            ry[k] = y[i];
        }
        // a degenerate resample (all one halo) is skipped, not fatal
        if let Ok(fit) = fit_power_law(&rx, &ry) {
            scatters.push(fit.scatter_pct);
        }
    }
    if scatters.len() < 2 {
        return Err(NthPressError::InvalidParameter {
            name: "bootstrap_resamples_usable",
            value: scatters.len() as f64,
        });
    }
    Ok((percentile(&scatters, 16.0), percentile(&scatters, 84.0)))
}

/// How per-radius ensemble profiles are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationMode {
    Mean,
    Median,
    /// Geometric mean; non-positive values are dropped and counted
    LogMean,
}

/// Per-radius aggregate of an ensemble of profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedProfile {
    pub values: Vec<f64>,
    /// Values dropped by [`AggregationMode::LogMean`] for being
    /// non-positive, summed over all radii
    pub n_dropped: usize,
}

/// Aggregate equally-gridded profiles point by point. All profiles must
/// share the grid length.
pub fn aggregate_profiles(
    profiles: &[Vec<f64>],
    mode: AggregationMode,
) -> Result<AggregatedProfile, NthPressError> {
    let Some(first) = profiles.first() else {
        return Err(NthPressError::InvalidParameter {
            name: "ensemble_size",
            value: 0.0,
        });
    };
    let len = first.len();
    if profiles.iter().any(|p| p.len() != len) {
        return Err(NthPressError::InvalidParameter {
            name: "profile_grid_length",
            value: len as f64,
        });
    }
    let mut values = Vec::with_capacity(len);
    let mut n_dropped = 0;
    for j in 0..len {
        let column: Vec<f64> = profiles.iter().map(|p| p[j]).collect();
        let v = match mode {
            AggregationMode::Mean => column.iter().sum::<f64>() / column.len() as f64,
            AggregationMode::Median => percentile(&column, 50.0),
            AggregationMode::LogMean => {
                let logs: Vec<f64> =
                    column.iter().filter(|&&v| v > 0.0).map(|v| v.ln()).collect();
                n_dropped += column.len() - logs.len();
                if logs.is_empty() {
                    0.0
                } else {
                    (logs.iter().sum::<f64>() / logs.len() as f64).exp()
                }
            }
        };
        values.push(v);
    }
    Ok(AggregatedProfile { values, n_dropped })
}

/// Lower/central/upper percentile band of an ensemble of profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileBand {
    pub lower: Vec<f64>,
    pub median: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Per-radius percentile band across equally-gridded profiles, typically
/// 16/84 around the median.
pub fn profile_band(
    profiles: &[Vec<f64>],
    lo_pct: f64,
    hi_pct: f64,
) -> Result<ProfileBand, NthPressError> {
    let Some(first) = profiles.first() else {
        return Err(NthPressError::InvalidParameter {
            name: "ensemble_size",
            value: 0.0,
        });
    };
    let len = first.len();
    if profiles.iter().any(|p| p.len() != len) {
        return Err(NthPressError::InvalidParameter {
            name: "profile_grid_length",
            value: len as f64,
        });
    }
    let mut band = ProfileBand {
        lower: Vec::with_capacity(len),
        median: Vec::with_capacity(len),
        upper: Vec::with_capacity(len),
    };
    for j in 0..len {
        let column: Vec<f64> = profiles.iter().map(|p| p[j]).collect();
        band.lower.push(percentile(&column, lo_pct));
        band.median.push(percentile(&column, 50.0));
        band.upper.push(percentile(&column, hi_pct));
    }
    Ok(band)
}
