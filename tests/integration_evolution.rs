// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests for the history-to-f_nth half of the pipeline.

use nthpress::cosmology::Cosmology;
use nthpress::integrator::{evolve_ensemble, evolve_fnth, EvolutionParams, RadialGrid};
use nthpress::mah::{
    summary_histories, ConcentrationModel, MahProvider, MassHistory, SyntheticMcBride,
};
use nthpress::stats::{aggregate_profiles, AggregationMode};

fn setup() -> (Cosmology, RadialGrid, EvolutionParams) {
    (
        Cosmology::planck18(),
        RadialGrid::log_spaced(0.01, 3.0, 80).expect("grid"),
        EvolutionParams::default(),
    )
}

#[test]
fn faster_accretion_carries_more_nonthermal_pressure() {
    // late, rapid growth is what sources σ²_nth; a steeper McBride γ
    // must leave a larger f_nth at z = 0
    let (cosmo, grid, params) = setup();
    let model = ConcentrationModel::MassAccretionTime;
    let mut fnth = Vec::new();
    for gamma in [0.3, 0.6, 0.9] {
        let mut gen = SyntheticMcBride::log_spaced(2e14, 2e14, 1, 7);
        gen.gamma_mean = gamma;
        gen.gamma_scatter = 0.0;
        let hist = &gen.generate(&cosmo).expect("gen")[0];
        let p = evolve_fnth(&cosmo, hist, &model, &params, &grid).expect("evolution");
        fnth.push(p.f_nth_at(0.5));
    }
    assert!(
        fnth[0] < fnth[1] && fnth[1] < fnth[2],
        "f_nth(0.5 R_vir) not increasing with accretion rate: {fnth:?}"
    );
}

#[test]
fn all_concentration_models_agree_on_broad_shape() {
    let (cosmo, grid, params) = setup();
    let gen = SyntheticMcBride::log_spaced(2e14, 2e14, 1, 13);
    let hist = &gen.generate(&cosmo).expect("gen")[0];
    let zhao = ConcentrationModel::MassAccretionTime;
    let duffy = ConcentrationModel::Duffy08;
    let tabulated = {
        // feed the Zhao predictions back in as a tabulated track
        let c: Vec<f64> = (0..hist.len())
            .map(|i| zhao.concentration(hist, i).expect("c"))
            .collect();
        ConcentrationModel::FromHistory(c)
    };
    let mut at_rvir = Vec::new();
    for model in [&zhao, &duffy, &tabulated] {
        let p = evolve_fnth(&cosmo, hist, model, &params, &grid).expect("evolution");
        let f = p.f_nth_at(1.0);
        assert!(f > 0.02 && f < 0.5, "f_nth(R_vir) = {f} out of range");
        at_rvir.push(f);
    }
    // the tabulated track reproduces Zhao exactly
    assert_eq!(at_rvir[0], at_rvir[2]);
}

#[test]
fn strided_integration_converges_to_full_cadence() {
    let (cosmo, grid, params) = setup();
    let model = ConcentrationModel::MassAccretionTime;
    let mut gen = SyntheticMcBride::log_spaced(3e14, 3e14, 1, 31);
    gen.n_steps = 400;
    let hist = &gen.generate(&cosmo).expect("gen")[0];
    let full = evolve_fnth(&cosmo, hist, &model, &params, &grid).expect("evolution");
    let strided = evolve_fnth(
        &cosmo,
        hist,
        &model,
        &EvolutionParams { stride: 4, ..params },
        &grid,
    )
    .expect("evolution");
    // quadrupling the Euler step on a dense history moves f_nth little
    for frac in [0.1, 0.5, 1.0] {
        let (a, b) = (full.f_nth_at(frac), strided.f_nth_at(frac));
        assert!(
            ((a - b) / a).abs() < 0.05,
            "stride 4 drifted at {frac} R_vir: {a} vs {b}"
        );
    }
}

#[test]
fn ensemble_median_profile_is_smooth_and_rising() {
    let (cosmo, grid, params) = setup();
    let gen = SyntheticMcBride::log_spaced(8e13, 8e14, 30, 5);
    let histories = gen.generate(&cosmo).expect("gen");
    let evolved: Vec<_> = evolve_ensemble(
        &cosmo,
        &histories,
        &ConcentrationModel::MassAccretionTime,
        &params,
        &grid,
    )
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .expect("ensemble");

    let profiles: Vec<Vec<f64>> = evolved.iter().map(|p| p.f_nth()).collect();
    let median = aggregate_profiles(&profiles, AggregationMode::Median).expect("median");
    let mean = aggregate_profiles(&profiles, AggregationMode::Mean).expect("mean");

    // median f_nth rises outward over the interior grid
    let i_inner = grid.fractions.iter().position(|&x| x > 0.1).expect("grid");
    let i_vir = grid.fractions.iter().position(|&x| x >= 1.0).expect("grid");
    assert!(median.values[i_vir] > median.values[i_inner]);
    // mean and median track each other for a well-behaved ensemble
    let (m, md) = (mean.values[i_vir], median.values[i_vir]);
    assert!((m - md).abs() / md < 0.5, "mean {m} vs median {md}");
}

#[test]
fn log_mean_aggregation_reports_dropped_zeros() {
    let (cosmo, grid, _) = setup();
    // η = 0 forces f_nth ≡ 0, which the geometric mean must drop
    let params = EvolutionParams {
        eta: 0.0,
        ..EvolutionParams::default()
    };
    let gen = SyntheticMcBride::log_spaced(1e14, 2e14, 3, 9);
    let histories = gen.generate(&cosmo).expect("gen");
    let profiles: Vec<Vec<f64>> = evolve_ensemble(
        &cosmo,
        &histories,
        &ConcentrationModel::MassAccretionTime,
        &params,
        &grid,
    )
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .expect("ensemble")
    .iter()
    .map(|p| p.f_nth())
    .collect();
    let agg = aggregate_profiles(&profiles, AggregationMode::LogMean).expect("logmean");
    assert_eq!(agg.n_dropped, 3 * grid.fractions.len());
    assert!(agg.values.iter().all(|&v| v == 0.0));
}

#[test]
fn summary_tracks_evolve_into_ordered_fnth_profiles() {
    // average-then-evolve: aggregate the ensemble into lower/central/upper
    // accretion tracks and run each through the integrator. The lower
    // track carries less early mass, so it accretes faster toward z = 0
    // and keeps more nonthermal pressure than the upper track.
    let (cosmo, grid, params) = setup();
    let model = ConcentrationModel::MassAccretionTime;
    let gen = SyntheticMcBride::log_spaced(2e14, 2e14, 40, 23);
    let histories = gen.generate(&cosmo).expect("gen");
    let s = summary_histories(&cosmo, &histories, AggregationMode::LogMean).expect("summary");

    let f_at_rvir = |h: &MassHistory| -> f64 {
        let p = evolve_fnth(&cosmo, h, &model, &params, &grid).expect("evolution");
        assert!(p.f_nth().iter().all(|&v| (0.0..=1.0).contains(&v)));
        p.f_nth_at(1.0)
    };
    let f_lower = f_at_rvir(&s.lower);
    let f_central = f_at_rvir(&s.central);
    let f_upper = f_at_rvir(&s.upper);
    assert!(
        f_lower > f_central && f_central > f_upper,
        "f_nth(R_vir) not ordered by accretion rate: {f_lower} / {f_central} / {f_upper}"
    );

    // the central-track evolution is not the ensemble mean of the evolved
    // profiles: the relaxation equation does not commute with averaging
    let evolved: Vec<Vec<f64>> = evolve_ensemble(&cosmo, &histories, &model, &params, &grid)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("ensemble")
        .iter()
        .map(|p| p.f_nth())
        .collect();
    let mean_evolved = aggregate_profiles(&evolved, AggregationMode::Mean).expect("mean");
    let i_vir = grid.fractions.iter().position(|&x| x >= 1.0).expect("grid");
    assert!((f_central - mean_evolved.values[i_vir]).abs() > 1e-6);
}

#[test]
fn short_history_below_z_init_still_evolves() {
    let (cosmo, grid, params) = setup();
    // hand-built history starting just under z_init
    let z: Vec<f64> = (0..20).map(|i| 5.5 * (1.0 - i as f64 / 19.0)).collect();
    let mass: Vec<f64> = (0..20).map(|i| 1e13 * (1.0 + i as f64)).collect();
    let hist = MassHistory::new(&cosmo, z, mass).expect("history");
    let p = evolve_fnth(
        &cosmo,
        &hist,
        &ConcentrationModel::MassAccretionTime,
        &params,
        &grid,
    )
    .expect("evolution");
    assert!(p.f_nth().iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert_eq!(p.z, 0.0);
}
