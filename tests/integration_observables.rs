// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests for the observable half of the pipeline: evolved
//! halos through Compton-y projection, aperture photometry, and the
//! Y_SZ-M fit.

use nthpress::cosmology::{Cosmology, MassDefinition};
use nthpress::integrator::{evolve_ensemble, EvolutionParams, FnthProfile, RadialGrid};
use nthpress::mah::{ConcentrationModel, MahProvider, SyntheticMcBride};
use nthpress::observables::{aperture_battery, compton_y, observe_halo, Aperture, HaloObservables};
use nthpress::stats::fit_power_law;
use nthpress::thermo::ThermoProfiles;

fn evolved_ensemble(n: usize, seed: u64) -> (Cosmology, Vec<FnthProfile>) {
    let cosmo = Cosmology::planck18();
    let grid = RadialGrid::observable();
    let histories = SyntheticMcBride::log_spaced(5e13, 2e15, n, seed)
        .generate(&cosmo)
        .expect("gen");
    let evolved = evolve_ensemble(
        &cosmo,
        &histories,
        &ConcentrationModel::MassAccretionTime,
        &EvolutionParams::default(),
        &grid,
    )
    .into_iter()
    .collect::<Result<Vec<_>, _>>()
    .expect("ensemble");
    (cosmo, evolved)
}

fn measure(cosmo: &Cosmology, p: &FnthProfile, ap: &Aperture) -> HaloObservables {
    let t = ThermoProfiles::from_evolved(cosmo, p).expect("thermo");
    let y = compton_y(&t.radii, &t.p_thermal).expect("projection");
    observe_halo(cosmo, p, &t, &y, ap).expect("observe")
}

#[test]
fn y_sz_mass_relation_is_near_self_similar() {
    let (cosmo, evolved) = evolved_ensemble(50, 2024);
    let ap = Aperture {
        def: MassDefinition::Critical(500),
        radius_multiplier: 1.0,
    };
    let mut masses = Vec::new();
    let mut ys = Vec::new();
    for p in &evolved {
        let obs = measure(&cosmo, p, &ap);
        masses.push(obs.mass);
        ys.push(obs.y_sz);
    }
    let fit = fit_power_law(&masses, &ys).expect("fit");
    let self_similar = 5.0 / 3.0;
    assert!(
        ((fit.slope - self_similar) / self_similar).abs() < 0.08,
        "slope = {} vs self-similar {self_similar}",
        fit.slope
    );
    assert_eq!(fit.n_excluded, 0);
    // accretion-history scatter at fixed mass stays modest
    assert!(fit.scatter_pct < 30.0, "scatter = {}%", fit.scatter_pct);
}

#[test]
fn wider_apertures_reduce_fractional_scatter_growth() {
    // Y_SZ through every battery aperture must be positive and must grow
    // with the aperture for the same definition
    let (cosmo, evolved) = evolved_ensemble(12, 88);
    for p in &evolved {
        let mut last = 0.0;
        for ap in aperture_battery()
            .into_iter()
            .filter(|a| a.def == MassDefinition::Mean(200))
        {
            let obs = measure(&cosmo, p, &ap);
            assert!(obs.y_sz > last, "{}: Y = {}", ap.label(), obs.y_sz);
            last = obs.y_sz;
        }
    }
}

#[test]
fn temperature_scales_like_two_thirds_power() {
    // T_mgas ∝ M^(2/3) for self-similar halos, softened slightly by the
    // mass dependence of concentration and f_nth
    let (cosmo, evolved) = evolved_ensemble(40, 61);
    let ap = Aperture {
        def: MassDefinition::Critical(500),
        radius_multiplier: 1.0,
    };
    let mut masses = Vec::new();
    let mut temps = Vec::new();
    for p in &evolved {
        let obs = measure(&cosmo, p, &ap);
        masses.push(obs.mass);
        temps.push(obs.t_mgas);
    }
    let fit = fit_power_law(&masses, &temps).expect("fit");
    assert!(
        fit.slope > 0.5 && fit.slope < 0.85,
        "T_mgas-M slope = {}",
        fit.slope
    );
}

#[test]
fn gas_mass_tracks_total_mass_linearly() {
    let (cosmo, evolved) = evolved_ensemble(30, 3);
    let ap = Aperture {
        def: MassDefinition::Vir,
        radius_multiplier: 1.0,
    };
    let mut masses = Vec::new();
    let mut gas = Vec::new();
    for p in &evolved {
        let obs = measure(&cosmo, p, &ap);
        masses.push(obs.mass);
        gas.push(obs.m_gas);
    }
    let fit = fit_power_law(&masses, &gas).expect("fit");
    assert!(
        (fit.slope - 1.0).abs() < 0.02,
        "M_gas-M_vir slope = {}",
        fit.slope
    );
    // normalization is the cosmic baryon fraction
    let fb = cosmo.baryon_fraction();
    let implied = fit.predict(1e14) / 1e14;
    assert!(((implied - fb) / fb).abs() < 0.02, "implied f_b = {implied}");
}

#[test]
fn nonthermal_pressure_suppresses_y_sz() {
    // turning the source term off makes all pressure thermal, so Y rises
    let cosmo = Cosmology::planck18();
    let grid = RadialGrid::observable();
    let histories = SyntheticMcBride::log_spaced(3e14, 3e14, 1, 19)
        .generate(&cosmo)
        .expect("gen");
    let ap = Aperture {
        def: MassDefinition::Critical(500),
        radius_multiplier: 1.0,
    };
    let mut y_by_eta = Vec::new();
    for eta in [0.0, 0.7] {
        let params = EvolutionParams {
            eta,
            ..EvolutionParams::default()
        };
        let evolved = evolve_ensemble(
            &cosmo,
            &histories,
            &ConcentrationModel::MassAccretionTime,
            &params,
            &grid,
        )
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("ensemble");
        y_by_eta.push(measure(&cosmo, &evolved[0], &ap).y_sz);
    }
    assert!(
        y_by_eta[1] < y_by_eta[0],
        "Y with f_nth = {} not below thermal-only Y = {}",
        y_by_eta[1],
        y_by_eta[0]
    );
}
