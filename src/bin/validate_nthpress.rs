// SPDX-License-Identifier: AGPL-3.0-only

//! End-to-end validation of the nonthermal pressure pipeline.
//!
//! # Validation targets
//!
//! | Observable | Expected | Basis |
//! |-----------|----------|-------|
//! | Planck18 age(0) | 13.8 Gyr | Planck 2018 cosmology |
//! | M_gas(R_vir) / f_b M_vir | 1.0 | Gas normalization identity |
//! | f_nth(R_vir), 1e14 Msun/h | 0.05-0.30 | Shi & Komatsu (2014) fig. 2 range |
//! | f_nth outward gradient | > 0 | Central dissipation is fastest |
//! | η = 0 run | f_nth ≡ 0 | No source term, pure decay |
//! | Y_SZ-M_500c slope | 5/3 ± a few % | Self-similar scaling |
//! | Ensemble determinism | bit-exact | Seeded LCG everywhere |

use nthpress::cosmology::{Cosmology, MassDefinition};
use nthpress::integrator::{evolve_ensemble, evolve_fnth, EvolutionParams, RadialGrid};
use nthpress::mah::{ConcentrationModel, MahProvider, SyntheticMcBride};
use nthpress::observables::{aperture_battery, compton_y, observe_halo};
use nthpress::numeric::quad_adaptive;
use nthpress::physics::komatsu_seljak::GasProfile;
use nthpress::physics::nfw;
use nthpress::stats::fit_power_law;
use nthpress::thermo::ThermoProfiles;
use nthpress::tolerances;
use nthpress::validation::ValidationHarness;
use std::time::Instant;

fn main() {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Nonthermal Pressure Pipeline Validation                     ║");
    println!("║  Shi & Komatsu (2014) relaxation model + Y_SZ-M scaling      ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let mut harness = ValidationHarness::new("nthpress");
    let t_start = Instant::now();
    let cosmo = Cosmology::planck18();

    // ═══ Cosmology and halo-structure identities ═══
    println!("═══ Cosmology and Halo Structure ═══");
    {
        let age0 = cosmo.age(0.0);
        println!("  age(z=0):      {age0:.4} Gyr (expected ~13.8)");
        harness.check_rel("Planck18 age(0)", age0, 13.8, 0.02);

        let m = 1e14;
        let rvir = match cosmo.m_to_r(m, 0.0, MassDefinition::Vir) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("virial radius failed: {e}");
                std::process::exit(1);
            }
        };
        println!("  R_vir(1e14):   {rvir:.1} kpc/h");
        harness.check_window("R_vir(1e14) kpc/h", rvir, (700.0, 1500.0));

        match GasProfile::new(m, rvir, 6.0, cosmo.baryon_fraction()) {
            Ok(gas) => {
                let m_gas = gas.enclosed_gas_mass(rvir);
                let ratio = m_gas.value / (cosmo.baryon_fraction() * m);
                println!("  M_gas(R)/f_b M: {ratio:.6} (expected 1.0)");
                harness.check_rel(
                    "gas mass normalization",
                    ratio,
                    1.0,
                    tolerances::GAS_MASS_ROUNDTRIP_REL,
                );
                harness.check_bool(
                    "gas profile quadratures converged",
                    gas.quad_converged && m_gas.converged,
                );

                // NFW closed-form enclosed mass vs direct shell integration
                match nfw::fundamental_parameters(m, 6.0, rvir) {
                    Ok((rho_s, rs)) => {
                        let shells = quad_adaptive(
                            |r| 4.0 * std::f64::consts::PI * r * r * nfw::density(r, rho_s, rs),
                            0.0,
                            0.5 * rvir,
                            tolerances::QUAD_REL,
                        );
                        let closed = nfw::enclosed_mass(m, 6.0, rvir, 0.5 * rvir);
                        println!("  M_NFW(<R/2):   shells/closed = {:.6}", shells.value / closed);
                        harness.check_rel(
                            "NFW enclosed mass vs shell integral",
                            shells.value,
                            closed,
                            tolerances::GAS_MASS_ROUNDTRIP_REL,
                        );
                    }
                    Err(e) => {
                        eprintln!("NFW parameters failed: {e}");
                        harness.check_bool("NFW fundamental parameters", false);
                    }
                }
            }
            Err(e) => {
                eprintln!("gas profile failed: {e}");
                harness.check_bool("gas profile construction", false);
            }
        }
    }
    println!();

    // ═══ Relaxation evolution ═══
    println!("═══ Nonthermal Fraction Evolution ═══");
    let grid = match RadialGrid::log_spaced(0.01, 3.0, 100) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("grid construction failed: {e}");
            std::process::exit(1);
        }
    };
    let params = EvolutionParams::default();
    let model = ConcentrationModel::MassAccretionTime;
    {
        // fiducial mean-growth track: the f_nth window is calibrated to it
        let mut gen = SyntheticMcBride::log_spaced(1e14, 1e14, 1, 42);
        gen.gamma_scatter = 0.0;
        let hist = match gen.generate(&cosmo) {
            Ok(h) => h,
            Err(e) => {
                eprintln!("history generation failed: {e}");
                std::process::exit(1);
            }
        };
        match evolve_fnth(&cosmo, &hist[0], &model, &params, &grid) {
            Ok(p) => {
                let f_vir = p.f_nth_at(1.0);
                let f_inner = p.f_nth_at(0.1);
                println!("  f_nth(0.1 R_vir): {f_inner:.4}");
                println!("  f_nth(R_vir):     {f_vir:.4}");
                harness.check_window("f_nth(R_vir)", f_vir, tolerances::FNTH_RVIR_WINDOW);
                harness.check_lower("f_nth outward gradient", f_vir - f_inner, 0.0);
                let f = p.f_nth();
                harness.check_bool(
                    "f_nth bounded in [0,1]",
                    f.iter().all(|&v| (0.0..=1.0).contains(&v)),
                );
            }
            Err(e) => {
                eprintln!("evolution failed: {e}");
                harness.check_bool("evolution", false);
            }
        }

        let no_source = EvolutionParams { eta: 0.0, ..params };
        match evolve_fnth(&cosmo, &hist[0], &model, &no_source, &grid) {
            Ok(p) => {
                let max = p.f_nth().into_iter().fold(0.0f64, f64::max);
                println!("  max f_nth, η=0:   {max:.2e} (expected 0)");
                harness.check_abs("eta=0 pure decay", max, 0.0, tolerances::NEAR_ZERO_EXPECTED);
            }
            Err(e) => {
                eprintln!("eta=0 evolution failed: {e}");
                harness.check_bool("eta=0 evolution", false);
            }
        }
    }
    println!();

    // ═══ Scaling relation ═══
    println!("═══ Y_SZ-M_500c Scaling ═══");
    {
        let gen = SyntheticMcBride::log_spaced(5e13, 2e15, 60, 2024);
        let run = |seed_gen: &SyntheticMcBride| -> Option<(Vec<f64>, Vec<f64>, bool)> {
            let histories = seed_gen.generate(&cosmo).ok()?;
            let evolved = evolve_ensemble(&cosmo, &histories, &model, &params, &grid);
            let ap = aperture_battery()[1]; // 1 R_500c
            let mut masses = Vec::new();
            let mut ys = Vec::new();
            let mut all_converged = true;
            for (i, r) in evolved.iter().enumerate() {
                match r {
                    Ok(p) => {
                        let thermo = ThermoProfiles::from_evolved(&cosmo, p).ok()?;
                        let y = compton_y(&thermo.radii, &thermo.p_thermal).ok()?;
                        let obs = observe_halo(&cosmo, p, &thermo, &y, &ap).ok()?;
                        all_converged &= obs.quad_converged;
                        masses.push(obs.mass);
                        ys.push(obs.y_sz);
                    }
                    Err(e) => println!("  halo {i} excluded: {e}"),
                }
            }
            Some((masses, ys, all_converged))
        };

        match run(&gen) {
            Some((masses, ys, all_converged)) => match fit_power_law(&masses, &ys) {
                Ok(fit) => {
                    println!(
                        "  slope:   {:.4} (self-similar 5/3 = {:.4})",
                        fit.slope,
                        5.0 / 3.0
                    );
                    println!(
                        "  scatter: {:.2}% (robust {:.2}%), {} used / {} excluded",
                        fit.scatter_pct, fit.robust_scatter_pct, fit.n_used, fit.n_excluded
                    );
                    harness.check_rel(
                        "Y_SZ-M_500c slope vs self-similar",
                        fit.slope,
                        5.0 / 3.0,
                        0.08,
                    );
                    harness.check_upper("Y_SZ-M_500c scatter pct", fit.scatter_pct, 30.0);
                    harness.check_lower("fit sample size", fit.n_used as f64, 50.0);
                    harness.check_bool("aperture quadratures converged", all_converged);
                }
                Err(e) => {
                    eprintln!("fit failed: {e}");
                    harness.check_bool("scaling fit", false);
                }
            },
            None => harness.check_bool("scaling pipeline", false),
        }

        // determinism: identical seeds give bit-identical evolved states
        let a = gen.generate(&cosmo).ok().map(|h| {
            evolve_ensemble(&cosmo, &h[..4], &model, &params, &grid)
        });
        let b = gen.generate(&cosmo).ok().map(|h| {
            evolve_ensemble(&cosmo, &h[..4], &model, &params, &grid)
        });
        let identical = match (a, b) {
            (Some(ra), Some(rb)) => ra.iter().zip(rb.iter()).all(|(x, y)| match (x, y) {
                (Ok(px), Ok(py)) => px
                    .sig2_nth
                    .iter()
                    .zip(&py.sig2_nth)
                    .all(|(u, v)| u.to_bits() == v.to_bits()),
                _ => false,
            }),
            _ => false,
        };
        harness.check_bool("seeded ensemble is bit-deterministic", identical);
    }

    println!();
    println!("Total wall time: {:.2}s", t_start.elapsed().as_secs_f64());
    harness.finish();
}
