// SPDX-License-Identifier: AGPL-3.0-only

//! Parameter scan of the Y_SZ-M scaling relation.
//!
//! Evolves one seeded synthetic ensemble per (β, η) point, measures every
//! halo through the full aperture battery, fits the power law per
//! aperture, and writes the results as JSON. Evolved ensembles are cached
//! on disk keyed by cosmology and parameters, so re-runs that only change
//! the fit side are cheap.
//!
//! Usage:
//!   scaling_scan [--halos N] [--seed S] [--out PATH] [--cache DIR] [--quick]

use nthpress::cache::EvolvedCache;
use nthpress::cosmology::Cosmology;
use nthpress::integrator::{evolve_ensemble, EvolutionParams, FnthProfile, RadialGrid};
use nthpress::mah::{ConcentrationModel, MahProvider, SyntheticMcBride};
use nthpress::observables::{aperture_battery, compton_y, observe_halo};
use nthpress::stats::{bootstrap_scatter_pct, fit_power_law};
use nthpress::thermo::ThermoProfiles;
use serde::Serialize;

#[derive(Serialize)]
struct ScanRecord {
    cosmology: String,
    beta: f64,
    eta: f64,
    aperture: String,
    slope: f64,
    norm_log10: f64,
    scatter_pct: f64,
    robust_scatter_pct: f64,
    scatter_pct_ci16: f64,
    scatter_pct_ci84: f64,
    n_used: usize,
    n_excluded: usize,
    mean_fnth_rvir: f64,
}

struct ScanConfig {
    n_halos: usize,
    seed: u64,
    out_path: String,
    cache_dir: String,
    quick: bool,
}

fn parse_args() -> Result<ScanConfig, String> {
    let mut cfg = ScanConfig {
        n_halos: 200,
        seed: 2024,
        out_path: "scan_results.json".into(),
        cache_dir: ".nthpress_cache".into(),
        quick: false,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--halos" => {
                let v = args.next().ok_or("--halos needs a value")?;
                cfg.n_halos = v.parse().map_err(|_| format!("bad --halos: {v}"))?;
            }
            "--seed" => {
                let v = args.next().ok_or("--seed needs a value")?;
                cfg.seed = v.parse().map_err(|_| format!("bad --seed: {v}"))?;
            }
            "--out" => cfg.out_path = args.next().ok_or("--out needs a value")?,
            "--cache" => cfg.cache_dir = args.next().ok_or("--cache needs a value")?,
            "--quick" => cfg.quick = true,
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(cfg)
}

fn mean_fnth_rvir(evolved: &[FnthProfile]) -> f64 {
    if evolved.is_empty() {
        return f64::NAN;
    }
    evolved.iter().map(|p| p.f_nth_at(1.0)).sum::<f64>() / evolved.len() as f64
}

fn main() {
    let cfg = match parse_args() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("usage: scaling_scan [--halos N] [--seed S] [--out PATH] [--cache DIR] [--quick]");
            std::process::exit(2);
        }
    };

    let cosmo = Cosmology::planck18();
    let grid = match RadialGrid::log_spaced(0.01, 3.0, 100) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("grid construction failed: {e}");
            std::process::exit(1);
        }
    };
    let model = ConcentrationModel::MassAccretionTime;
    let cache = match EvolvedCache::new(&cfg.cache_dir) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("warning: cache disabled ({e})");
            None
        }
    };

    let n_halos = if cfg.quick { 40 } else { cfg.n_halos };
    let gen = SyntheticMcBride::log_spaced(5e13, 2e15, n_halos, cfg.seed);
    let source_tag = format!("mcbride_n{}_seed{}", n_halos, cfg.seed);

    let betas: &[f64] = if cfg.quick { &[1.0] } else { &[0.5, 1.0, 2.0] };
    let etas: &[f64] = if cfg.quick { &[0.7] } else { &[0.5, 0.7, 0.9] };

    println!(
        "scaling scan: {} halos, {} (β, η) points, cosmology {}",
        n_halos,
        betas.len() * etas.len(),
        cosmo.name
    );

    let mut records = Vec::new();
    for &beta in betas {
        for &eta in etas {
            let params = EvolutionParams {
                beta,
                eta,
                ..EvolutionParams::default()
            };
            let key = EvolvedCache::key(&cosmo, &params, &source_tag);

            let evolved: Vec<FnthProfile> = match cache.as_ref().and_then(|c| c.load(&key)) {
                Some(p) => {
                    println!("β={beta} η={eta}: cache hit ({} halos)", p.len());
                    p
                }
                None => {
                    let histories = match gen.generate(&cosmo) {
                        Ok(h) => h,
                        Err(e) => {
                            eprintln!("history generation failed: {e}");
                            std::process::exit(1);
                        }
                    };
                    let results = evolve_ensemble(&cosmo, &histories, &model, &params, &grid);
                    let mut ok = Vec::with_capacity(results.len());
                    let mut n_failed = 0;
                    for (i, r) in results.into_iter().enumerate() {
                        match r {
                            Ok(p) => ok.push(p),
                            Err(e) => {
                                n_failed += 1;
                                eprintln!("β={beta} η={eta}: halo {i} excluded ({e})");
                            }
                        }
                    }
                    println!(
                        "β={beta} η={eta}: evolved {} halos ({n_failed} excluded)",
                        ok.len()
                    );
                    if let Some(c) = cache.as_ref() {
                        if let Err(e) = c.store(&key, &ok) {
                            eprintln!("warning: cache store failed ({e})");
                        }
                    }
                    ok
                }
            };

            let fnth_mean = mean_fnth_rvir(&evolved);

            for ap in aperture_battery() {
                let mut masses = Vec::with_capacity(evolved.len());
                let mut ys = Vec::with_capacity(evolved.len());
                for (i, p) in evolved.iter().enumerate() {
                    let measured = ThermoProfiles::from_evolved(&cosmo, p)
                        .and_then(|t| {
                            let y = compton_y(&t.radii, &t.p_thermal)?;
                            observe_halo(&cosmo, p, &t, &y, &ap)
                        });
                    match measured {
                        Ok(obs) => {
                            if !obs.quad_converged {
                                eprintln!(
                                    "{}: halo {i} quadrature hit its depth limit; using best estimate",
                                    ap.label()
                                );
                            }
                            masses.push(obs.mass);
                            ys.push(obs.y_sz);
                        }
                        Err(e) => {
                            eprintln!("{}: halo {i} excluded ({e})", ap.label());
                        }
                    }
                }
                match fit_power_law(&masses, &ys) {
                    Ok(fit) => {
                        let (ci16, ci84) =
                            bootstrap_scatter_pct(&masses, &ys, 500, cfg.seed ^ 0xB007)
                                .unwrap_or((f64::NAN, f64::NAN));
                        println!(
                            "  {:>12}: slope {:.4}, scatter {:.2}% [{:.2}, {:.2}]",
                            ap.label(),
                            fit.slope,
                            fit.scatter_pct,
                            ci16,
                            ci84
                        );
                        records.push(ScanRecord {
                            cosmology: cosmo.name.clone(),
                            beta,
                            eta,
                            aperture: ap.label(),
                            slope: fit.slope,
                            norm_log10: fit.norm_log10,
                            scatter_pct: fit.scatter_pct,
                            robust_scatter_pct: fit.robust_scatter_pct,
                            scatter_pct_ci16: ci16,
                            scatter_pct_ci84: ci84,
                            n_used: fit.n_used,
                            n_excluded: fit.n_excluded + (evolved.len() - masses.len()),
                            mean_fnth_rvir: fnth_mean,
                        });
                    }
                    Err(e) => eprintln!("  {:>12}: fit failed ({e})", ap.label()),
                }
            }
        }
    }

    match serde_json::to_string_pretty(&records) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&cfg.out_path, json) {
                eprintln!("error: writing {} failed ({e})", cfg.out_path);
                std::process::exit(1);
            }
            println!("wrote {} records to {}", records.len(), cfg.out_path);
        }
        Err(e) => {
            eprintln!("error: serializing results failed ({e})");
            std::process::exit(1);
        }
    }
}
