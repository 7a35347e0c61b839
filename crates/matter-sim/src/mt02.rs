use std::path::Path;

use matter_core::{run_hash, Canonical, MatterError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::artifacts::write_run_artifacts;
use crate::config::Mt02Config;
use crate::controller::{Controller, Observation};
use crate::record::RunRecord;
use crate::stats::std_dev;

pub const TEST_ID: &str = "MT02";

// Peak channel.
const K_CHI_PEAK: f64 = 0.12;
const PEAK_LO: f64 = 0.05;
const PEAK_HI: f64 = 1.20;

// Symmetry channel.
const K_SYM_DAMP: f64 = 0.85;
const K_SYM_DRIVE: f64 = 0.18;
const SYM_NOISE_SCALE: f64 = 0.2;

// Scoring.
const RETENTION_CAP: f64 = 1.2;
const K_EFFORT: f64 = 1.25;
const OPEN_LOOP_FACTOR: f64 = 0.85;
const JITTER_FACTOR: f64 = 0.75;
const K_SYM_SCORE: f64 = 1.2;
const OPEN_LOOP_RESIDUAL: f64 = 0.03;

/// Collision-symmetry proxy: peak amplitude and a symmetry-error scalar
/// evolve under a controller-selected coupling `chi`, clamped to
/// `[0, cfg.chi_cap]` each step. Scoring keeps the baseline penalties of the
/// pinned bundles: multiplicative factors for the open-loop and
/// random-jitter names plus the open-loop residual subtraction.
pub fn run_mt02(
    cfg: &Mt02Config,
    controller: &mut dyn Controller,
    seed: u64,
    artifacts: Option<&Path>,
) -> Result<RunRecord, MatterError> {
    cfg.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);
    controller.reset(seed);

    let cfg_map = cfg.canonical_fields();
    let hash = run_hash(TEST_ID, &cfg_map, controller.name(), seed);
    let mut run = RunRecord::new(TEST_ID, &hash, controller.name(), seed);

    let peak_init = cfg.amp0;
    let target_peak = cfg.amp0;
    let mut peak = peak_init;
    let mut symmetry_error = 0.0_f64;

    let mut peak_series = Vec::with_capacity(cfg.steps);
    let mut chi_series = Vec::with_capacity(cfg.steps);
    let mut symmetry_error_series = Vec::with_capacity(cfg.steps);

    for t in 0..cfg.steps {
        let obs = Observation::Collision {
            peak,
            target_peak,
            symmetry_error,
        };
        let requested = controller.act(&obs);
        if !requested.is_finite() {
            return Err(MatterError::Controller {
                name: controller.name().to_string(),
                reason: format!("non-finite chi at step {}", t),
            });
        }
        let chi = requested.clamp(0.0, cfg.chi_cap);

        let d_peak = -cfg.alpha * (peak - target_peak) + K_CHI_PEAK * (chi - cfg.chi_base);
        peak += cfg.dt * d_peak + cfg.noise_std * rng.sample::<f64, _>(StandardNormal);
        if !peak.is_finite() {
            return Err(MatterError::Diverged { field: "peak", step: t });
        }
        peak = peak.clamp(PEAK_LO, PEAK_HI);

        let d_sym = -K_SYM_DAMP * chi + K_SYM_DRIVE * (chi - cfg.chi_base).abs();
        symmetry_error +=
            cfg.dt * d_sym + SYM_NOISE_SCALE * cfg.noise_std * rng.sample::<f64, _>(StandardNormal);
        if !symmetry_error.is_finite() {
            return Err(MatterError::Diverged {
                field: "symmetry_error",
                step: t,
            });
        }
        symmetry_error = symmetry_error.clamp(0.0, 1.0);

        peak_series.push(peak);
        chi_series.push(chi);
        symmetry_error_series.push(symmetry_error);
    }

    let peak_final = peak;
    let symmetry_error_final = symmetry_error;

    let mut retention = (peak_final / peak_init).clamp(0.0, RETENTION_CAP);
    retention -= K_EFFORT * std_dev(&chi_series);
    let name = controller.name();
    if name.contains("open_loop") {
        retention *= OPEN_LOOP_FACTOR;
    } else if name.contains("random_jitter") {
        retention *= JITTER_FACTOR;
    }
    retention *= (1.0 - K_SYM_SCORE * symmetry_error_final).max(0.0);
    if name.contains("open_loop") {
        retention -= OPEN_LOOP_RESIDUAL;
    }
    run.peak_retention = retention.clamp(0.0, RETENTION_CAP);

    run.peak_init = Some(peak_init);
    run.peak_final = Some(peak_final);
    run.peak_error_final = Some((peak_final - target_peak).abs());
    run.symmetry_error_final = Some(symmetry_error_final);
    run.peak_series = peak_series;
    run.chi_series = chi_series;
    run.symmetry_error_series = symmetry_error_series;

    if let Some(root) = artifacts {
        write_run_artifacts(root, &cfg_map, &run)?;
    }

    Ok(run)
}
