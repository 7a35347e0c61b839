use std::path::Path;

use matter_core::{run_hash, Canonical, MatterError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::artifacts::write_run_artifacts;
use crate::config::Mt01Config;
use crate::controller::{Controller, Observation};
use crate::record::RunRecord;
use crate::stats::std_dev;

pub const TEST_ID: &str = "MT01";

// Width channel.
const KW: f64 = 6.0;
const K_GAIN_WIDEN: f64 = 0.0006;
const WIDTH_FLOOR: f64 = 1e-3;

// Peak channel.
const KSPREAD: f64 = 0.003;
const K_GAIN_LOSS: f64 = 0.004;
const KP: f64 = 4.0;
const K_BASE_DECAY: f64 = 2e-5;
const PEAK_FLOOR: f64 = 1e-6;

// Actuation noise amplification.
const K_NOISE_GAIN: f64 = 30.0;

// Effort penalty weights.
const K_EFFORT: f64 = 2.0;
const K_EFFORT_CHI: f64 = 0.5;

/// Soliton-persistence proxy: a Gaussian packet's peak and width evolve
/// under a controller-selected gain for `cfg.steps` steps, then the run is
/// scored along audit-safe metrics.
///
/// One `StdRng` is seeded from `seed`, and the controller receives the same
/// integer in `reset`, so the full trajectory is a deterministic function of
/// `(cfg, controller, seed)`. When `artifacts` names a matter root, the
/// bundle is written exactly once after the loop; a failed run writes
/// nothing.
pub fn run_mt01(
    cfg: &Mt01Config,
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

    let peak0 = cfg.amp0;
    let width0 = cfg.sigma0;
    let mut peak = peak0;
    let mut width = width0;

    let drift_w = 0.0015 * cfg.alpha;
    let k_lam = 0.25 * cfg.lam;

    let mut peak_series = Vec::with_capacity(cfg.steps);
    let mut width_series = Vec::with_capacity(cfg.steps);
    let mut gain_series = Vec::with_capacity(cfg.steps);
    let mut chi_series = Vec::with_capacity(cfg.steps);
    let mut norm_series = Vec::with_capacity(cfg.steps);

    for t in 0..cfg.steps {
        let obs = Observation::Soliton {
            step: t,
            width,
            peak,
            width0,
            peak0,
        };
        let gain = controller.act(&obs);
        if !gain.is_finite() {
            return Err(MatterError::Controller {
                name: controller.name().to_string(),
                reason: format!("non-finite gain at step {}", t),
            });
        }

        let mut chi_eff = cfg.chi_base * (1.0 + gain);
        if let Some(cap) = controller.chi_cap() {
            chi_eff = chi_eff.min(cap * cfg.chi_base);
        }

        // High gain buys actuation but amplifies the noise floor.
        let noise_amp = 1.0 + K_NOISE_GAIN * gain.max(0.0);
        let noise_w: f64 = cfg.noise_std * noise_amp * rng.sample::<f64, _>(StandardNormal);
        let noise_a: f64 = cfg.noise_std * noise_amp * rng.sample::<f64, _>(StandardNormal);

        width += drift_w + K_GAIN_WIDEN * gain + noise_w - KW * gain * (width - width0);
        if !width.is_finite() {
            return Err(MatterError::Diverged { field: "width", step: t });
        }
        width = width.max(WIDTH_FLOOR);

        peak += -KSPREAD * (width - width0).max(0.0) - K_GAIN_LOSS * gain
            + KP * gain * (peak0 - peak)
            - k_lam * (peak - peak0)
            - K_BASE_DECAY * peak
            + noise_a;
        if !peak.is_finite() {
            return Err(MatterError::Diverged { field: "peak", step: t });
        }
        peak = peak.clamp(PEAK_FLOOR, cfg.clip);

        width_series.push(width);
        peak_series.push(peak);
        gain_series.push(gain);
        chi_series.push(chi_eff);
        norm_series.push(field_norm(peak, width, cfg.n, cfg.clip));
    }

    let peak_t = peak;
    let width_t = width;
    let retention_raw = (peak_t / peak0).clamp(0.0, 1.0);
    let effort = K_EFFORT * (std_dev(&gain_series) + K_EFFORT_CHI * std_dev(&chi_series));
    let retention = (retention_raw - effort).max(0.0);
    let max_norm = norm_series.iter().copied().fold(0.0_f64, f64::max);

    run.peak0 = Some(peak0);
    run.peak_t = Some(peak_t);
    run.width0 = Some(width0);
    run.width_t = Some(width_t);
    run.peak_retention_raw = Some(retention_raw);
    run.peak_retention = retention;
    run.width_drift_pct = Some(100.0 * (width_t - width0).abs() / width0);
    run.max_norm = Some(max_norm);
    run.peak_series = peak_series;
    run.width_series = width_series;
    run.gain_series = gain_series;
    run.chi_series = chi_series;
    run.norm_series = norm_series;

    if let Some(root) = artifacts {
        write_run_artifacts(root, &cfg_map, &run)?;
    }

    Ok(run)
}

/// Euclidean norm of the sampled packet
/// `u(x) = peak * exp(-((x - c)/width)^2 / 2)` on the integer grid,
/// clipped to `[-clip, clip]`.
fn field_norm(peak: f64, width: f64, n: usize, clip: f64) -> f64 {
    let center = (n as f64 - 1.0) / 2.0;
    let mut acc = 0.0;
    for i in 0..n {
        let x = (i as f64 - center) / width;
        let u = (peak * (-0.5 * x * x).exp()).clamp(-clip, clip);
        acc += u * u;
    }
    acc.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{OpenLoop, RandomJitter, SolitonHold};

    fn short_cfg() -> Mt01Config {
        Mt01Config {
            steps: 400,
            ..Mt01Config::default()
        }
    }

    #[test]
    fn every_series_has_one_sample_per_step() {
        let cfg = short_cfg();
        let run = run_mt01(&cfg, &mut OpenLoop, 1337, None).expect("run");
        assert_eq!(run.peak_series.len(), cfg.steps);
        assert_eq!(run.width_series.len(), cfg.steps);
        assert_eq!(run.gain_series.len(), cfg.steps);
        assert_eq!(run.chi_series.len(), cfg.steps);
        assert_eq!(run.norm_series.len(), cfg.steps);
        assert!(run.symmetry_error_series.is_empty());
    }

    #[test]
    fn trajectory_is_deterministic_in_the_seed() {
        let cfg = short_cfg();
        let a = run_mt01(&cfg, &mut RandomJitter::gain(0.25), 1337, None).expect("first");
        let b = run_mt01(&cfg, &mut RandomJitter::gain(0.25), 1337, None).expect("second");
        assert_eq!(a, b);

        let c = run_mt01(&cfg, &mut RandomJitter::gain(0.25), 1338, None).expect("reseeded");
        assert_ne!(a.peak_series, c.peak_series);
        assert_ne!(a.run_hash, c.run_hash);
    }

    #[test]
    fn state_stays_inside_the_documented_clamps() {
        let cfg = short_cfg();
        let run = run_mt01(&cfg, &mut RandomJitter::gain(0.25), 7, None).expect("run");
        assert!(run.peak_series.iter().all(|p| (1e-6..=cfg.clip).contains(p)));
        assert!(run.width_series.iter().all(|w| *w >= 1e-3));
        assert!(run.peak_retention >= 0.0 && run.peak_retention <= 1.0);
        let raw = run.peak_retention_raw.expect("raw retention");
        assert!((0.0..=1.0).contains(&raw));
        assert!(run.peak_retention <= raw);
    }

    #[test]
    fn closed_loop_beats_both_baselines_at_default_config() {
        let cfg = Mt01Config::default();
        let open = run_mt01(&cfg, &mut OpenLoop, 1337, None).expect("open");
        let jitter =
            run_mt01(&cfg, &mut RandomJitter::gain(0.25), 1337, None).expect("jitter");
        let held = run_mt01(&cfg, &mut SolitonHold::default(), 1337, None).expect("hold");

        assert!(
            held.peak_retention > open.peak_retention,
            "hold {} vs open {}",
            held.peak_retention,
            open.peak_retention
        );
        assert!(
            held.peak_retention > jitter.peak_retention,
            "hold {} vs jitter {}",
            held.peak_retention,
            jitter.peak_retention
        );
    }

    #[test]
    fn controller_chi_cap_bounds_effective_coupling() {
        let cfg = short_cfg();
        let mut held = SolitonHold::default();
        let run = run_mt01(&cfg, &mut held, 1337, None).expect("run");
        let cap = held.chi_cap * cfg.chi_base;
        assert!(run.chi_series.iter().all(|chi| *chi <= cap + 1e-12));
    }

    #[test]
    fn diverging_controller_is_reported_not_scored() {
        struct Explode;
        impl Controller for Explode {
            fn name(&self) -> &'static str {
                "explode"
            }
            fn act(&mut self, _obs: &Observation) -> f64 {
                f64::NAN
            }
        }
        let err = run_mt01(&short_cfg(), &mut Explode, 1, None).expect_err("must fail");
        assert!(err.to_string().contains("non-finite gain"));
    }
}
