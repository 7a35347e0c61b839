use std::path::Path;

use anyhow::{anyhow, bail, Result};
use matter_sim::{
    run_mt01, run_mt02, CollisionHold, Mt01Config, Mt02Config, OpenLoop, RandomJitter, RunRecord,
    SolitonHold,
};
use serde_json::Value;
use tracing::info;

use crate::pillar::Pillar;

pub const DEFAULT_SEED: u64 = 1337;

/// Gain cap shared by the MT01 jitter baseline and the hold controller.
const MT01_GAIN_CAP: f64 = 0.25;
/// Coupling cap for the MT02 jitter baseline.
const MT02_CHI_CAP: f64 = 0.3;

/// Benchmark tests the in-process harness knows how to execute, per pillar.
pub fn known_tests(pillar: &Pillar) -> &'static [&'static str] {
    if pillar.name == "MATTER" {
        &["MT01", "MT02"]
    } else {
        &[]
    }
}

#[derive(Debug, Clone)]
pub struct ControllerScore {
    pub controller: String,
    pub run_hash: String,
    pub peak_retention: f64,
}

/// One harness execution: every reference controller at the same seed, plus
/// the baseline-separation verdict the retired pytest harness asserted.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub test_id: String,
    pub scores: Vec<ControllerScore>,
    pub separation_ok: bool,
}

/// Seed precedence: explicit flag, then `TESSARIS_SEED`, then the default.
pub fn resolve_seed(flag: Option<u64>) -> u64 {
    flag.or_else(|| {
        std::env::var("TESSARIS_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
    })
    .unwrap_or(DEFAULT_SEED)
}

/// `TESSARIS_WRITE_ARTIFACTS=0` suppresses persistence; `--no-artifacts`
/// always wins.
pub fn artifacts_enabled(no_artifacts: bool) -> bool {
    if no_artifacts {
        return false;
    }
    std::env::var("TESSARIS_WRITE_ARTIFACTS")
        .map(|v| v != "0")
        .unwrap_or(true)
}

/// Execute one benchmark test in process: run the three reference
/// controllers at `seed`, persist bundles under the pillar root when
/// requested, and check that the bounded closed-loop controller outranks
/// both baselines.
pub fn run_matter_test(
    pillar: &Pillar,
    test_id: &str,
    seed: u64,
    write_artifacts: bool,
) -> Result<RunOutcome> {
    let root = write_artifacts.then(|| pillar.root.clone());
    let root = root.as_deref();

    let runs: Vec<RunRecord> = match test_id {
        "MT01" => {
            let cfg = Mt01Config::default();
            vec![
                run_mt01(&cfg, &mut OpenLoop, seed, root)?,
                run_mt01(&cfg, &mut RandomJitter::gain(MT01_GAIN_CAP), seed, root)?,
                run_mt01(&cfg, &mut SolitonHold::default(), seed, root)?,
            ]
        }
        "MT02" => {
            let cfg = Mt02Config::default();
            vec![
                run_mt02(&cfg, &mut OpenLoop, seed, root)?,
                run_mt02(&cfg, &mut RandomJitter::chi(MT02_CHI_CAP), seed, root)?,
                run_mt02(&cfg, &mut CollisionHold::default(), seed, root)?,
            ]
        }
        _ => bail!("unknown test id for pillar {}: {}", pillar.name, test_id),
    };

    // The closed-loop controller is always dispatched last.
    let held = runs.last().ok_or_else(|| anyhow!("empty run set"))?;
    let separation_ok = runs[..runs.len() - 1]
        .iter()
        .all(|baseline| baseline.peak_retention < held.peak_retention);

    info!(
        test_id,
        seed, separation_ok, "harness run complete"
    );

    Ok(RunOutcome {
        test_id: test_id.to_string(),
        scores: runs
            .into_iter()
            .map(|r| ControllerScore {
                controller: r.controller,
                run_hash: r.run_hash,
                peak_retention: r.peak_retention,
            })
            .collect(),
        separation_ok,
    })
}

/// Human-readable summary of a run bundle: the identifier line followed by
/// up to twelve scalar metrics, sorted by name.
pub fn run_summary_lines(run_dir: &Path) -> Result<Vec<String>> {
    let run_json = run_dir.join("run.json");
    if !run_json.exists() {
        return Ok(vec![format!("no run.json: {}", run_dir.display())]);
    }
    let run: Value = serde_json::from_str(&std::fs::read_to_string(&run_json)?)?;

    let dir_name = |p: &Path| {
        p.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("?")
            .to_string()
    };
    let test_id = run
        .get("test_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| run_dir.parent().map(dir_name).unwrap_or_default());
    let run_hash = run
        .get("run_hash")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| dir_name(run_dir));
    let controller = run
        .get("controller")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    let seed = run
        .get("seed")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "null".to_string());

    let mut scalars: Vec<(String, f64)> = run
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter(|(k, _)| k.as_str() != "seed")
                .filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f)))
                .collect()
        })
        .unwrap_or_default();
    scalars.sort_by(|a, b| a.0.cmp(&b.0));

    let mut lines = vec![format!(
        "{} {} controller={} seed={}",
        test_id, run_hash, controller, seed
    )];
    for (k, v) in scalars.into_iter().take(12) {
        lines.push(format!("  {} = {}", k, v));
    }
    Ok(lines)
}
