use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use matter_core::{atomic_write_bytes, atomic_write_json_pretty, ensure_dir, MatterError};
use serde_json::{json, Map, Value};
use tracing::debug;

/// Write the four-file bundle for one run under
/// `<matter_root>/artifacts/programmable_matter/<TEST_ID>/<RUN_HASH>/`.
///
/// Files land in a fixed order (`config.json`, `meta.json`, `run.json`,
/// `metrics.csv`) so a truncated bundle is diagnosable from which files
/// exist. `metrics.csv` is skipped when the record carries no series at all.
/// Returns the bundle directory.
pub fn write_run_artifacts(
    matter_root: &Path,
    cfg: &BTreeMap<String, Value>,
    run: &crate::record::RunRecord,
) -> Result<PathBuf, MatterError> {
    if run.test_id.is_empty() {
        return Err(MatterError::MissingRunField { field: "test_id" });
    }
    if run.run_hash.is_empty() {
        return Err(MatterError::MissingRunField { field: "run_hash" });
    }

    let dir = matter_root
        .join("artifacts")
        .join("programmable_matter")
        .join(&run.test_id)
        .join(&run.run_hash);
    ensure_dir(&dir)?;

    let cfg_value = Value::Object(Map::from_iter(
        cfg.iter().map(|(k, v)| (k.clone(), v.clone())),
    ));
    atomic_write_json_pretty(&dir.join("config.json"), &cfg_value)?;

    let meta = json!({
        "test_id": run.test_id,
        "run_hash": run.run_hash,
        "controller": run.controller,
        "seed": run.seed,
    });
    atomic_write_json_pretty(&dir.join("meta.json"), &meta)?;

    atomic_write_json_pretty(&dir.join("run.json"), &serde_json::to_value(run)?)?;

    let series = run.present_series();
    if !series.is_empty() {
        atomic_write_bytes(&dir.join("metrics.csv"), render_metrics_csv(&series).as_bytes())?;
    }

    debug!(dir = %dir.display(), files = 3 + usize::from(!series.is_empty()), "wrote run bundle");
    Ok(dir)
}

/// `step` column plus one column per present series; rows are padded with
/// empty cells up to the longest series.
fn render_metrics_csv(series: &[(&'static str, &[f64])]) -> String {
    let max_len = series.iter().map(|(_, s)| s.len()).max().unwrap_or(0);
    let mut out = String::from("step");
    for (name, _) in series {
        out.push(',');
        out.push_str(name);
    }
    out.push('\n');
    for row in 0..max_len {
        out.push_str(&row.to_string());
        for (_, values) in series {
            out.push(',');
            if let Some(v) = values.get(row) {
                out.push_str(&v.to_string());
            }
        }
        out.push('\n');
    }
    out
}
