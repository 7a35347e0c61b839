pub mod anchors;
pub mod doctor;
pub mod gc;
pub mod harness;
pub mod pillar;
pub mod report;
pub mod status;
pub mod verify;

pub use anchors::{discover_anchors, extract_pins, latest_run_dir, snapshot_run_dirs, Pin};
pub use doctor::doctor_failures;
pub use gc::{gc_artifacts, GcPolicy, GcReport};
pub use harness::{artifacts_enabled, resolve_seed, run_matter_test, run_summary_lines, RunOutcome};
pub use pillar::{find_repo_root, pillars, Pillar};
pub use report::{build_report, parse_target};
pub use status::{pillar_status, PillarStatus};
pub use verify::registry_verify;

#[cfg(test)]
pub(crate) mod testutil {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn temp_repo(tag: &str) -> PathBuf {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or(0);
        let root =
            std::env::temp_dir().join(format!("tessaris_{}_{}_{}", tag, std::process::id(), micros));
        fs::create_dir_all(root.join(".git")).expect("repo marker");
        root
    }

    pub fn make_pillar(repo: &Path, name: &str) -> PathBuf {
        let root = repo.join(name);
        for sub in ["src", "tests", "docs", "artifacts"] {
            fs::create_dir_all(root.join(sub)).expect("pillar layout");
        }
        root
    }

    /// Minimal run bundle: run.json (+ meta.json unless skipped).
    pub fn make_run_dir(pillar: &Path, test_id: &str, hash: &str, with_meta: bool) -> PathBuf {
        let dir = pillar
            .join("artifacts")
            .join("programmable_matter")
            .join(test_id)
            .join(hash);
        fs::create_dir_all(&dir).expect("run dir");
        let body = format!(
            r#"{{"test_id":"{}","run_hash":"{}","controller":"open_loop","seed":1337,"peak_retention":0.7}}"#,
            test_id, hash
        );
        fs::write(dir.join("run.json"), body).expect("run.json");
        if with_meta {
            let meta = format!(
                r#"{{"test_id":"{}","run_hash":"{}","controller":"open_loop","seed":1337}}"#,
                test_id, hash
            );
            fs::write(dir.join("meta.json"), meta).expect("meta.json");
        }
        dir
    }
}
