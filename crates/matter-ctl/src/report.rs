use std::path::Path;
use std::process::Command;

use anyhow::{bail, Result};
use chrono::Utc;
use serde_json::Value;

use crate::anchors::{discover_anchors, latest_run_dir, read_text_safe};
use crate::pillar::pillars;

fn run_git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git").args(args).current_dir(repo).output();
    match output {
        Ok(out) => {
            let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if !stdout.is_empty() {
                stdout
            } else {
                String::from_utf8_lossy(&out.stderr).trim().to_string()
            }
        }
        Err(_) => String::new(),
    }
}

pub fn git_head(repo: &Path) -> String {
    let head = run_git(repo, &["rev-parse", "HEAD"]);
    if head.is_empty() {
        "unknown".to_string()
    } else {
        head
    }
}

pub fn git_branch(repo: &Path) -> String {
    let branch = run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"]);
    if branch.is_empty() {
        "unknown".to_string()
    } else {
        branch
    }
}

pub fn git_is_dirty(repo: &Path) -> bool {
    !run_git(repo, &["status", "--porcelain"]).trim().is_empty()
}

/// Split `pillar`, `pillar:TESTID`, or nothing into its parts.
pub fn parse_target(target: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(target) = target else {
        return (None, None);
    };
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return (None, None);
    }
    match trimmed.split_once(':') {
        Some((pillar, test_id)) => (
            Some(pillar.trim().to_lowercase()),
            Some(test_id.trim().to_string()),
        ),
        None => (Some(trimmed.to_lowercase()), None),
    }
}

fn load_run_json(run_dir: &Path) -> Value {
    serde_json::from_str(&read_text_safe(&run_dir.join("run.json"))).unwrap_or(Value::Null)
}

/// Markdown report over the discovered anchors: repo/git header, latest run
/// per anchor, and a detail block with up to 16 scalars when the target
/// names a single anchor.
pub fn build_report(repo: &Path, target: Option<&str>) -> Result<String> {
    let pillars = pillars(repo);
    let (pillar_key, test_id) = parse_target(target);

    let mut anchors = discover_anchors(repo);
    if let Some(pk) = &pillar_key {
        if !pillars.contains_key(pk) {
            bail!("unknown pillar: {}", pk);
        }
        anchors.retain(|(key, _)| key == pk);
    }
    if let Some(tid) = &test_id {
        anchors.retain(|(_, t)| t == tid);
    }

    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let mut md: Vec<String> = Vec::new();
    let title = match (&pillar_key, &test_id) {
        (None, _) => "Tessaris Report".to_string(),
        (Some(pk), None) => format!("Tessaris Report: {}", pk),
        (Some(pk), Some(tid)) => format!("Tessaris Report: {}:{}", pk, tid),
    };
    md.push(format!("# {}", title));
    md.push(String::new());
    md.push(format!("- Generated: {}", now));
    md.push(format!("- Repo: `{}`", repo.display()));
    md.push(format!("- Git: `{}` @ `{}`", git_branch(repo), git_head(repo)));
    md.push(format!(
        "- Working tree: `{}`",
        if git_is_dirty(repo) { "DIRTY" } else { "CLEAN" }
    ));
    md.push(String::new());

    if anchors.is_empty() {
        md.push("_No matching anchors found._".to_string());
        return Ok(md.join("\n"));
    }

    md.push("## Latest runs".to_string());
    md.push(String::new());
    for (pk, tid) in &anchors {
        let pillar = &pillars[pk];
        let Some(latest) = latest_run_dir(pillar, tid) else {
            md.push(format!("- **{}:{}** _(no run on disk)_", pk, tid));
            continue;
        };
        let run = load_run_json(&latest);
        let hash = run
            .get("run_hash")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| {
                latest
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("?")
                    .to_string()
            });
        let controller = run
            .get("controller")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        let seed = run
            .get("seed")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "null".to_string());
        md.push(format!(
            "- **{}:{}** `{}` controller=`{}` seed=`{}`",
            pk, tid, hash, controller, seed
        ));
    }
    md.push(String::new());

    if let (Some(_), Some(_), 1) = (&pillar_key, &test_id, anchors.len()) {
        let (pk, tid) = &anchors[0];
        let pillar = &pillars[pk];
        md.push("## Details".to_string());
        md.push(String::new());
        if let Some(latest) = latest_run_dir(pillar, tid) {
            md.push(format!("- Artifacts: `{}`", latest.display()));
            let run = load_run_json(&latest);
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
            if !scalars.is_empty() {
                md.push(String::new());
                md.push("### Scalars".to_string());
                md.push(String::new());
                for (k, v) in scalars.into_iter().take(16) {
                    md.push(format!("- `{}` = `{}`", k, v));
                }
            }
        } else {
            md.push("_No artifacts found for this anchor on disk._".to_string());
        }
        md.push(String::new());
    }

    Ok(md.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_pillar, make_run_dir, temp_repo};

    #[test]
    fn target_parsing_handles_all_three_shapes() {
        assert_eq!(parse_target(None), (None, None));
        assert_eq!(parse_target(Some("matter")), (Some("matter".into()), None));
        assert_eq!(
            parse_target(Some("MATTER:MT01")),
            (Some("matter".into()), Some("MT01".into()))
        );
    }

    #[test]
    fn report_lists_latest_runs_per_anchor() {
        let repo = temp_repo("report");
        let matter = make_pillar(&repo, "MATTER");
        make_run_dir(&matter, "MT01", "abcdef0", true);

        let md = build_report(&repo, None).expect("report");
        assert!(md.starts_with("# Tessaris Report"));
        assert!(md.contains("- **matter:MT01** `abcdef0` controller=`open_loop` seed=`1337`"));
        let _ = std::fs::remove_dir_all(repo);
    }

    #[test]
    fn single_anchor_target_adds_a_detail_block() {
        let repo = temp_repo("report_detail");
        let matter = make_pillar(&repo, "MATTER");
        make_run_dir(&matter, "MT01", "abcdef0", true);

        let md = build_report(&repo, Some("matter:MT01")).expect("report");
        assert!(md.contains("# Tessaris Report: matter:MT01"));
        assert!(md.contains("## Details"));
        assert!(md.contains("### Scalars"));
        assert!(md.contains("- `peak_retention` = `0.7`"));
        let _ = std::fs::remove_dir_all(repo);
    }

    #[test]
    fn unknown_pillar_target_is_rejected() {
        let repo = temp_repo("report_unknown");
        make_pillar(&repo, "MATTER");
        assert!(build_report(&repo, Some("gravity")).is_err());
        let _ = std::fs::remove_dir_all(repo);
    }

    #[test]
    fn empty_anchor_set_is_reported_gracefully() {
        let repo = temp_repo("report_empty");
        make_pillar(&repo, "MATTER");
        let md = build_report(&repo, None).expect("report");
        assert!(md.contains("_No matching anchors found._"));
        let _ = std::fs::remove_dir_all(repo);
    }
}
