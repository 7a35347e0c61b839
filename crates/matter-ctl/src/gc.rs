use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Result};
use tracing::debug;

use crate::anchors::{extract_pins, is_test_id, iter_run_dirs, read_text_safe, run_dir_mtime};
use crate::pillar::pillars;

const SECONDS_PER_DAY: u64 = 86_400;

/// Retention policy for `artifacts gc`.
#[derive(Debug, Clone)]
pub struct GcPolicy {
    pub keep_latest: usize,
    pub keep_pinned: bool,
    pub days: u64,
    pub apply: bool,
}

impl Default for GcPolicy {
    fn default() -> Self {
        Self {
            keep_latest: 2,
            keep_pinned: true,
            days: 14,
            apply: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct GcReport {
    pub candidates: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub kept: usize,
}

struct GcEntry {
    dir: PathBuf,
    mtime: SystemTime,
    pinned: bool,
}

/// Sweep run directories per anchor. Dry-run by default: candidates are
/// reported but nothing is removed until `policy.apply` is set. Deletion
/// failures (e.g. a concurrent sweep won the race) are skipped silently.
pub fn gc_artifacts(
    repo: &Path,
    pillar_filter: Option<&str>,
    policy: &GcPolicy,
) -> Result<GcReport> {
    let pillars = pillars(repo);
    if let Some(filter) = pillar_filter {
        if !pillars.contains_key(filter) {
            bail!("unknown pillar: {}", filter);
        }
    }

    let now = SystemTime::now();
    let mut report = GcReport::default();

    for (key, pillar) in &pillars {
        if pillar_filter.is_some_and(|f| f != key.as_str()) {
            continue;
        }

        let pinned_hashes: BTreeSet<String> = if policy.keep_pinned {
            extract_pins(&read_text_safe(&pillar.audit_registry()))
                .into_iter()
                .map(|pin| pin.run_hash)
                .collect()
        } else {
            BTreeSet::new()
        };

        let mut by_test: BTreeMap<String, Vec<GcEntry>> = BTreeMap::new();
        for dir in iter_run_dirs(&pillar.artifacts()) {
            let Some(test_id) = dir
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
            else {
                continue;
            };
            if !is_test_id(test_id) {
                continue;
            }
            let pinned = dir
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|h| pinned_hashes.contains(h));
            by_test.entry(test_id.to_string()).or_default().push(GcEntry {
                mtime: run_dir_mtime(&dir),
                dir,
                pinned,
            });
        }

        for (_, entries) in by_test {
            let (kept, candidates) = plan_group(entries, policy, now);
            report.kept += kept;
            for dir in candidates {
                if policy.apply {
                    match fs::remove_dir_all(&dir) {
                        Ok(()) => report.deleted.push(dir.clone()),
                        Err(err) => {
                            debug!(dir = %dir.display(), %err, "gc delete skipped");
                        }
                    }
                }
                report.candidates.push(dir);
            }
        }
    }

    Ok(report)
}

/// Decide the fate of one anchor's run directories: newest `keep_latest`
/// stay, pins stay, and the rest go only once older than the policy window.
fn plan_group(
    mut entries: Vec<GcEntry>,
    policy: &GcPolicy,
    now: SystemTime,
) -> (usize, Vec<PathBuf>) {
    entries.sort_by(|a, b| b.mtime.cmp(&a.mtime));
    let min_age = Duration::from_secs(policy.days * SECONDS_PER_DAY);

    let mut kept = 0;
    let mut candidates = Vec::new();
    for (idx, entry) in entries.into_iter().enumerate() {
        if idx < policy.keep_latest || entry.pinned {
            kept += 1;
            continue;
        }
        let age = now.duration_since(entry.mtime).unwrap_or_default();
        if age >= min_age {
            candidates.push(entry.dir);
        } else {
            kept += 1;
        }
    }
    (kept, candidates)
}
