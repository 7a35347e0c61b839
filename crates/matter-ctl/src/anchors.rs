use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::pillar::{pillars, Pillar};

pub const TEST_PATTERN: &str = r"[A-Z]{1,4}\d{2,3}";
pub const HASH_PATTERN: &str = r"[0-9a-f]{7}";

/// One pinned artifact path as it appears in markdown.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pin {
    pub test_id: String,
    pub run_hash: String,
    pub path: String,
}

fn pin_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?:^|[\s`])(?P<path>[^`\s]+/artifacts/[^`\s]+/(?P<test>{})/(?P<hash>{})/)",
            TEST_PATTERN, HASH_PATTERN
        ))
        .expect("pin regex is a constant pattern")
    })
}

fn test_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^{}$", TEST_PATTERN)).expect("test id regex is a constant pattern")
    })
}

pub fn is_test_id(candidate: &str) -> bool {
    test_id_regex().is_match(candidate)
}

/// Pinned artifact paths (`.../artifacts/.../<TESTID>/<HASH>/`) in
/// markdown-ish text.
pub fn extract_pins(text: &str) -> Vec<Pin> {
    pin_regex()
        .captures_iter(text)
        .map(|caps| Pin {
            test_id: caps["test"].to_string(),
            run_hash: caps["hash"].to_string(),
            path: caps["path"].to_string(),
        })
        .collect()
}

pub fn read_text_safe(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Parents of every `run.json` under the artifacts root.
pub fn iter_run_dirs(artifacts_root: &Path) -> Vec<PathBuf> {
    if !artifacts_root.exists() {
        return Vec::new();
    }
    WalkDir::new(artifacts_root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == "run.json")
        .filter_map(|e| e.path().parent().map(Path::to_path_buf))
        .collect()
}

/// `(pillar_key, TEST_ID)` anchors from registry pins plus whatever is on
/// disk; deduplicated and sorted.
pub fn discover_anchors(repo: &Path) -> Vec<(String, String)> {
    let mut anchors: BTreeSet<(String, String)> = BTreeSet::new();
    for (key, pillar) in pillars(repo) {
        if pillar.audit_registry().exists() {
            for pin in extract_pins(&read_text_safe(&pillar.audit_registry())) {
                anchors.insert((key.clone(), pin.test_id));
            }
        }
        for run_dir in iter_run_dirs(&pillar.artifacts()) {
            if let Some(test_id) = run_dir
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
            {
                if is_test_id(test_id) {
                    anchors.insert((key.clone(), test_id.to_string()));
                }
            }
        }
    }
    debug!(count = anchors.len(), "discovered anchors");
    anchors.into_iter().collect()
}

/// Retention timestamp for a run directory: `meta.json` mtime when present,
/// else the directory mtime.
pub fn run_dir_mtime(dir: &Path) -> SystemTime {
    let meta = dir.join("meta.json");
    let stat = if meta.exists() {
        meta.metadata()
    } else {
        dir.metadata()
    };
    stat.and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Most recent run directory for an anchor, or `None` when nothing is on
/// disk.
pub fn latest_run_dir(pillar: &Pillar, test_id: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = iter_run_dirs(&pillar.artifacts())
        .into_iter()
        .filter(|d| {
            d.parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                == Some(test_id)
        })
        .collect();
    candidates.sort_by_key(|d| run_dir_mtime(d));
    candidates.pop()
}

pub fn snapshot_run_dirs(pillar: &Pillar) -> BTreeSet<PathBuf> {
    iter_run_dirs(&pillar.artifacts()).into_iter().collect()
}
