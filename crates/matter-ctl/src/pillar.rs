use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Canonical pillar directory names at the repository root.
pub const PILLAR_NAMES: [&str; 9] = [
    "ENERGY",
    "GRAVITY",
    "INERTIA",
    "MAGNETISM",
    "TUNNEL",
    "CONNECTIVITY",
    "THERMO",
    "MATTER",
    "BRIDGE",
];

/// How many parent directories the repo-root walk inspects before giving up.
const ROOT_WALK_DEPTH: usize = 10;

/// One top-level test family directory and its conventional layout.
#[derive(Debug, Clone)]
pub struct Pillar {
    pub name: String,
    pub root: PathBuf,
}

impl Pillar {
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn src(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn tests(&self) -> PathBuf {
        self.root.join("tests")
    }

    pub fn artifacts(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    pub fn audit_registry(&self) -> PathBuf {
        self.root.join("AUDIT_REGISTRY.md")
    }

    pub fn docs(&self) -> PathBuf {
        self.root.join("docs")
    }
}

/// Repository root: `TESSARIS_REPO_ROOT` wins, then the nearest ancestor of
/// the working directory carrying a `.git` marker, then the working
/// directory itself.
pub fn find_repo_root() -> PathBuf {
    if let Ok(env) = std::env::var("TESSARIS_REPO_ROOT") {
        if !env.is_empty() {
            return PathBuf::from(env);
        }
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let mut probe = cwd.clone();
    for _ in 0..ROOT_WALK_DEPTH {
        if probe.join(".git").exists() {
            return probe;
        }
        match probe.parent() {
            Some(parent) => probe = parent.to_path_buf(),
            None => break,
        }
    }
    cwd
}

/// Pillars present under `repo`, keyed by lowercase directory name.
pub fn pillars(repo: &Path) -> BTreeMap<String, Pillar> {
    let mut out = BTreeMap::new();
    for name in PILLAR_NAMES {
        let root = repo.join(name);
        if root.is_dir() {
            out.insert(
                name.to_lowercase(),
                Pillar {
                    name: name.to_string(),
                    root,
                },
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_pillar, temp_repo};
    use std::fs;

    #[test]
    fn pillars_are_keyed_by_lowercase_name() {
        let repo = temp_repo("pillars");
        make_pillar(&repo, "MATTER");
        make_pillar(&repo, "BRIDGE");
        fs::create_dir_all(repo.join("NOT_A_PILLAR")).expect("decoy");

        let found = pillars(&repo);
        assert_eq!(found.len(), 2);
        assert!(found.contains_key("matter"));
        assert!(found.contains_key("bridge"));
        assert_eq!(found["matter"].name, "MATTER");
        let _ = fs::remove_dir_all(repo);
    }

    #[test]
    fn pillar_layout_accessors_point_into_the_root() {
        let p = Pillar {
            name: "MATTER".to_string(),
            root: PathBuf::from("/repo/MATTER"),
        };
        assert_eq!(p.key(), "matter");
        assert_eq!(p.src(), PathBuf::from("/repo/MATTER/src"));
        assert_eq!(p.audit_registry(), PathBuf::from("/repo/MATTER/AUDIT_REGISTRY.md"));
    }
}
