use std::path::Path;

use walkdir::WalkDir;

use crate::pillar::pillars;
use crate::verify::registry_verify;

/// Repository health checks. Returns one `FAIL ...` line per finding:
/// registry verification (unless `quick`), filesystem names with a trailing
/// space, and pillars missing the `src/`/`tests/` layout.
pub fn doctor_failures(repo: &Path, quick: bool) -> Vec<String> {
    let mut failures = if quick {
        Vec::new()
    } else {
        registry_verify(repo)
    };

    for (_, pillar) in pillars(repo) {
        for entry in WalkDir::new(&pillar.root).into_iter().filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy();
            if name.ends_with(' ') {
                failures.push(format!(
                    "FAIL trailing space in path: {}",
                    entry.path().display()
                ));
            }
        }
        if !pillar.src().is_dir() {
            failures.push(format!("FAIL missing src/: {}", pillar.name));
        }
        if !pillar.tests().is_dir() {
            failures.push(format!("FAIL missing tests/: {}", pillar.name));
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_pillar, temp_repo};
    use std::fs;

    #[test]
    fn healthy_repo_has_no_failures() {
        let repo = temp_repo("doctor_ok");
        make_pillar(&repo, "MATTER");
        assert!(doctor_failures(&repo, false).is_empty());
        let _ = fs::remove_dir_all(repo);
    }

    #[test]
    fn missing_layout_and_trailing_spaces_are_reported() {
        let repo = temp_repo("doctor_bad");
        let matter = make_pillar(&repo, "MATTER");
        fs::remove_dir(matter.join("tests")).expect("drop tests dir");
        fs::write(matter.join("notes "), "x").expect("trailing-space file");

        let failures = doctor_failures(&repo, true);
        assert!(failures.iter().any(|f| f.contains("trailing space")));
        assert!(failures.iter().any(|f| f == "FAIL missing tests/: MATTER"));
        assert!(!failures.iter().any(|f| f.contains("missing src/")));
        let _ = fs::remove_dir_all(repo);
    }

    #[test]
    fn quick_mode_skips_registry_verification() {
        let repo = temp_repo("doctor_quick");
        let matter = make_pillar(&repo, "MATTER");
        // A pin with no bundle behind it: verify would flag this.
        fs::write(
            matter.join("AUDIT_REGISTRY.md"),
            "MATTER/artifacts/programmable_matter/MT01/abcdef0/ (abcdef0)\n",
        )
        .expect("registry");

        assert!(doctor_failures(&repo, true).is_empty());
        assert!(!doctor_failures(&repo, false).is_empty());
        let _ = fs::remove_dir_all(repo);
    }
}
