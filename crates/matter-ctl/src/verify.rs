use std::collections::BTreeSet;
use std::path::Path;

use walkdir::WalkDir;

use crate::anchors::{extract_pins, read_text_safe};
use crate::pillar::pillars;

/// Verify the audit registries of every pillar:
///
/// - each pinned artifact path must exist on disk and contain `run.json`;
/// - each pinned 7-hex hash must appear at least twice across the registry
///   plus the pillar's `docs/**/*.md`, i.e. be cited in prose rather than
///   only inside the path literal.
///
/// Returns one `FAIL ...` line per violation; the caller decides the exit
/// code. All pins are checked, never just the first failure.
pub fn registry_verify(repo: &Path) -> Vec<String> {
    let mut failures = Vec::new();

    for (_, pillar) in pillars(repo) {
        let audit = pillar.audit_registry();
        if !audit.exists() {
            continue;
        }
        let audit_text = read_text_safe(&audit);
        let pins = extract_pins(&audit_text);
        if pins.is_empty() {
            continue;
        }

        let mut docs_text = String::new();
        if pillar.docs().exists() {
            for entry in WalkDir::new(pillar.docs())
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("md"))
            {
                docs_text.push_str(&read_text_safe(entry.path()));
                docs_text.push('\n');
            }
        }

        let mut seen = BTreeSet::new();
        for pin in pins {
            if !seen.insert(pin.clone()) {
                continue;
            }

            let rel = pin.path.trim_start_matches(|c| c == '.' || c == '/');
            let disk = repo.join(rel);
            if !(disk.exists() && disk.join("run.json").exists()) {
                failures.push(format!("FAIL missing on disk: {}", disk.display()));
            }

            let mentions = audit_text.matches(&pin.run_hash).count()
                + docs_text.matches(&pin.run_hash).count();
            if mentions < 2 {
                failures.push(format!(
                    "FAIL not evidenced (hash only appears {}x): {} {} {}",
                    mentions, pillar.name, pin.test_id, pin.run_hash
                ));
            }
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{make_pillar, make_run_dir, temp_repo};
    use std::fs;

    #[test]
    fn pinned_and_cited_registry_passes() {
        let repo = temp_repo("verify_ok");
        let matter = make_pillar(&repo, "MATTER");
        make_run_dir(&matter, "MT01", "abcdef0", true);
        fs::write(
            matter.join("AUDIT_REGISTRY.md"),
            "Pinned: MATTER/artifacts/programmable_matter/MT01/abcdef0/\n",
        )
        .expect("registry");
        fs::write(
            matter.join("docs").join("summary.md"),
            "The soliton hold run abcdef0 retained its peak.\n",
        )
        .expect("docs");

        assert!(registry_verify(&repo).is_empty());
        let _ = fs::remove_dir_all(repo);
    }

    #[test]
    fn hash_cited_only_in_the_path_literal_fails() {
        let repo = temp_repo("verify_evidence");
        let matter = make_pillar(&repo, "MATTER");
        make_run_dir(&matter, "MT01", "abcdef0", true);
        fs::write(
            matter.join("AUDIT_REGISTRY.md"),
            "Pinned: MATTER/artifacts/programmable_matter/MT01/abcdef0/\n",
        )
        .expect("registry");

        let failures = registry_verify(&repo);
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0],
            "FAIL not evidenced (hash only appears 1x): MATTER MT01 abcdef0"
        );
        let _ = fs::remove_dir_all(repo);
    }

    #[test]
    fn missing_bundle_on_disk_fails() {
        let repo = temp_repo("verify_missing");
        let matter = make_pillar(&repo, "MATTER");
        fs::write(
            matter.join("AUDIT_REGISTRY.md"),
            "Pinned: MATTER/artifacts/programmable_matter/MT01/abcdef0/\n",
        )
        .expect("registry");
        fs::write(
            matter.join("docs").join("summary.md"),
            "Run abcdef0 is discussed here.\n",
        )
        .expect("docs");

        let failures = registry_verify(&repo);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("FAIL missing on disk: "));
        assert!(failures[0].contains("abcdef0"));
        let _ = fs::remove_dir_all(repo);
    }

    #[test]
    fn duplicate_pins_are_reported_once() {
        let repo = temp_repo("verify_dupe");
        let matter = make_pillar(&repo, "MATTER");
        fs::write(
            matter.join("AUDIT_REGISTRY.md"),
            "MATTER/artifacts/programmable_matter/MT01/abcdef0/\n\
MATTER/artifacts/programmable_matter/MT01/abcdef0/\n",
        )
        .expect("registry");

        let failures = registry_verify(&repo);
        // One missing-on-disk line; the hash appears twice so it is evidenced.
        assert_eq!(failures.len(), 1);
        assert!(failures[0].starts_with("FAIL missing on disk: "));
        let _ = fs::remove_dir_all(repo);
    }
}
