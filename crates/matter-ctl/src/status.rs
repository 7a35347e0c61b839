use std::path::Path;

use crate::pillar::pillars;

/// Presence of the conventional layout pieces for one pillar.
#[derive(Debug, Clone)]
pub struct PillarStatus {
    pub key: String,
    pub has_src: bool,
    pub has_tests: bool,
    pub has_audit: bool,
    pub has_artifacts: bool,
}

pub fn pillar_status(repo: &Path) -> Vec<PillarStatus> {
    pillars(repo)
        .into_iter()
        .map(|(key, pillar)| PillarStatus {
            key,
            has_src: pillar.src().is_dir(),
            has_tests: pillar.tests().is_dir(),
            has_audit: pillar.audit_registry().is_file(),
            has_artifacts: pillar.artifacts().is_dir(),
        })
        .collect()
}
