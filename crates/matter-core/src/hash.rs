use std::collections::BTreeMap;

use serde_json::{json, Value};
use sha1::{Digest, Sha1};

use crate::canonical::canonical_json;

/// Number of hex characters kept from the digest. Short enough to read in a
/// path, long enough that collisions across a test family are implausible.
const HASH_LEN: usize = 7;

/// Deterministic run hash over `{cfg, controller, seed, test_id}`.
///
/// Identical inputs give the identical hash on every machine; changing any
/// config field, the controller name, the test id, or the seed changes it.
pub fn run_hash(
    test_id: &str,
    cfg: &BTreeMap<String, Value>,
    controller_name: &str,
    seed: u64,
) -> String {
    let blob = json!({
        "cfg": cfg,
        "controller": controller_name,
        "seed": seed,
        "test_id": test_id,
    });
    let digest = Sha1::digest(canonical_json(&blob).as_bytes());
    hex::encode(digest)[..HASH_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cfg() -> BTreeMap<String, Value> {
        let mut cfg = BTreeMap::new();
        cfg.insert("n".to_string(), json!(96));
        cfg.insert("steps".to_string(), json!(5000));
        cfg.insert("alpha".to_string(), json!(0.18));
        cfg
    }

    #[test]
    fn run_hash_is_seven_lowercase_hex_chars() {
        let h = run_hash("MT01", &sample_cfg(), "open_loop", 1337);
        assert_eq!(h.len(), 7);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn run_hash_is_stable_across_calls() {
        let a = run_hash("MT01", &sample_cfg(), "open_loop", 1337);
        let b = run_hash("MT01", &sample_cfg(), "open_loop", 1337);
        assert_eq!(a, b);
    }

    #[test]
    fn run_hash_changes_with_each_input() {
        let base = run_hash("MT01", &sample_cfg(), "open_loop", 1337);
        assert_ne!(base, run_hash("MT02", &sample_cfg(), "open_loop", 1337));
        assert_ne!(base, run_hash("MT01", &sample_cfg(), "random_jitter_gain", 1337));
        assert_ne!(base, run_hash("MT01", &sample_cfg(), "open_loop", 1338));

        let mut cfg = sample_cfg();
        cfg.insert("alpha".to_string(), json!(0.19));
        assert_ne!(base, run_hash("MT01", &cfg, "open_loop", 1337));
    }
}
