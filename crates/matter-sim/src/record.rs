use serde::{Deserialize, Serialize};

/// Fixed column order for `metrics.csv` and the canonical series order in
/// `run.json`.
pub const SERIES_ORDER: [&str; 6] = [
    "peak_series",
    "width_series",
    "gain_series",
    "chi_series",
    "norm_series",
    "symmetry_error_series",
];

/// Result of one simulator run: identifiers, scalar summaries and the
/// per-step time series. Built incrementally inside a kernel, then frozen;
/// persisted at most once by the artifact writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub test_id: String,
    pub run_hash: String,
    pub controller: String,
    pub seed: u64,

    // MT01 scalars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "peakT")]
    pub peak_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width0: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "widthT")]
    pub width_t: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_retention_raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_drift_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_norm: Option<f64>,

    // MT02 scalars.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_init: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_final: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_error_final: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symmetry_error_final: Option<f64>,

    /// Audit metric, common to both tests.
    pub peak_retention: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peak_series: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub width_series: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gain_series: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chi_series: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub norm_series: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symmetry_error_series: Vec<f64>,
}

impl RunRecord {
    pub fn new(test_id: &str, run_hash: &str, controller: &str, seed: u64) -> Self {
        Self {
            test_id: test_id.to_string(),
            run_hash: run_hash.to_string(),
            controller: controller.to_string(),
            seed,
            peak0: None,
            peak_t: None,
            width0: None,
            width_t: None,
            peak_retention_raw: None,
            width_drift_pct: None,
            max_norm: None,
            peak_init: None,
            peak_final: None,
            peak_error_final: None,
            symmetry_error_final: None,
            peak_retention: 0.0,
            peak_series: Vec::new(),
            width_series: Vec::new(),
            gain_series: Vec::new(),
            chi_series: Vec::new(),
            norm_series: Vec::new(),
            symmetry_error_series: Vec::new(),
        }
    }

    /// Non-empty series in the fixed `SERIES_ORDER`, paired with their names.
    pub fn present_series(&self) -> Vec<(&'static str, &[f64])> {
        let all: [(&'static str, &[f64]); 6] = [
            ("peak_series", &self.peak_series),
            ("width_series", &self.width_series),
            ("gain_series", &self.gain_series),
            ("chi_series", &self.chi_series),
            ("norm_series", &self.norm_series),
            ("symmetry_error_series", &self.symmetry_error_series),
        ];
        all.into_iter().filter(|(_, s)| !s.is_empty()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_scalars_and_series_are_not_serialized() {
        let rec = RunRecord::new("MT01", "abcdef0", "open_loop", 1337);
        let v = serde_json::to_value(&rec).expect("serialize");
        let obj = v.as_object().expect("object");
        assert!(obj.contains_key("test_id"));
        assert!(obj.contains_key("run_hash"));
        assert!(!obj.contains_key("peak0"));
        assert!(!obj.contains_key("peak_series"));
        assert!(!obj.contains_key("symmetry_error_final"));
    }

    #[test]
    fn present_series_keeps_fixed_order() {
        let mut rec = RunRecord::new("MT02", "abcdef0", "open_loop", 1);
        rec.symmetry_error_series = vec![0.1];
        rec.peak_series = vec![1.0];
        rec.chi_series = vec![0.0];
        let names: Vec<&str> = rec.present_series().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["peak_series", "chi_series", "symmetry_error_series"]);

        // present_series is always a subsequence of the canonical order.
        let order: Vec<usize> = names
            .iter()
            .map(|n| SERIES_ORDER.iter().position(|o| o == n).expect("known name"))
            .collect();
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn final_scalar_names_follow_the_bundle_convention() {
        let mut rec = RunRecord::new("MT01", "abcdef0", "open_loop", 1);
        rec.peak_t = Some(0.8);
        rec.width_t = Some(4.2);
        let v = serde_json::to_value(&rec).expect("serialize");
        assert!(v.get("peakT").is_some());
        assert!(v.get("widthT").is_some());
    }
}
