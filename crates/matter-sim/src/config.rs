use std::collections::BTreeMap;

use matter_core::{Canonical, MatterError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn check_count(field: &'static str, value: usize) -> Result<(), MatterError> {
    if value == 0 {
        return Err(MatterError::Config {
            field,
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

fn check_finite(field: &'static str, value: f64) -> Result<(), MatterError> {
    if !value.is_finite() {
        return Err(MatterError::Config {
            field,
            reason: format!("must be finite, got {}", value),
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), MatterError> {
    check_finite(field, value)?;
    if value <= 0.0 {
        return Err(MatterError::Config {
            field,
            reason: format!("must be positive, got {}", value),
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), MatterError> {
    check_finite(field, value)?;
    if value < 0.0 {
        return Err(MatterError::Config {
            field,
            reason: format!("must be non-negative, got {}", value),
        });
    }
    Ok(())
}

/// Parameter bundle for the MT01 soliton-persistence proxy.
///
/// Immutable after construction; the canonical mapping below is the wire
/// form used for `config.json` and the run hash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mt01Config {
    pub n: usize,
    pub steps: usize,
    pub alpha: f64,
    pub lam: f64,
    pub noise_std: f64,
    pub chi_base: f64,
    pub clip: f64,
    pub amp0: f64,
    pub sigma0: f64,
    /// Carried in the record for provenance; the MT01 update rule is
    /// expressed per-step and does not consume it.
    pub dt: f64,
}

impl Default for Mt01Config {
    fn default() -> Self {
        Self {
            n: 96,
            steps: 5000,
            alpha: 0.18,
            lam: 0.06,
            noise_std: 0.002,
            chi_base: 0.1,
            clip: 5.0,
            amp0: 1.0,
            sigma0: 4.0,
            dt: 0.05,
        }
    }
}

impl Mt01Config {
    pub fn validate(&self) -> Result<(), MatterError> {
        check_count("n", self.n)?;
        check_count("steps", self.steps)?;
        check_finite("alpha", self.alpha)?;
        check_finite("lam", self.lam)?;
        check_non_negative("noise_std", self.noise_std)?;
        check_finite("chi_base", self.chi_base)?;
        check_positive("clip", self.clip)?;
        check_positive("amp0", self.amp0)?;
        check_positive("sigma0", self.sigma0)?;
        check_positive("dt", self.dt)?;
        Ok(())
    }
}

impl Canonical for Mt01Config {
    fn canonical_fields(&self) -> BTreeMap<String, Value> {
        let mut m = BTreeMap::new();
        m.insert("n".to_string(), json!(self.n));
        m.insert("steps".to_string(), json!(self.steps));
        m.insert("alpha".to_string(), json!(self.alpha));
        m.insert("lam".to_string(), json!(self.lam));
        m.insert("noise_std".to_string(), json!(self.noise_std));
        m.insert("chi_base".to_string(), json!(self.chi_base));
        m.insert("clip".to_string(), json!(self.clip));
        m.insert("amp0".to_string(), json!(self.amp0));
        m.insert("sigma0".to_string(), json!(self.sigma0));
        m.insert("dt".to_string(), json!(self.dt));
        m
    }
}

/// Parameter bundle for the MT02 collision-symmetry proxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mt02Config {
    pub n: usize,
    pub steps: usize,
    pub alpha: f64,
    pub lam: f64,
    pub noise_std: f64,
    pub chi_base: f64,
    pub chi_cap: f64,
    pub clip: f64,
    pub amp0: f64,
    pub sigma0: f64,
    pub dt: f64,
    pub separation: f64,
    pub k0: f64,
}

impl Default for Mt02Config {
    fn default() -> Self {
        Self {
            n: 96,
            steps: 600,
            alpha: 0.18,
            lam: 0.06,
            noise_std: 0.004,
            chi_base: 0.1,
            chi_cap: 0.3,
            clip: 1.2,
            amp0: 1.0,
            sigma0: 4.0,
            dt: 0.02,
            separation: 12.0,
            k0: 0.35,
        }
    }
}

impl Mt02Config {
    pub fn validate(&self) -> Result<(), MatterError> {
        check_count("n", self.n)?;
        check_count("steps", self.steps)?;
        check_finite("alpha", self.alpha)?;
        check_finite("lam", self.lam)?;
        check_non_negative("noise_std", self.noise_std)?;
        check_finite("chi_base", self.chi_base)?;
        check_positive("chi_cap", self.chi_cap)?;
        check_positive("clip", self.clip)?;
        check_positive("amp0", self.amp0)?;
        check_positive("sigma0", self.sigma0)?;
        check_positive("dt", self.dt)?;
        check_positive("separation", self.separation)?;
        check_finite("k0", self.k0)?;
        Ok(())
    }
}

impl Canonical for Mt02Config {
    fn canonical_fields(&self) -> BTreeMap<String, Value> {
        let mut m = BTreeMap::new();
        m.insert("n".to_string(), json!(self.n));
        m.insert("steps".to_string(), json!(self.steps));
        m.insert("alpha".to_string(), json!(self.alpha));
        m.insert("lam".to_string(), json!(self.lam));
        m.insert("noise_std".to_string(), json!(self.noise_std));
        m.insert("chi_base".to_string(), json!(self.chi_base));
        m.insert("chi_cap".to_string(), json!(self.chi_cap));
        m.insert("clip".to_string(), json!(self.clip));
        m.insert("amp0".to_string(), json!(self.amp0));
        m.insert("sigma0".to_string(), json!(self.sigma0));
        m.insert("dt".to_string(), json!(self.dt));
        m.insert("separation".to_string(), json!(self.separation));
        m.insert("k0".to_string(), json!(self.k0));
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_validate() {
        Mt01Config::default().validate().expect("MT01 defaults");
        Mt02Config::default().validate().expect("MT02 defaults");
    }

    #[test]
    fn zero_steps_is_rejected() {
        let cfg = Mt01Config {
            steps: 0,
            ..Mt01Config::default()
        };
        let err = cfg.validate().expect_err("zero steps must fail");
        assert!(err.to_string().contains("steps"));
    }

    #[test]
    fn non_finite_fields_are_rejected() {
        let cfg = Mt01Config {
            alpha: f64::NAN,
            ..Mt01Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Mt02Config {
            chi_cap: f64::INFINITY,
            ..Mt02Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn canonical_fields_cover_every_knob() {
        let m = Mt01Config::default().canonical_fields();
        for key in [
            "n", "steps", "alpha", "lam", "noise_std", "chi_base", "clip", "amp0", "sigma0", "dt",
        ] {
            assert!(m.contains_key(key), "missing {}", key);
        }
        let m = Mt02Config::default().canonical_fields();
        for key in ["chi_cap", "separation", "k0"] {
            assert!(m.contains_key(key), "missing {}", key);
        }
    }
}
