use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-step observation handed to a controller. Which variant arrives is
/// fixed by the test the controller is driving.
#[derive(Debug, Clone, Copy)]
pub enum Observation {
    Soliton {
        step: usize,
        width: f64,
        peak: f64,
        width0: f64,
        peak0: f64,
    },
    Collision {
        peak: f64,
        target_peak: f64,
        symmetry_error: f64,
    },
}

/// Controller contract for the benchmark kernels.
///
/// `act` must be a pure function of the observation and the controller's own
/// state: no I/O, no access to simulator internals. Controllers with
/// internal randomness re-seed it in `reset`, which the kernel calls exactly
/// once before the step loop. Capabilities are declared up front: a
/// controller that wants the kernel to cap its effective coupling returns
/// `Some` from `chi_cap`.
pub trait Controller {
    fn name(&self) -> &'static str;

    fn reset(&mut self, _seed: u64) {}

    fn chi_cap(&self) -> Option<f64> {
        None
    }

    /// Returns the gain (MT01) or the requested coupling `chi` (MT02).
    fn act(&mut self, obs: &Observation) -> f64;
}

/// Baseline: no actuation at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenLoop;

impl Controller for OpenLoop {
    fn name(&self) -> &'static str {
        "open_loop"
    }

    fn act(&mut self, _obs: &Observation) -> f64 {
        0.0
    }
}

/// Baseline: uniform random actuation in `[0, cap)`, re-seeded per run.
#[derive(Debug)]
pub struct RandomJitter {
    name: &'static str,
    cap: f64,
    rng: StdRng,
}

impl RandomJitter {
    /// MT01 flavor: jitters the gain channel.
    pub fn gain(cap: f64) -> Self {
        Self {
            name: "random_jitter_gain",
            cap,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// MT02 flavor: jitters the coupling channel.
    pub fn chi(cap: f64) -> Self {
        Self {
            name: "random_jitter_chi",
            cap,
            rng: StdRng::seed_from_u64(0),
        }
    }
}

impl Controller for RandomJitter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn reset(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn act(&mut self, _obs: &Observation) -> f64 {
        self.rng.gen_range(0.0..self.cap)
    }
}

/// Bounded closed-loop proportional controller for MT01.
///
/// Holds the initial width and peak: percent errors on both channels feed a
/// gain that is clamped to `[0, gain_cap]`. Declares a coupling cap so the
/// kernel bounds `chi_eff` at `chi_cap * chi_base`.
#[derive(Debug, Clone, Copy)]
pub struct SolitonHold {
    pub base_gain: f64,
    pub kp_width: f64,
    pub kp_peak: f64,
    pub gain_cap: f64,
    pub chi_cap: f64,
}

impl Default for SolitonHold {
    fn default() -> Self {
        Self {
            base_gain: 0.02,
            kp_width: 0.004,
            kp_peak: 0.004,
            gain_cap: 0.25,
            chi_cap: 2.0,
        }
    }
}

impl Controller for SolitonHold {
    fn name(&self) -> &'static str {
        "tessaris_soliton_hold"
    }

    fn chi_cap(&self) -> Option<f64> {
        Some(self.chi_cap)
    }

    fn act(&mut self, obs: &Observation) -> f64 {
        match obs {
            Observation::Soliton {
                width,
                peak,
                width0,
                peak0,
                ..
            } => {
                let ew = (width - width0) / width0;
                let ea = (peak0 - peak) / peak0;
                let gain = self.base_gain
                    + self.kp_width * (100.0 * ew).abs()
                    + self.kp_peak * (100.0 * ea).abs();
                gain.clamp(0.0, self.gain_cap)
            }
            Observation::Collision { .. } => 0.0,
        }
    }
}

/// Bounded closed-loop coupling hold for MT02.
///
/// Tracks the target peak and backs off in proportion to the accumulated
/// symmetry error; output clamped to `[0, chi_cap]`.
#[derive(Debug, Clone, Copy)]
pub struct CollisionHold {
    pub chi_base: f64,
    pub kp_peak: f64,
    pub k_sym: f64,
    pub chi_cap: f64,
}

impl Default for CollisionHold {
    fn default() -> Self {
        Self {
            chi_base: 0.1,
            kp_peak: 0.8,
            k_sym: 0.2,
            chi_cap: 0.3,
        }
    }
}

impl Controller for CollisionHold {
    fn name(&self) -> &'static str {
        "tessaris_collision_hold"
    }

    fn chi_cap(&self) -> Option<f64> {
        Some(self.chi_cap)
    }

    fn act(&mut self, obs: &Observation) -> f64 {
        match obs {
            Observation::Collision {
                peak,
                target_peak,
                symmetry_error,
            } => {
                let chi = self.chi_base + self.kp_peak * (target_peak - peak)
                    - self.k_sym * symmetry_error;
                chi.clamp(0.0, self.chi_cap)
            }
            Observation::Soliton { .. } => 0.0,
        }
    }
}
