//! Seedable Gaussian noise source shared by the simulated sensors.
//!
//! A single [`NoiseGenerator`] is created per simulation run and lent to each sensor when it
//! takes a measurement. Keeping one owned random sequence (rather than a global generator or
//! a fresh one per call) makes a whole run reproducible from a single seed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// Zero-mean white Gaussian noise source.
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    rng: StdRng,
    seed: Option<u64>,
}

impl NoiseGenerator {
    /// Create a generator whose sequence is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        NoiseGenerator {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a generator seeded from the operating system. Runs are not reproducible.
    pub fn from_entropy() -> Self {
        NoiseGenerator {
            rng: StdRng::from_os_rng(),
            seed: None,
        }
    }

    /// Seed used at construction, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Draw one sample from N(0, std_dev²).
    ///
    /// A zero standard deviation returns exactly `0.0` and does not advance the sequence.
    /// Callers are responsible for passing a non-negative `std_dev`; the sensors validate
    /// theirs at construction.
    pub fn sample(&mut self, std_dev: f64) -> f64 {
        if std_dev == 0.0 {
            return 0.0;
        }
        let z: f64 = StandardNormal.sample(&mut self.rng);
        std_dev * z
    }

    /// Draw `n` independent samples from N(0, std_dev²).
    pub fn samples(&mut self, std_dev: f64, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.sample(std_dev)).collect()
    }

    /// Corrupt an ideal value with a constant bias and white noise: `z = x + b + w`.
    pub fn corrupt(&mut self, true_value: f64, bias: f64, std_dev: f64) -> f64 {
        true_value + bias + self.sample(std_dev)
    }
}
