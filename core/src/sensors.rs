//! Simulated accelerometer and GPS sensors.
//!
//! Both sensors turn ground truth into realistic measurements with the additive error model
//!
//! $$
//! z = x_{true} + b + w, \qquad w \sim \mathcal{N}(0, \sigma^2)
//! $$
//!
//! where the accelerometer carries a constant bias $b$ and the GPS is unbiased. The GPS also
//! reports at a slower cadence than the inertial loop, which is decided by a [`GpsScheduler`].
//!
//! Sensors do not own a random generator; the run's single [`NoiseGenerator`] is lent to
//! each `measure` call so that one seed reproduces the full run.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, Result, check_positive, check_std};
use crate::noise::NoiseGenerator;

/// Tolerance used when deciding whether a base step crossed a GPS epoch.
const EPOCH_EPSILON: f64 = 1e-9;

/// Accelerometer error parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccelerometerConfig {
    /// Constant bias in m/s². May be negative.
    pub bias: f64,
    /// White noise standard deviation in m/s².
    pub noise_std: f64,
}

impl Default for AccelerometerConfig {
    fn default() -> Self {
        AccelerometerConfig {
            bias: 0.01,
            noise_std: 0.05,
        }
    }
}

/// Accelerometer with a fixed bias and white Gaussian noise.
///
/// The bias does not drift; it is fixed for the lifetime of the sensor.
#[derive(Clone, Debug)]
pub struct AccelerometerSensor {
    config: AccelerometerConfig,
}

impl AccelerometerSensor {
    /// # Errors
    /// `ConfigurationError` when the noise standard deviation is negative or either
    /// parameter is not finite.
    pub fn new(config: AccelerometerConfig) -> Result<Self> {
        if !config.bias.is_finite() {
            return Err(FusionError::config(format!(
                "accelerometer bias must be finite, got {}",
                config.bias
            )));
        }
        check_std("accelerometer noise_std", config.noise_std)?;
        Ok(AccelerometerSensor { config })
    }

    pub fn bias(&self) -> f64 {
        self.config.bias
    }

    pub fn noise_std(&self) -> f64 {
        self.config.noise_std
    }

    /// Noise variance σ², the natural starting point when tuning the filter's Q.
    pub fn variance(&self) -> f64 {
        self.config.noise_std.powi(2)
    }

    /// Measured acceleration: `a_true + bias + N(0, noise_std²)`.
    pub fn measure(&self, true_acceleration: f64, noise: &mut NoiseGenerator) -> f64 {
        noise.corrupt(true_acceleration, self.config.bias, self.config.noise_std)
    }

    pub fn measure_batch(&self, true_accelerations: &[f64], noise: &mut NoiseGenerator) -> Vec<f64> {
        true_accelerations
            .iter()
            .map(|a| self.measure(*a, noise))
            .collect()
    }
}

impl Display for AccelerometerSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Accelerometer(bias: {:.4} m/s², noise std: {:.4} m/s²)",
            self.config.bias, self.config.noise_std
        )
    }
}

/// GPS error and cadence parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GpsConfig {
    /// Position noise standard deviation in meters.
    pub noise_std: f64,
    /// Time between fixes in seconds.
    pub period_s: f64,
}

impl Default for GpsConfig {
    fn default() -> Self {
        GpsConfig {
            noise_std: 3.0,
            period_s: 1.0,
        }
    }
}

/// Decides on which base-loop steps a GPS fix is available.
///
/// Step `k` covers simulation time `k·dt`. A fix is due on step 0 and on every step that is
/// the first one at or after a GPS epoch `n·period`, i.e. when
/// `floor(k·dt/period) != floor((k-1)·dt/period)`. When the period is an exact multiple of
/// the base step this reduces to every `period/dt` steps (0, 10, 20, ... for a 1 s period and
/// a 0.1 s step). For non-integer ratios the fix lands on the step just after the epoch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsScheduler {
    base_dt: f64,
    period_s: f64,
}

impl GpsScheduler {
    /// # Errors
    /// `ConfigurationError` unless `0 < base_dt <= period_s`.
    pub fn new(base_dt: f64, period_s: f64) -> Result<Self> {
        check_positive("base time step", base_dt)?;
        check_positive("GPS period", period_s)?;
        if period_s < base_dt {
            return Err(FusionError::config(format!(
                "GPS period ({} s) must not be shorter than the base time step ({} s)",
                period_s, base_dt
            )));
        }
        Ok(GpsScheduler { base_dt, period_s })
    }

    /// Base steps per GPS fix (may be fractional).
    pub fn steps_per_fix(&self) -> f64 {
        self.period_s / self.base_dt
    }

    fn epoch(&self, step_index: usize) -> f64 {
        (step_index as f64 * self.base_dt / self.period_s + EPOCH_EPSILON).floor()
    }

    pub fn is_due(&self, step_index: usize) -> bool {
        if step_index == 0 {
            return true;
        }
        self.epoch(step_index) != self.epoch(step_index - 1)
    }
}

/// Position-only GPS receiver with white Gaussian noise and a reduced update rate.
#[derive(Clone, Debug)]
pub struct GpsSensor {
    config: GpsConfig,
    scheduler: GpsScheduler,
}

impl GpsSensor {
    /// Build a receiver sampled by a base loop running at `base_dt`.
    ///
    /// # Errors
    /// `ConfigurationError` for a negative noise standard deviation, a non-positive base
    /// step, or a GPS period shorter than the base step.
    pub fn new(config: GpsConfig, base_dt: f64) -> Result<Self> {
        check_std("GPS noise_std", config.noise_std)?;
        let scheduler = GpsScheduler::new(base_dt, config.period_s)?;
        Ok(GpsSensor { config, scheduler })
    }

    pub fn noise_std(&self) -> f64 {
        self.config.noise_std
    }

    pub fn period_s(&self) -> f64 {
        self.config.period_s
    }

    /// Measurement variance σ², i.e. the filter's R.
    pub fn variance(&self) -> f64 {
        self.config.noise_std.powi(2)
    }

    pub fn scheduler(&self) -> &GpsScheduler {
        &self.scheduler
    }

    /// Whether a fix is available on base step `step_index`.
    pub fn is_due(&self, step_index: usize) -> bool {
        self.scheduler.is_due(step_index)
    }

    /// Measured position: `x_true + N(0, noise_std²)`.
    pub fn measure(&self, true_position: f64, noise: &mut NoiseGenerator) -> f64 {
        noise.corrupt(true_position, 0.0, self.config.noise_std)
    }

    pub fn measure_batch(&self, true_positions: &[f64], noise: &mut NoiseGenerator) -> Vec<f64> {
        true_positions
            .iter()
            .map(|x| self.measure(*x, noise))
            .collect()
    }
}

impl Display for GpsSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GPS(noise std: {:.3} m, period: {:.3} s, every {:.1} steps)",
            self.config.noise_std,
            self.config.period_s,
            self.scheduler.steps_per_fix()
        )
    }
}
