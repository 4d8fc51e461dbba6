//! Simulation driver, configuration, and result analysis.
//!
//! This module provides:
//! - `SimulationConfig`: every tunable of an experiment, (de)serializable from JSON/YAML/TOML
//! - `AccelerationProfile`: the true acceleration input driving the ground truth
//! - `run_simulation`: the fixed-order, single-threaded experiment loop
//! - `StepRecord`/`SimulationResult`: per-step output with CSV import/export
//! - `ErrorStatistics`: the INS-only versus Kalman error comparison
//!
//! Within each step the order is fixed: ground-truth propagation, sensor sampling, INS-only
//! propagation, Kalman prediction, and (when a GPS fix is due) the Kalman update.

use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::Path;

use log::{debug, info, warn};
use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::State1D;
use crate::error::{FusionError, Result};
use crate::kalman::{KalmanConfig, KalmanFilter1D};
use crate::motion::MotionModel;
use crate::noise::NoiseGenerator;
use crate::sensors::{AccelerometerConfig, AccelerometerSensor, GpsConfig, GpsSensor};

/// Tolerance when converting a duration into a whole number of steps.
const STEP_EPSILON: f64 = 1e-9;

/// Upper bound on the number of base steps in one run. Every step keeps a record in memory.
pub const MAX_STEPS: usize = 10_000_000;

/// Default random number generator seed for reproducible simulations
fn default_seed() -> u64 {
    42
}

/// True acceleration applied to the vehicle as a function of time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccelerationProfile {
    /// Constant acceleration for the whole run.
    Constant { value: f64 },
    /// Reference manoeuvre: 0.5 m/s² until 20 s, a gentle 0.1·sin(0.5t) weave until 60 s,
    /// braking at −0.3 m/s² until 80 s, then coasting.
    #[default]
    Piecewise,
    /// `amplitude · sin(angular_frequency · t)`
    Sinusoid {
        amplitude: f64,
        angular_frequency: f64,
    },
}

impl AccelerationProfile {
    /// Acceleration (m/s²) at simulation time `t` (s).
    pub fn acceleration_at(&self, t: f64) -> f64 {
        match self {
            AccelerationProfile::Constant { value } => *value,
            AccelerationProfile::Piecewise => {
                if t < 20.0 {
                    0.5
                } else if t < 60.0 {
                    0.1 * (0.5 * t).sin()
                } else if t < 80.0 {
                    -0.3
                } else {
                    0.0
                }
            }
            AccelerationProfile::Sinusoid {
                amplitude,
                angular_frequency,
            } => amplitude * (angular_frequency * t).sin(),
        }
    }

    /// Sample the profile at the start of each of `n_steps` steps of length `dt`.
    pub fn sample(&self, n_steps: usize, dt: f64) -> Vec<f64> {
        (0..n_steps)
            .map(|k| self.acceleration_at(k as f64 * dt))
            .collect()
    }
}

/// Full configuration of one simulation run.
///
/// Defaults reproduce the reference experiment: a 100 s run at 10 Hz with a 1 Hz, 3 m GPS
/// and a 0.02 m/s² accelerometer bias.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Base time step (s), > 0
    pub dt: f64,
    /// Total simulated time (s), > 0
    pub total_time: f64,
    /// Time between GPS fixes (s), >= dt
    pub gps_period: f64,
    /// Accelerometer bias (m/s²)
    pub accel_bias: f64,
    /// Accelerometer white noise standard deviation (m/s²), >= 0
    pub accel_noise_std: f64,
    /// GPS position noise standard deviation (m), >= 0; also used as the filter's R
    pub gps_noise_std: f64,
    /// Assumed acceleration noise used to build the filter's Q (m/s²), >= 0
    pub process_noise_std: f64,
    /// Seed of the run's single noise generator
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Initial filter covariance, row-major
    pub initial_covariance: [[f64; 2]; 2],
    /// Initial state shared by truth, INS-only and the filter's initial guess
    pub initial_state: State1D,
    /// True acceleration input
    pub profile: AccelerationProfile,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            dt: 0.1,
            total_time: 100.0,
            gps_period: 1.0,
            accel_bias: 0.02,
            accel_noise_std: 0.1,
            gps_noise_std: 3.0,
            process_noise_std: 0.5,
            seed: default_seed(),
            initial_covariance: [[1.0, 0.0], [0.0, 1.0]],
            initial_state: State1D::default(),
            profile: AccelerationProfile::default(),
        }
    }
}

impl SimulationConfig {
    /// Number of base steps in the run, `total_time / dt` rounded down.
    ///
    /// Saturates for ratios that do not fit a `usize`; [`validate`](Self::validate) rejects
    /// any configuration above [`MAX_STEPS`].
    pub fn num_steps(&self) -> usize {
        (self.total_time / self.dt + STEP_EPSILON).floor() as usize
    }

    pub fn accelerometer_config(&self) -> AccelerometerConfig {
        AccelerometerConfig {
            bias: self.accel_bias,
            noise_std: self.accel_noise_std,
        }
    }

    pub fn gps_config(&self) -> GpsConfig {
        GpsConfig {
            noise_std: self.gps_noise_std,
            period_s: self.gps_period,
        }
    }

    pub fn kalman_config(&self) -> KalmanConfig {
        let p = self.initial_covariance;
        KalmanConfig {
            dt: self.dt,
            process_noise_std: self.process_noise_std,
            measurement_noise_std: self.gps_noise_std,
            initial_state: self.initial_state,
            initial_covariance: Matrix2::new(p[0][0], p[0][1], p[1][0], p[1][1]),
        }
    }

    /// Check every parameter by building the components of a run.
    ///
    /// # Errors
    /// The first `ConfigurationError` encountered.
    pub fn validate(&self) -> Result<()> {
        Components::build(self).map(|_| ())
    }

    /// Write the configuration to `path`, in the format named by its extension
    /// (.json, .yaml/.yml or .toml).
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let text = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(io::Error::other)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(io::Error::other)?,
            ConfigFormat::Toml => toml::to_string(self).map_err(io::Error::other)?,
        };
        fs::write(path, text)
    }

    /// Read a configuration written by [`to_file`](Self::to_file) or by hand. Missing
    /// fields take their default values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;
        match format {
            ConfigFormat::Json => serde_json::from_str(&text).map_err(io::Error::other),
            ConfigFormat::Yaml => serde_yaml::from_str(&text).map_err(io::Error::other),
            ConfigFormat::Toml => toml::from_str(&text).map_err(io::Error::other),
        }
    }
}

/// Serialization format of a configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> io::Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported configuration file extension: {}", path.display()),
            )),
        }
    }
}

/// Every component of a run, validated together before the loop starts.
struct Components {
    motion: MotionModel,
    accelerometer: AccelerometerSensor,
    gps: GpsSensor,
    filter: KalmanFilter1D,
}

impl Components {
    fn build(config: &SimulationConfig) -> Result<Self> {
        if !config.total_time.is_finite() || config.total_time <= 0.0 {
            return Err(FusionError::config(format!(
                "total_time must be finite and strictly positive, got {}",
                config.total_time
            )));
        }
        // The filter rejects dt <= 0, the motion model only dt < 0; build the filter first so
        // a zero step is reported as such.
        let filter = KalmanFilter1D::new(config.kalman_config())?;
        let ratio = config.total_time / config.dt;
        if !ratio.is_finite() || ratio > MAX_STEPS as f64 {
            return Err(FusionError::config(format!(
                "total_time / dt = {} exceeds the maximum of {} steps",
                ratio, MAX_STEPS
            )));
        }
        let motion = MotionModel::new(config.dt)?;
        let accelerometer = AccelerometerSensor::new(config.accelerometer_config())?;
        let gps = GpsSensor::new(config.gps_config(), config.dt)?;
        Ok(Components {
            motion,
            accelerometer,
            gps,
            filter,
        })
    }
}

/// One row of simulation output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Simulation time (s)
    pub time: f64,
    pub true_position: f64,
    pub true_velocity: f64,
    /// Uncorrected dead-reckoning solution
    pub ins_position: f64,
    pub ins_velocity: f64,
    /// Fused solution after this step's predict (and update, if any)
    pub kalman_position: f64,
    pub kalman_velocity: f64,
    /// Diagonal of the filter covariance
    pub kalman_position_variance: f64,
    pub kalman_velocity_variance: f64,
    /// GPS fix used on this step, if one was due
    pub gps_measurement: Option<f64>,
}

impl StepRecord {
    fn new(
        time: f64,
        truth: &State1D,
        ins: &State1D,
        filter: &KalmanFilter1D,
        gps_measurement: Option<f64>,
    ) -> Self {
        let estimate = filter.state();
        let covariance = filter.covariance();
        StepRecord {
            time,
            true_position: truth.position,
            true_velocity: truth.velocity,
            ins_position: ins.position,
            ins_velocity: ins.velocity,
            kalman_position: estimate.position,
            kalman_velocity: estimate.velocity,
            kalman_position_variance: covariance[(0, 0)],
            kalman_velocity_variance: covariance[(1, 1)],
            gps_measurement,
        }
    }

    pub fn true_state(&self) -> State1D {
        State1D::new(self.true_position, self.true_velocity)
    }
    pub fn ins_state(&self) -> State1D {
        State1D::new(self.ins_position, self.ins_velocity)
    }
    pub fn kalman_state(&self) -> State1D {
        State1D::new(self.kalman_position, self.kalman_velocity)
    }
    /// INS-only position error (estimate − truth)
    pub fn ins_error(&self) -> f64 {
        self.ins_position - self.true_position
    }
    /// Kalman position error (estimate − truth)
    pub fn kalman_error(&self) -> f64 {
        self.kalman_position - self.true_position
    }
}

/// Output of a simulation run: one record per step, index 0 being the initial state.
#[derive(Clone, Debug, Default)]
pub struct SimulationResult {
    pub records: Vec<StepRecord>,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of steps on which a GPS fix was applied.
    pub fn gps_fix_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.gps_measurement.is_some())
            .count()
    }

    /// Final (INS-only, Kalman) position errors; zeros for an empty result.
    pub fn final_errors(&self) -> (f64, f64) {
        self.records
            .last()
            .map(|r| (r.ins_error(), r.kalman_error()))
            .unwrap_or((0.0, 0.0))
    }

    /// Error statistics for the INS-only and Kalman solutions.
    pub fn statistics(&self) -> ComparisonStatistics {
        let ins: Vec<f64> = self.records.iter().map(StepRecord::ins_error).collect();
        let kalman: Vec<f64> = self.records.iter().map(StepRecord::kalman_error).collect();
        ComparisonStatistics {
            ins_only: ErrorStatistics::from_errors(&ins),
            kalman: ErrorStatistics::from_errors(&kalman),
        }
    }

    /// Writes the records to a CSV file, one row per step.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads records previously written with [`write_csv`](Self::write_csv).
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for result in reader.deserialize() {
            let record: StepRecord = result?;
            records.push(record);
        }
        Ok(SimulationResult { records })
    }
}

/// Summary of a signed error series.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ErrorStatistics {
    pub mean: f64,
    pub rms: f64,
    pub max_abs: f64,
    pub final_error: f64,
}

impl ErrorStatistics {
    pub fn from_errors(errors: &[f64]) -> Self {
        if errors.is_empty() {
            return ErrorStatistics::default();
        }
        let n = errors.len() as f64;
        ErrorStatistics {
            mean: errors.iter().sum::<f64>() / n,
            rms: (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt(),
            max_abs: errors.iter().fold(0.0_f64, |acc, e| acc.max(e.abs())),
            final_error: errors[errors.len() - 1],
        }
    }
}

/// Side-by-side error statistics of the two navigation solutions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComparisonStatistics {
    pub ins_only: ErrorStatistics,
    pub kalman: ErrorStatistics,
}

impl Display for ComparisonStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Mean error [m]", self.ins_only.mean, self.kalman.mean),
            ("RMS error [m]", self.ins_only.rms, self.kalman.rms),
            ("Max error [m]", self.ins_only.max_abs, self.kalman.max_abs),
            (
                "Final error [m]",
                self.ins_only.final_error,
                self.kalman.final_error,
            ),
        ];
        writeln!(f, "{:<30} {:>12} {:>12}", "Metric", "INS only", "Kalman")?;
        writeln!(f, "{}", "-".repeat(56))?;
        for (name, ins, kalman) in rows {
            writeln!(f, "{:<30} {:>12.3} {:>12.3}", name, ins, kalman)?;
        }
        Ok(())
    }
}

/// Run one INS-only versus INS/GPS Kalman experiment.
///
/// Ground truth is propagated with the true acceleration. The accelerometer sample of each
/// step feeds both the INS-only integration and the filter's prediction, so the two
/// solutions see the same noise realization. A GPS fix of the true position is drawn and
/// applied on every step the GPS is due (step 0 holds the initial state and is never
/// updated).
///
/// # Errors
/// `ConfigurationError` before the loop starts, or `NumericDegeneracy` from a filter update,
/// which aborts the run.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationResult> {
    let Components {
        motion,
        accelerometer,
        gps,
        mut filter,
    } = Components::build(config)?;
    let mut noise = NoiseGenerator::new(config.seed);
    let n_steps = config.num_steps();
    info!(
        "Running {} steps (dt = {} s, {} s) with seed {}",
        n_steps, config.dt, config.total_time, config.seed
    );
    debug!("{}", accelerometer);
    debug!("{}", gps);

    let mut truth = config.initial_state;
    let mut ins = config.initial_state;
    let mut records = Vec::with_capacity(n_steps + 1);
    records.push(StepRecord::new(0.0, &truth, &ins, &filter, None));

    for k in 1..=n_steps {
        let true_acceleration = config.profile.acceleration_at((k - 1) as f64 * config.dt);
        truth = motion.propagate(&truth, true_acceleration);

        let measured_acceleration = accelerometer.measure(true_acceleration, &mut noise);
        let gps_fix = if gps.is_due(k) {
            Some(gps.measure(truth.position, &mut noise))
        } else {
            None
        };

        ins = motion.propagate(&ins, measured_acceleration);

        filter.predict(measured_acceleration);
        if let Some(z) = gps_fix {
            if let Err(e) = filter.update(z) {
                warn!("GPS update failed at step {}: {}", k, e);
                return Err(e);
            }
            debug!("step {}: GPS fix {:.3} m -> {}", k, z, filter);
        }

        let time = k as f64 * config.dt;
        records.push(StepRecord::new(time, &truth, &ins, &filter, gps_fix));
    }

    let result = SimulationResult { records };
    let (ins_error, kalman_error) = result.final_errors();
    info!(
        "Finished: {} GPS fixes, final INS-only error {:.3} m, final Kalman error {:.3} m",
        result.gps_fix_count(),
        ins_error,
        kalman_error
    );
    Ok(result)
}
