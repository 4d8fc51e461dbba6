//! Linear Kalman filter for one-dimensional INS/GPS fusion
//!
//! The filter estimates $x = [p, v]^T$. The measured acceleration drives the prediction
//! (the INS mechanization) and GPS position fixes drive the correction.
//!
//! Prediction, run on every base step:
//!
//! $$
//! \hat{x}^- = F \hat{x} + B a, \qquad P^- = F P F^T + Q
//! $$
//!
//! Correction, run only when a fix is available:
//!
//! $$
//! y = z - H \hat{x}^-, \quad S = H P^- H^T + R, \quad K = P^- H^T S^{-1}
//! $$
//! $$
//! \hat{x} = \hat{x}^- + K y, \qquad P = (I - K H) P^-
//! $$
//!
//! With $H = [1, 0]$ and scalar $R$, $S$ is the scalar $P^-_{00} + R$ and its inverse is a
//! reciprocal, so no general matrix inversion is involved anywhere in the recursion.

use std::fmt::{self, Debug, Display};

use log::trace;
use nalgebra::{Matrix2, RowVector2, Vector2};

use crate::State1D;
use crate::error::{FusionError, Result, check_positive, check_std};
use crate::linalg::{
    control_matrix, is_positive_semi_definite, observation_matrix, process_noise, symmetrize,
    transition_matrix,
};

/// Tolerance used when validating the initial covariance.
const COVARIANCE_TOLERANCE: f64 = 1e-12;

/// Construction parameters for [`KalmanFilter1D`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KalmanConfig {
    /// Prediction time step in seconds.
    pub dt: f64,
    /// Assumed acceleration noise standard deviation used to build Q (m/s²).
    pub process_noise_std: f64,
    /// Assumed GPS noise standard deviation used to build R (m).
    pub measurement_noise_std: f64,
    /// Initial position/velocity guess.
    pub initial_state: State1D,
    /// Initial estimation error covariance.
    pub initial_covariance: Matrix2<f64>,
}

impl KalmanConfig {
    /// Configuration with a diagonal initial covariance `diag(position_variance, velocity_variance)`.
    pub fn diagonal(
        dt: f64,
        process_noise_std: f64,
        measurement_noise_std: f64,
        initial_state: State1D,
        position_variance: f64,
        velocity_variance: f64,
    ) -> Self {
        KalmanConfig {
            dt,
            process_noise_std,
            measurement_noise_std,
            initial_state,
            initial_covariance: Matrix2::new(position_variance, 0.0, 0.0, velocity_variance),
        }
    }
}

/// Discrete-time linear Kalman filter over `[position, velocity]`.
///
/// Each cycle is predict-then-optionally-update. Calling [`update`](Self::update) twice
/// without an intervening [`predict`](Self::predict) re-corrects the already corrected
/// estimate with the same prior information; it is permitted, but avoiding it is the
/// caller's job.
#[derive(Clone)]
pub struct KalmanFilter1D {
    dt: f64,
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    transition: Matrix2<f64>,
    control: Vector2<f64>,
    observation: RowVector2<f64>,
    process_noise: Matrix2<f64>,
    measurement_noise: f64,
    last_gain: Option<Vector2<f64>>,
    update_count: usize,
}

impl KalmanFilter1D {
    /// # Errors
    /// `ConfigurationError` for a non-positive `dt`, negative noise standard deviations, or
    /// an initial covariance that is not finite, symmetric and positive semi-definite.
    pub fn new(config: KalmanConfig) -> Result<Self> {
        check_positive("filter dt", config.dt)?;
        check_std("process_noise_std", config.process_noise_std)?;
        check_std("measurement_noise_std", config.measurement_noise_std)?;
        if !config.initial_state.position.is_finite() || !config.initial_state.velocity.is_finite()
        {
            return Err(FusionError::config(format!(
                "initial state must be finite, got {}",
                config.initial_state
            )));
        }
        if !is_positive_semi_definite(&config.initial_covariance, COVARIANCE_TOLERANCE) {
            return Err(FusionError::config(format!(
                "initial covariance must be symmetric positive semi-definite, got {:?}",
                config.initial_covariance.as_slice()
            )));
        }
        Ok(KalmanFilter1D {
            dt: config.dt,
            state: config.initial_state.to_vector(),
            covariance: config.initial_covariance,
            transition: transition_matrix(config.dt),
            control: control_matrix(config.dt),
            observation: observation_matrix(),
            process_noise: process_noise(config.dt, config.process_noise_std),
            measurement_noise: config.measurement_noise_std.powi(2),
            last_gain: None,
            update_count: 0,
        })
    }

    /// Prediction step: `x⁻ = F·x + B·a`, `P⁻ = F·P·Fᵀ + Q`.
    ///
    /// Must be called once per time step whether or not a measurement follows.
    pub fn predict(&mut self, acceleration: f64) {
        self.state = self.transition * self.state + self.control * acceleration;
        let p = self.transition * self.covariance * self.transition.transpose() + self.process_noise;
        self.covariance = symmetrize(&p);
    }

    /// Correction step with a position measurement. Returns the Kalman gain used.
    ///
    /// # Errors
    /// `NumericDegeneracy` when the innovation covariance `S = H·P⁻·Hᵀ + R` is not strictly
    /// positive and finite. The filter is left exactly as it was after the prediction, so the
    /// caller may skip the update and carry on with the predicted estimate.
    pub fn update(&mut self, measurement: f64) -> Result<Vector2<f64>> {
        let innovation = measurement - (self.observation * self.state)[0];
        let p_ht = self.covariance * self.observation.transpose();
        let s = (self.observation * p_ht)[0] + self.measurement_noise;
        if !s.is_finite() || s <= 0.0 {
            return Err(FusionError::NumericDegeneracy {
                innovation_covariance: s,
            });
        }
        let gain = p_ht * s.recip();
        self.state += gain * innovation;
        let i_kh = Matrix2::identity() - gain * self.observation;
        self.covariance = symmetrize(&(i_kh * self.covariance));
        self.last_gain = Some(gain);
        self.update_count += 1;
        trace!(
            "KF update #{}: innovation {:.4}, S {:.4}, gain [{:.4}, {:.4}]",
            self.update_count, innovation, s, gain[0], gain[1]
        );
        Ok(gain)
    }

    /// One full cycle: predict with `acceleration`, then update if a fix is available.
    pub fn step(&mut self, acceleration: f64, measurement: Option<f64>) -> Result<()> {
        self.predict(acceleration);
        if let Some(z) = measurement {
            self.update(z)?;
        }
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
    pub fn state(&self) -> State1D {
        State1D::from_vector(&self.state)
    }
    pub fn covariance(&self) -> &Matrix2<f64> {
        &self.covariance
    }
    /// Current (position, velocity) estimate.
    pub fn estimate(&self) -> (f64, f64) {
        (self.state[0], self.state[1])
    }
    /// One-sigma (position, velocity) uncertainty.
    pub fn uncertainty(&self) -> (f64, f64) {
        (
            self.covariance[(0, 0)].max(0.0).sqrt(),
            self.covariance[(1, 1)].max(0.0).sqrt(),
        )
    }
    pub fn transition_matrix(&self) -> &Matrix2<f64> {
        &self.transition
    }
    pub fn control_matrix(&self) -> &Vector2<f64> {
        &self.control
    }
    pub fn observation_matrix(&self) -> &RowVector2<f64> {
        &self.observation
    }
    pub fn process_noise(&self) -> &Matrix2<f64> {
        &self.process_noise
    }
    /// Measurement noise variance R (the 1×1 matrix as a scalar).
    pub fn measurement_noise(&self) -> f64 {
        self.measurement_noise
    }
    /// Gain from the most recent successful update.
    pub fn last_gain(&self) -> Option<Vector2<f64>> {
        self.last_gain
    }
    /// Number of successful updates so far.
    pub fn update_count(&self) -> usize {
        self.update_count
    }
}

impl Debug for KalmanFilter1D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KF1D")
            .field("state", &self.state)
            .field("covariance", &self.covariance)
            .field("process_noise", &self.process_noise)
            .field("measurement_noise", &self.measurement_noise)
            .field("dt", &self.dt)
            .finish()
    }
}

impl Display for KalmanFilter1D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (pos, vel) = self.estimate();
        let (sig_pos, sig_vel) = self.uncertainty();
        write!(
            f,
            "KalmanFilter1D(position: {:.2} ± {:.2} m, velocity: {:.2} ± {:.2} m/s, dt: {:.3} s)",
            pos, sig_pos, vel, sig_vel, self.dt
        )
    }
}
