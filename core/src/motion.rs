//! Deterministic one-dimensional motion model
//!
//! Discretized constant-acceleration kinematics. Over a step of length $\Delta t$ with
//! acceleration $a$ held constant:
//!
//! $$
//! x_{k+1} = x_k + v_k \Delta t + \tfrac{1}{2} a_k \Delta t^2, \qquad v_{k+1} = v_k + a_k \Delta t
//! $$
//!
//! which is the matrix form $x_{k+1} = F x_k + B a_k$. The model is used for the ground
//! truth trajectory and for the uncorrected INS-only integration.

use nalgebra::{Matrix2, Vector2};

use crate::State1D;
use crate::error::{FusionError, Result};
use crate::linalg::{control_matrix, transition_matrix};

/// Propagate a state over `dt` seconds under constant `acceleration`.
///
/// Pure kinematics; `dt` is assumed non-negative (validated by [`MotionModel::new`]).
pub fn propagate(state: &State1D, acceleration: f64, dt: f64) -> State1D {
    State1D {
        position: state.position + state.velocity * dt + 0.5 * acceleration * dt * dt,
        velocity: state.velocity + acceleration * dt,
    }
}

/// Motion model for a fixed time step with cached transition and control matrices.
#[derive(Clone, Debug)]
pub struct MotionModel {
    dt: f64,
    transition: Matrix2<f64>,
    control: Vector2<f64>,
}

impl MotionModel {
    /// Build a model for time step `dt`.
    ///
    /// # Errors
    /// `ConfigurationError` if `dt` is negative or not finite. A zero step is accepted and
    /// leaves every state unchanged.
    pub fn new(dt: f64) -> Result<Self> {
        Self::check_dt(dt)?;
        Ok(MotionModel {
            dt,
            transition: transition_matrix(dt),
            control: control_matrix(dt),
        })
    }

    fn check_dt(dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            return Err(FusionError::config(format!(
                "time step must be finite and non-negative, got {}",
                dt
            )));
        }
        Ok(())
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Change the time step, recomputing the cached matrices.
    pub fn set_dt(&mut self, dt: f64) -> Result<()> {
        Self::check_dt(dt)?;
        if dt != self.dt {
            self.dt = dt;
            self.transition = transition_matrix(dt);
            self.control = control_matrix(dt);
        }
        Ok(())
    }

    /// State transition matrix F = [[1, dt], [0, 1]]
    pub fn transition_matrix(&self) -> &Matrix2<f64> {
        &self.transition
    }

    /// Control matrix B = [dt²/2, dt]ᵀ
    pub fn control_matrix(&self) -> &Vector2<f64> {
        &self.control
    }

    /// Advance `state` by one step under `acceleration`.
    pub fn propagate(&self, state: &State1D, acceleration: f64) -> State1D {
        propagate(state, acceleration, self.dt)
    }

    /// Integrate a full acceleration history starting from `initial`.
    ///
    /// The returned trajectory has `accelerations.len() + 1` samples; index 0 is the
    /// initial state and sample `k + 1` is the state after applying `accelerations[k]`.
    pub fn simulate_trajectory(&self, initial: &State1D, accelerations: &[f64]) -> Trajectory {
        let n = accelerations.len() + 1;
        let mut trajectory = Trajectory {
            times: Vec::with_capacity(n),
            positions: Vec::with_capacity(n),
            velocities: Vec::with_capacity(n),
        };
        let mut state = *initial;
        trajectory.push(0.0, &state);
        for (k, acceleration) in accelerations.iter().enumerate() {
            state = self.propagate(&state, *acceleration);
            trajectory.push((k + 1) as f64 * self.dt, &state);
        }
        trajectory
    }
}

/// Time history of a propagated state.
#[derive(Clone, Debug, Default)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub positions: Vec<f64>,
    pub velocities: Vec<f64>,
}

impl Trajectory {
    fn push(&mut self, time: f64, state: &State1D) {
        self.times.push(time);
        self.positions.push(state.position);
        self.velocities.push(state.velocity);
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Final state of the trajectory, if any.
    pub fn last(&self) -> Option<State1D> {
        Some(State1D::new(
            *self.positions.last()?,
            *self.velocities.last()?,
        ))
    }
}
