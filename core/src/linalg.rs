//! Fixed-size linear algebra for the two-state position/velocity system.
//!
//! Every matrix here is built from closed-form expressions in the time step rather than
//! through generic decompositions. The system is small enough that the analytic forms are
//! both exact and easier to audit against the textbook equations.

use nalgebra::{Matrix2, RowVector2, Vector2};

/// State transition matrix for constant-acceleration kinematics
///
/// $$
/// F = \begin{bmatrix} 1 & \Delta t \\\\ 0 & 1 \end{bmatrix}
/// $$
#[inline]
pub fn transition_matrix(dt: f64) -> Matrix2<f64> {
    Matrix2::new(1.0, dt, 0.0, 1.0)
}

/// Control (input) matrix mapping an acceleration onto the state
///
/// $$
/// B = \begin{bmatrix} \Delta t^2 / 2 \\\\ \Delta t \end{bmatrix}
/// $$
#[inline]
pub fn control_matrix(dt: f64) -> Vector2<f64> {
    Vector2::new(0.5 * dt * dt, dt)
}

/// Observation matrix: the measurement sees position only.
#[inline]
pub fn observation_matrix() -> RowVector2<f64> {
    RowVector2::new(1.0, 0.0)
}

/// Process noise covariance driven by white acceleration noise.
///
/// $$
/// Q = \sigma_a^2 B B^T = \sigma_a^2 \begin{bmatrix} \Delta t^4/4 & \Delta t^3/2 \\\\ \Delta t^3/2 & \Delta t^2 \end{bmatrix}
/// $$
///
/// # Arguments
/// * `dt` - time step in seconds
/// * `acceleration_noise_std` - assumed standard deviation of the acceleration noise (m/s²)
pub fn process_noise(dt: f64, acceleration_noise_std: f64) -> Matrix2<f64> {
    let b = control_matrix(dt);
    acceleration_noise_std.powi(2) * (b * b.transpose())
}

/// Symmetrize a matrix: P ← 0.5 (P + Pᵀ)
///
/// Removes the round-off asymmetry that accumulates in repeated covariance products.
#[inline]
pub fn symmetrize(m: &Matrix2<f64>) -> Matrix2<f64> {
    0.5 * (m + m.transpose())
}

/// Check that a 2×2 matrix is symmetric and positive semi-definite within `tol`.
///
/// For a symmetric 2×2 matrix this is equivalent to both diagonal entries and the
/// determinant being non-negative.
pub fn is_positive_semi_definite(m: &Matrix2<f64>, tol: f64) -> bool {
    if m.iter().any(|v| !v.is_finite()) {
        return false;
    }
    let scale = m.amax().max(1.0);
    let symmetric = (m[(0, 1)] - m[(1, 0)]).abs() <= tol * scale;
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    symmetric && m[(0, 0)] >= -tol && m[(1, 1)] >= -tol && det >= -tol * scale * scale
}
