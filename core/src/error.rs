//! Error types for the navigation core.
//!
//! Configuration problems are raised eagerly when a component is constructed. Numeric
//! problems are raised at the point of failure and never leave a component in a
//! half-updated state.

use std::io;

use thiserror::Error;

/// Errors raised by the simulation core and its I/O helpers.
#[derive(Error, Debug)]
pub enum FusionError {
    /// A configuration value is out of range (non-positive time step, negative noise
    /// standard deviation, malformed covariance, ...).
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The innovation covariance of a measurement update is not strictly positive.
    #[error("Numeric degeneracy: innovation covariance S = {innovation_covariance} is not invertible")]
    NumericDegeneracy { innovation_covariance: f64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FusionError {
    /// Shorthand for building a [`FusionError::ConfigurationError`].
    pub fn config<S: Into<String>>(msg: S) -> Self {
        FusionError::ConfigurationError(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FusionError>;

/// Reject a standard deviation that is negative or not finite.
pub(crate) fn check_std(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FusionError::config(format!(
            "{} must be a finite, non-negative standard deviation, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Reject a time step that is not strictly positive and finite.
pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FusionError::config(format!(
            "{} must be finite and strictly positive, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_checks() {
        assert!(check_std("noise", 0.0).is_ok());
        assert!(check_std("noise", 1.5).is_ok());
        assert!(check_std("noise", -0.1).is_err());
        assert!(check_std("noise", f64::NAN).is_err());
    }

    #[test]
    fn positive_checks() {
        assert!(check_positive("dt", 0.1).is_ok());
        assert!(check_positive("dt", 0.0).is_err());
        assert!(check_positive("dt", -1.0).is_err());
        assert!(check_positive("dt", f64::INFINITY).is_err());
    }

    #[test]
    fn messages_name_the_field() {
        let err = check_std("gps_noise_std", -2.0).unwrap_err();
        assert!(err.to_string().contains("gps_noise_std"));
        let err = FusionError::NumericDegeneracy {
            innovation_covariance: 0.0,
        };
        assert!(err.to_string().contains("S = 0"));
    }
}
