// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2003
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Sweep did not capture one beta per contrast level
    pub const INSUFFICIENT_SAMPLES: i32 = 2001;

    /// A raw beta captured by the calibrator exceeds 1.0
    pub const RAW_BETA_EXCEEDS_ONE: i32 = 2002;

    /// The fitted polynomial yields a beta above 1.0 at a sampled alpha
    pub const FITTED_BETA_EXCEEDS_ONE: i32 = 2003;
}

/// Log a calibration error with structured context
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationSession, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-integrity errors
///
/// Any of these blocks persisting the calibration and forces a new sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Insufficient level samples collected in a sweep
    InsufficientSamples { required: usize, collected: usize },

    /// Raw beta above 1.0 for a contrast level
    RawBetaExceedsOne { level: usize, beta: f64 },

    /// Fitted beta above 1.0 at a sampled alpha
    FittedBetaExceedsOne { alpha: f64, beta: f64 },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::InsufficientSamples { .. } => {
                CalibrationErrorCodes::INSUFFICIENT_SAMPLES
            }
            CalibrationError::RawBetaExceedsOne { .. } => {
                CalibrationErrorCodes::RAW_BETA_EXCEEDS_ONE
            }
            CalibrationError::FittedBetaExceedsOne { .. } => {
                CalibrationErrorCodes::FITTED_BETA_EXCEEDS_ONE
            }
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::InsufficientSamples {
                required,
                collected,
            } => {
                format!("Insufficient samples: need {}, got {}", required, collected)
            }
            CalibrationError::RawBetaExceedsOne { level, beta } => format!(
                "Betas cannot exceed 1 (level {} calibrated to {:.4}). Recalibration is required.",
                level, beta
            ),
            CalibrationError::FittedBetaExceedsOne { alpha, beta } => format!(
                "Fitted betas cannot exceed 1 (alpha {:.4} maps to {:.4}). Recalibration is required.",
                alpha, beta
            ),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::InsufficientSamples {
                required: 5,
                collected: 3
            }
            .code(),
            CalibrationErrorCodes::INSUFFICIENT_SAMPLES
        );
        assert_eq!(
            CalibrationError::RawBetaExceedsOne {
                level: 2,
                beta: 1.05
            }
            .code(),
            CalibrationErrorCodes::RAW_BETA_EXCEEDS_ONE
        );
        assert_eq!(
            CalibrationError::FittedBetaExceedsOne {
                alpha: 0.4,
                beta: 1.01
            }
            .code(),
            CalibrationErrorCodes::FITTED_BETA_EXCEEDS_ONE
        );
    }

    #[test]
    fn test_calibration_error_messages() {
        let err = CalibrationError::InsufficientSamples {
            required: 5,
            collected: 3,
        };
        assert_eq!(err.message(), "Insufficient samples: need 5, got 3");

        let err = CalibrationError::RawBetaExceedsOne {
            level: 4,
            beta: 1.25,
        };
        assert!(err.message().contains("level 4"));
        assert!(err.message().contains("Recalibration is required"));
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::RawBetaExceedsOne {
            level: 0,
            beta: 1.5,
        };
        let display = format!("{}", err);
        assert!(display.contains("CalibrationError"));
        assert!(display.contains(&err.code().to_string()));
    }
}
