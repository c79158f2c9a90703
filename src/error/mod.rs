// Error types for the dichoptic psychophysics core
//
// This module defines custom error types for configuration, calibration and
// storage operations, providing structured error handling with numeric codes
// that end up in session logs and CLI output.

mod calibration;
mod config;
mod storage;

use std::fmt;

pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use storage::{log_storage_error, StorageError, StorageErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the session, storage and CLI layers.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Any fatal condition raised while running an experiment session
///
/// Session-level operations touch configuration, calibration integrity and
/// persistence at once; this enum unifies the three so callers can use `?`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExperimentError {
    Config(ConfigError),
    Calibration(CalibrationError),
    Storage(StorageError),
}

impl ErrorCode for ExperimentError {
    fn code(&self) -> i32 {
        match self {
            ExperimentError::Config(err) => err.code(),
            ExperimentError::Calibration(err) => err.code(),
            ExperimentError::Storage(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            ExperimentError::Config(err) => err.message(),
            ExperimentError::Calibration(err) => err.message(),
            ExperimentError::Storage(err) => err.message(),
        }
    }
}

impl fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentError::Config(err) => err.fmt(f),
            ExperimentError::Calibration(err) => err.fmt(f),
            ExperimentError::Storage(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ExperimentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExperimentError::Config(err) => Some(err),
            ExperimentError::Calibration(err) => Some(err),
            ExperimentError::Storage(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ExperimentError {
    fn from(err: ConfigError) -> Self {
        ExperimentError::Config(err)
    }
}

impl From<CalibrationError> for ExperimentError {
    fn from(err: CalibrationError) -> Self {
        ExperimentError::Calibration(err)
    }
}

impl From<StorageError> for ExperimentError {
    fn from(err: StorageError) -> Self {
        ExperimentError::Storage(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_error_delegates_code_and_message() {
        let err: ExperimentError = ConfigError::RefreshRateNotMultipleOf30 { refresh_rate: 50 }.into();
        assert_eq!(err.code(), ConfigErrorCodes::REFRESH_RATE);
        assert!(err.message().contains("50"));

        let err: ExperimentError = CalibrationError::RawBetaExceedsOne { level: 3, beta: 1.2 }.into();
        assert_eq!(err.code(), CalibrationErrorCodes::RAW_BETA_EXCEEDS_ONE);
    }

    #[test]
    fn test_experiment_error_exposes_source() {
        use std::error::Error;

        let err: ExperimentError = StorageError::NotFound {
            path: "missing.json".to_string(),
        }
        .into();
        assert!(err.source().is_some());
        assert!(format!("{}", err).contains("missing.json"));
    }
}
