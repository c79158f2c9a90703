// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3010
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Configuration file could not be read
    pub const IO: i32 = 3001;

    /// Configuration JSON could not be parsed
    pub const PARSE: i32 = 3002;

    /// Calibration display is neither `checkerboard` nor `single_square`
    pub const UNKNOWN_CALIBRATION_DISPLAY: i32 = 3003;

    /// Calibration target is neither `DCF_colors` nor `background`
    pub const UNKNOWN_CALIBRATION_TARGET: i32 = 3004;

    /// Refresh rate is not a multiple of 30 Hz
    pub const REFRESH_RATE: i32 = 3005;

    /// Per-trial parameter list does not match the trial count
    pub const LENGTH_MISMATCH: i32 = 3006;

    /// Trial requires a termination key but none was configured
    pub const MISSING_TERMINATION_KEY: i32 = 3007;

    /// Response buttons/labels are not a valid two-choice mapping
    pub const INVALID_RESPONSE_MAPPING: i32 = 3008;

    /// Polynomial fit received unusable samples
    pub const INVALID_FIT_INPUT: i32 = 3009;

    /// Numeric or textual parameter outside its accepted domain
    pub const INVALID_PARAMETER: i32 = 3010;
}

/// Log a configuration error with structured context
///
/// Configuration errors are fatal and raised before any stimulus is shown,
/// so this is typically the last line a session writes before aborting.
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=ExperimentConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors
///
/// Raised fail-fast while loading parameters or constructing a calibrator,
/// trial or staircase from them.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Configuration file could not be read
    Io { path: String, reason: String },

    /// Configuration JSON could not be parsed
    Parse { path: String, reason: String },

    /// Unsupported calibration display type
    UnknownCalibrationDisplay { value: String },

    /// Unsupported calibration target
    UnknownCalibrationTarget { value: String },

    /// Refresh rate must be an integer multiple of 30 Hz
    RefreshRateNotMultipleOf30 { refresh_rate: u32 },

    /// List length does not match the number of trials or samples
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// No termination key configured where one is required
    MissingTerminationKey { trial_id: String },

    /// Response buttons/labels are malformed
    InvalidResponseMapping { reason: String },

    /// Polynomial fit input is unusable
    InvalidFitInput { reason: String },

    /// Parameter outside its accepted domain
    InvalidParameter { parameter: String, value: String },
}

impl ConfigError {
    pub(crate) fn invalid_parameter(parameter: &str, value: impl fmt::Display) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
            ConfigError::UnknownCalibrationDisplay { .. } => {
                ConfigErrorCodes::UNKNOWN_CALIBRATION_DISPLAY
            }
            ConfigError::UnknownCalibrationTarget { .. } => {
                ConfigErrorCodes::UNKNOWN_CALIBRATION_TARGET
            }
            ConfigError::RefreshRateNotMultipleOf30 { .. } => ConfigErrorCodes::REFRESH_RATE,
            ConfigError::LengthMismatch { .. } => ConfigErrorCodes::LENGTH_MISMATCH,
            ConfigError::MissingTerminationKey { .. } => ConfigErrorCodes::MISSING_TERMINATION_KEY,
            ConfigError::InvalidResponseMapping { .. } => {
                ConfigErrorCodes::INVALID_RESPONSE_MAPPING
            }
            ConfigError::InvalidFitInput { .. } => ConfigErrorCodes::INVALID_FIT_INPUT,
            ConfigError::InvalidParameter { .. } => ConfigErrorCodes::INVALID_PARAMETER,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::Io { path, reason } => {
                format!("Failed to read config {}: {}", path, reason)
            }
            ConfigError::Parse { path, reason } => {
                format!("Failed to parse config {}: {}", path, reason)
            }
            ConfigError::UnknownCalibrationDisplay { value } => format!(
                "Calibration is defined only for 'checkerboard' or 'single_square' types (got '{}')",
                value
            ),
            ConfigError::UnknownCalibrationTarget { value } => format!(
                "Calibration target must be 'DCF_colors' or 'background' (got '{}')",
                value
            ),
            ConfigError::RefreshRateNotMultipleOf30 { refresh_rate } => format!(
                "Refresh rate of the screen should be a multiple of 30 (got {} Hz)",
                refresh_rate
            ),
            ConfigError::LengthMismatch {
                field,
                expected,
                actual,
            } => format!(
                "The length of {} ({}) is not the same as the number of trials ({})",
                field, actual, expected
            ),
            ConfigError::MissingTerminationKey { trial_id } => {
                format!("Trial {} requires a termination key", trial_id)
            }
            ConfigError::InvalidResponseMapping { reason } => {
                format!("Invalid response mapping: {}", reason)
            }
            ConfigError::InvalidFitInput { reason } => {
                format!("Invalid polynomial fit input: {}", reason)
            }
            ConfigError::InvalidParameter { parameter, value } => {
                format!("Invalid parameter: {} = {}", parameter, value)
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_codes() {
        assert_eq!(
            ConfigError::RefreshRateNotMultipleOf30 { refresh_rate: 75 }.code(),
            ConfigErrorCodes::REFRESH_RATE
        );
        assert_eq!(
            ConfigError::UnknownCalibrationDisplay {
                value: "stripes".to_string()
            }
            .code(),
            ConfigErrorCodes::UNKNOWN_CALIBRATION_DISPLAY
        );
        assert_eq!(
            ConfigError::LengthMismatch {
                field: "color_modes".to_string(),
                expected: 3,
                actual: 2
            }
            .code(),
            ConfigErrorCodes::LENGTH_MISMATCH
        );
        assert_eq!(
            ConfigError::MissingTerminationKey {
                trial_id: "adj_0".to_string()
            }
            .code(),
            ConfigErrorCodes::MISSING_TERMINATION_KEY
        );
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::LengthMismatch {
            field: "contrast levels".to_string(),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.message(),
            "The length of contrast levels (2) is not the same as the number of trials (3)"
        );

        let err = ConfigError::invalid_parameter("n_reversals", 0);
        assert_eq!(err.message(), "Invalid parameter: n_reversals = 0");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::RefreshRateNotMultipleOf30 { refresh_rate: 144 };
        let display = format!("{}", err);
        assert!(display.contains("ConfigError"));
        assert!(display.contains("3005"));
        assert!(display.contains("144"));
    }
}
