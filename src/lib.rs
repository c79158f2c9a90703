// Dichoptic Psychophysics Core - calibration, staircases and trial machine
// Frame-locked experiment logic for dichoptic contrast studies

// Module declarations
pub mod calibration;
pub mod config;
pub mod display;
pub mod error;
pub mod session;
pub mod staircase;
pub mod stimulus;
pub mod storage;
pub mod telemetry;
pub mod testing;
pub mod trial;

// Re-exports for convenience
pub use calibration::{CalibrationSession, CalibrationTarget, GainFunctions, Polynomial};
pub use config::ExperimentConfig;
pub use display::{InputSource, Renderer};
pub use error::{CalibrationError, ConfigError, ErrorCode, ExperimentError, StorageError};
pub use session::ExperimentSession;
pub use staircase::{StaircaseEngine, StaircaseReport, StaircaseSettings};
pub use storage::{Participant, ParticipantStore};
pub use trial::{run_trial, TrialContext, TrialKind, TrialRecord};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_builds_staircase_engine() {
        let config = ExperimentConfig::default();
        let settings = StaircaseSettings::from_config(&config.staircase, &config.contrast);
        assert!(StaircaseEngine::new(settings).is_ok());
    }
}
