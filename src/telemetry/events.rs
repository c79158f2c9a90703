//! Telemetry event types published while a session runs.

use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationTarget;
use crate::staircase::SequenceName;

/// Progress events covering calibration, staircase and trial completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ExperimentEvent {
    CalibrationRound {
        target: CalibrationTarget,
        level: usize,
        alpha: f64,
        beta: f64,
        timestamp_ms: u64,
    },
    CalibrationJudgement {
        target: CalibrationTarget,
        sweep: usize,
        approved: bool,
        timestamp_ms: u64,
    },
    StaircaseStep {
        sequence: SequenceName,
        alpha: f64,
        detected: bool,
        next_alpha: f64,
        timestamp_ms: u64,
    },
    StaircaseConverged {
        threshold: f64,
        steps: usize,
        timestamp_ms: u64,
    },
    TrialCompleted {
        block: String,
        trial_id: String,
        terminated_by: String,
        timestamp_ms: u64,
    },
}
