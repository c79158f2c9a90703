//! Adaptive threshold estimation with two interleaved staircases.
//!
//! The engine is pure state: it never draws or polls. Callers present the
//! picked contrast however they like and feed back a yes/no answer, either one
//! step at a time (`next_trial` / `record_response`) or through
//! `run_until_converged`.

pub mod engine;
pub mod sequence;

pub use engine::{
    StaircaseEngine, StaircasePick, StaircaseReport, StaircaseSettings, StaircaseStep,
};
pub use sequence::{count_reversals, mean_of_last, SequenceName, StaircaseSequence, ESTIMATE_WINDOW};
