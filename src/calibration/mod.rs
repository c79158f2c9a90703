// Calibration module - luminance calibration and gain polynomials
//
// This module provides the pieces of the flicker-photometry calibration:
// 1. Calibrator: one 15 Hz flicker round returning a raw gain
// 2. CalibrationSession: shuffled sweep over contrast levels, fit and approval
// 3. Polynomial: least-squares gain function persisted per participant
//
// The calibration workflow:
// 1. Create CalibrationSession for a target (DCF_colors or background)
// 2. Run one Calibrator round per contrast level
// 3. Fit, show for approval, repeat on rejection
// 4. Check integrity and persist through the participant store

pub mod approval;
pub mod calibrator;
pub mod polynomial;
pub mod session;

pub use approval::{request_approval, FitReview, Judgement};
pub use calibrator::{CalibrationDisplay, Calibrator, CalibratorKeys, CalibratorSettings};
pub use polynomial::{GainFunctions, Polynomial, DEFAULT_DEGREE};
pub use session::{verify_betas, CalibrationSession, CalibrationTarget, MIN_LEVELS};
