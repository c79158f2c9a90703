//! Integration tests for the calibration workflow
//!
//! These tests drive a whole `ExperimentSession` through scripted key presses:
//! - Sweep, fit and approval of a calibration target
//! - Persistence and reload of the approved polynomial
//! - Integrity rejection of betas above 1.0
//! - Repeated sweeps after the experimenter rejects a fit

use dichoptic_psychophysics::calibration::{CalibrationSession, CalibrationTarget};
use dichoptic_psychophysics::config::ExperimentConfig;
use dichoptic_psychophysics::error::{CalibrationError, ExperimentError};
use dichoptic_psychophysics::session::ExperimentSession;
use dichoptic_psychophysics::storage::ParticipantStore;
use dichoptic_psychophysics::testing::{RecordingRenderer, ScriptedInput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.calibration.inter_round_frames = 1;
    config
}

/// `steps` presses of `key` and a terminate press for every level, then `decision`
fn sweep_script(n_levels: usize, key: &str, steps: usize, decision: &str) -> Vec<Vec<String>> {
    let mut polls = Vec::new();
    for _ in 0..n_levels {
        for _ in 0..steps {
            polls.push(vec![key.to_string()]);
        }
        polls.push(vec!["space".to_string()]);
    }
    polls.push(vec![decision.to_string()]);
    polls
}

fn session(
    temp: &TempDir,
    polls: Vec<Vec<String>>,
) -> ExperimentSession<RecordingRenderer, ScriptedInput> {
    let store = ParticipantStore::create(temp.path(), "p01").expect("participant dir");
    let renderer = RecordingRenderer::new().keep_frames(false);
    ExperimentSession::new(config(), store, renderer, ScriptedInput::new(polls), 5)
        .expect("valid config")
}

/// Approved calibration is persisted and reloads bit-for-bit
///
/// Test steps:
/// 1. Run a three-level DCF calibration where every round lowers beta twice
/// 2. Approve the fit and save it
/// 3. Open a fresh session on the same participant and load it back
#[test]
fn test_approved_calibration_round_trips_through_store() {
    let temp = TempDir::new().unwrap();
    let mut first = session(&temp, sweep_script(3, "down", 2, "a"));

    let polynomial = first
        .run_color_contrast_calibration(CalibrationTarget::DcfColors, 3, true)
        .expect("calibration approved and saved");
    assert_eq!(first.gains().beta, polynomial);

    let raw = first
        .store()
        .load_calibration_table(CalibrationTarget::DcfColors)
        .unwrap();
    assert_eq!(raw.len(), 3);
    for beta in raw.values() {
        assert!((beta - 0.88).abs() < 1e-9);
    }

    let mut second = session(&temp, Vec::new());
    let loaded = second
        .load_calibration(CalibrationTarget::DcfColors)
        .expect("saved calibration loads");
    assert_eq!(loaded, polynomial);
    assert_eq!(second.gains().beta, polynomial);
}

/// Raw betas above 1.0 abort the save and leave no files behind
#[test]
fn test_beta_above_one_is_not_saved() {
    let temp = TempDir::new().unwrap();
    let mut session = session(&temp, sweep_script(3, "up", 11, "a"));

    let err = session
        .run_color_contrast_calibration(CalibrationTarget::Background, 3, true)
        .unwrap_err();

    assert!(matches!(
        err,
        ExperimentError::Calibration(CalibrationError::RawBetaExceedsOne { .. })
    ));
    let store = session.store();
    assert!(!store.calibration_path(CalibrationTarget::Background).exists());
    assert!(!store.polynomial_path(CalibrationTarget::Background).exists());
}

/// Without `save` the gain is installed but nothing is written
#[test]
fn test_unsaved_calibration_only_updates_gain() {
    let temp = TempDir::new().unwrap();
    let mut session = session(&temp, sweep_script(3, "down", 1, "a"));

    let polynomial = session
        .run_color_contrast_calibration(CalibrationTarget::Background, 3, false)
        .unwrap();

    assert_eq!(session.gains().kappa, polynomial);
    assert!(!session
        .store()
        .polynomial_path(CalibrationTarget::Background)
        .exists());
}

/// Betas above 1.0 are fatal even when nothing is saved
#[test]
fn test_unsaved_beta_above_one_keeps_previous_gain() {
    let temp = TempDir::new().unwrap();
    let mut session = session(&temp, sweep_script(3, "up", 11, "a"));
    let before = session.gains().kappa.clone();

    let err = session
        .run_color_contrast_calibration(CalibrationTarget::Background, 3, false)
        .unwrap_err();

    assert!(matches!(
        err,
        ExperimentError::Calibration(CalibrationError::RawBetaExceedsOne { .. })
    ));
    assert_eq!(session.gains().kappa, before);
}

/// A rejected fit triggers a full new sweep
#[test]
fn test_rejected_fit_repeats_sweep() {
    let mut polls = sweep_script(3, "down", 1, "r");
    polls.extend(sweep_script(3, "down", 3, "a"));
    let mut input = ScriptedInput::new(polls);
    let mut renderer = RecordingRenderer::new().keep_frames(false);
    let mut rng = StdRng::seed_from_u64(11);

    let mut calibration =
        CalibrationSession::new(&config(), CalibrationTarget::DcfColors, 3).unwrap();
    calibration.run(&mut renderer, &mut input, &mut rng).unwrap();

    assert_eq!(calibration.sweeps(), 2);
    assert!(calibration.is_calibration_approved());
    for beta in calibration.raw_betas().values() {
        assert!((beta - 0.87).abs() < 1e-9);
    }
    assert_eq!(input.remaining(), 0);
    assert!(calibration.check_integrity().is_ok());
}
