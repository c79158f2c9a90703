//! Integration tests for adaptive staircase blocks
//!
//! Covers the engine against a simulated observer and the full session block
//! where every trial is presented, answered and persisted.

use dichoptic_psychophysics::config::ExperimentConfig;
use dichoptic_psychophysics::session::ExperimentSession;
use dichoptic_psychophysics::staircase::{SequenceName, StaircaseEngine, StaircaseSettings};
use dichoptic_psychophysics::stimulus::ColorMode;
use dichoptic_psychophysics::storage::ParticipantStore;
use dichoptic_psychophysics::testing::{RecordingRenderer, ScriptedInput, SimulatedObserver};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

/// Short trials so a block of a few hundred trials stays fast
fn fast_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.trial.trial_duration_frames = 4;
    config.trial.no_stimulus_front_frames = 1;
    config.trial.no_stimulus_back_frames = 1;
    config.trial.stimulus_duration_frames = 1;
    config.trial.inter_trial_frames = 0;
    config.trial.detection_report.shuffle_mapping = false;
    config.visual.grating_resolution = 16;
    config.staircase.suggested_alpha = 0.9;
    config
}

#[test]
fn test_simulated_observer_threshold_is_recovered() {
    let config = ExperimentConfig::default();
    let settings = StaircaseSettings::from_config(&config.staircase, &config.contrast);
    let mut engine = StaircaseEngine::new(settings).unwrap();
    let observer = SimulatedObserver::new(0.42);
    let mut picker = StdRng::seed_from_u64(3);
    let mut answers = StdRng::seed_from_u64(4);

    let threshold = engine
        .run_until_converged(&mut picker, |pick| {
            Ok::<_, ()>(observer.respond(pick.alpha, &mut answers))
        })
        .unwrap();

    assert!((threshold - 0.42).abs() < 0.01, "threshold {}", threshold);
    for name in SequenceName::BOTH {
        let sequence = engine.sequence(name);
        assert!(sequence.reversal_count() >= config.staircase.n_reversals);
        assert!(sequence.values().iter().all(|&alpha| (0.0..=1.0).contains(&alpha)));
    }
}

#[test]
fn test_always_seen_block_clamps_at_gamma() {
    let temp = TempDir::new().unwrap();
    let store = ParticipantStore::create(temp.path(), "p02").unwrap();
    let renderer = RecordingRenderer::new().keep_frames(false);
    let input = ScriptedInput::default().with_idle(["f"]);
    let mut session = ExperimentSession::new(fast_config(), store, renderer, input, 21).unwrap();

    let report = session
        .run_staircase_block("staircase_a", ColorMode::Fusion)
        .expect("block converges");

    assert_eq!(report.threshold, Some(1.0));
    assert!(report.swiss.iter().chain(&report.dutch).all(|&alpha| alpha <= 1.0));
    assert!(report.history.iter().all(|step| step.detected));

    let stored = session.store().load_staircase("staircase_a").unwrap();
    assert_eq!(stored, report);

    let last = report.history.len() - 1;
    let record = session
        .store()
        .load_trial("staircase_a", &format!("staircase_a_{}", last))
        .unwrap();
    assert_eq!(record.choice("detection"), Some("seen"));
}

#[test]
fn test_never_seen_block_clamps_at_zero() {
    let temp = TempDir::new().unwrap();
    let store = ParticipantStore::create(temp.path(), "p03").unwrap();
    let renderer = RecordingRenderer::new().keep_frames(false);
    let input = ScriptedInput::default().with_idle(["j"]);
    let mut config = fast_config();
    config.staircase.suggested_alpha = 0.05;
    let mut session = ExperimentSession::new(config, store, renderer, input, 8).unwrap();

    let report = session
        .run_staircase_block("staircase_b", ColorMode::ColorA)
        .unwrap();

    assert_eq!(report.threshold, Some(0.0));
    assert!(report.history.iter().all(|step| !step.detected));
}
