//! Experiment session orchestration.
//!
//! `ExperimentSession` owns the display collaborators, the participant store
//! and the session RNG, and runs whole blocks: luminance calibration, contrast
//! practice, fixed experimental blocks, adaptive staircase blocks and manual
//! adjustment trials. Every trial record is written as soon as it finishes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calibration::{verify_betas, CalibrationSession, CalibrationTarget, GainFunctions, Polynomial};
use crate::config::ExperimentConfig;
use crate::display::{InputSource, Renderer, SceneTemplate, SquareLayout};
use crate::error::{
    log_calibration_error, log_config_error, log_storage_error, ConfigError, ExperimentError,
};
use crate::staircase::{StaircaseEngine, StaircaseReport, StaircaseSettings};
use crate::stimulus::{
    build_grating_stimulus, ColorMode, ColorModel, GratingRequest, Orientation, TimedStimulus,
};
use crate::storage::ParticipantStore;
use crate::telemetry;
use crate::trial::{
    run_trial, AdjustmentController, AdjustmentSpec, PresentationSpec, SliderSpec, TextSpec,
    TrialContext, TrialKind, TrialRecord,
};

/// Block directory used by the contrast practice
pub const PRACTICE_BLOCK: &str = "practice_trials";

/// Running experiment for one participant
pub struct ExperimentSession<R: Renderer, I: InputSource> {
    config: ExperimentConfig,
    store: ParticipantStore,
    renderer: R,
    input: I,
    layout: SquareLayout,
    scene: SceneTemplate,
    color_model: ColorModel,
    gains: GainFunctions,
    rng: StdRng,
}

impl<R: Renderer, I: InputSource> ExperimentSession<R, I> {
    /// Validate the configuration and prepare the shared scene
    ///
    /// Gains start as the identity until a calibration is run or loaded.
    pub fn new(
        config: ExperimentConfig,
        store: ParticipantStore,
        renderer: R,
        input: I,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        config.validate().map_err(|err| {
            log_config_error(&err, "ExperimentSession::new");
            err
        })?;

        let layout = SquareLayout::from_config(&config.screen, &config.visual);
        let scene = SceneTemplate::dichoptic(&layout, &config.screen, &config.visual);
        let color_model = ColorModel::from_config(&config.visual);

        tracing::info!(
            participant = %store.root().display(),
            seed,
            "[Session] Experiment session ready"
        );

        Ok(Self {
            config,
            store,
            renderer,
            input,
            layout,
            scene,
            color_model,
            gains: GainFunctions::default(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn store(&self) -> &ParticipantStore {
        &self.store
    }

    pub fn gains(&self) -> &GainFunctions {
        &self.gains
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Install a gain polynomial for `target`
    pub fn set_gain(&mut self, target: CalibrationTarget, polynomial: Polynomial) {
        match target {
            CalibrationTarget::DcfColors => self.gains.beta = polynomial,
            CalibrationTarget::Background => self.gains.kappa = polynomial,
        }
    }

    /// Run calibration sweeps until approved and install the fitted gain
    ///
    /// Any raw or fitted beta above 1.0 aborts before the gain is installed or
    /// anything is written, whether or not `save` is set.
    pub fn run_color_contrast_calibration(
        &mut self,
        target: CalibrationTarget,
        n_levels: usize,
        save: bool,
    ) -> Result<Polynomial, ExperimentError> {
        let mut calibration = CalibrationSession::new(&self.config, target, n_levels)?;
        let polynomial = calibration
            .run(&mut self.renderer, &mut self.input, &mut self.rng)?
            .clone();

        calibration.check_integrity().map_err(|err| {
            log_calibration_error(&err, "run_color_contrast_calibration");
            err
        })?;

        if save {
            self.store
                .save_calibration(target, calibration.raw_betas(), &polynomial)
                .map_err(|err| {
                    log_storage_error(&err, "run_color_contrast_calibration");
                    err
                })?;
        }

        self.set_gain(target, polynomial.clone());
        Ok(polynomial)
    }

    /// Reload a persisted calibration and install its gain
    pub fn load_calibration(&mut self, target: CalibrationTarget) -> Result<Polynomial, ExperimentError> {
        let raw = self.store.load_calibration_table(target)?;
        let polynomial = self.store.load_polynomial(target)?;
        verify_betas(&raw, &polynomial, &self.config.contrast).map_err(|err| {
            log_calibration_error(&err, "load_calibration");
            err
        })?;

        log::info!(
            "[Session] Loaded {} calibration: {:?}",
            target,
            polynomial.coefficients()
        );
        self.set_gain(target, polynomial.clone());
        Ok(polynomial)
    }

    /// Button-terminated stereo trials at every practice contrast
    pub fn run_contrast_practice_block(&mut self) -> Result<Vec<TrialRecord>, ExperimentError> {
        let practice = self.config.practice.clone();
        let mut records = Vec::with_capacity(practice.alphas.len() * practice.trials_per_level);
        let mut index = 0;

        for &alpha in &practice.alphas {
            for _ in 0..practice.trials_per_level {
                let color_mode = if self.rng.gen_bool(0.5) {
                    ColorMode::ColorA
                } else {
                    ColorMode::ColorB
                };
                let stimulus = self.grating(alpha, color_mode, 0, practice.max_trial_duration_frames)?;
                let mut kind = TrialKind::Stereo {
                    presentation: PresentationSpec::new(
                        practice.max_trial_duration_frames,
                        stimulus,
                        practice.termination_buttons.clone(),
                    ),
                };

                let trial_id = format!("Practice_{}", index);
                records.push(self.execute(PRACTICE_BLOCK, &trial_id, &mut kind)?);
                self.insert_inter_trial_interval(practice.inter_trial_frames);
                index += 1;
            }
        }

        Ok(records)
    }

    /// Fixed-contrast block with detection and discrimination reports
    ///
    /// # Errors
    /// `ConfigError::LengthMismatch` when `alphas` or `color_modes` do not hold
    /// exactly `n_trials` entries; nothing is shown in that case.
    pub fn run_experimental_block(
        &mut self,
        block: &str,
        n_trials: usize,
        alphas: &[f64],
        color_modes: &[ColorMode],
    ) -> Result<Vec<TrialRecord>, ExperimentError> {
        check_length("color_modes", n_trials, color_modes.len())?;
        check_length("alphas", n_trials, alphas.len())?;

        tracing::info!(block, n_trials, "[Session] Experimental block started");
        let timing = self.config.trial.clone();
        let latest_onset = timing
            .trial_duration_frames
            .saturating_sub(timing.no_stimulus_back_frames)
            .max(timing.no_stimulus_front_frames);

        let mut records = Vec::with_capacity(n_trials);
        for (index, (&alpha, &color_mode)) in alphas.iter().zip(color_modes).enumerate() {
            let onset = self
                .rng
                .gen_range(timing.no_stimulus_front_frames..=latest_onset);
            let stimulus = self.grating(alpha, color_mode, onset, timing.stimulus_duration_frames)?;
            let mut kind = TrialKind::Discrimination {
                presentation: PresentationSpec::new(timing.trial_duration_frames, stimulus, Vec::new()),
                detection: timing.detection_report.clone(),
                discrimination: timing.discrimination_report.clone(),
            };

            let trial_id = format!("{}_{}", block, index);
            records.push(self.execute(block, &trial_id, &mut kind)?);
            self.insert_inter_trial_interval(timing.inter_trial_frames);
        }

        Ok(records)
    }

    /// Adaptive detection block driven by the dual staircase
    ///
    /// Runs until both sequences converge, then writes `staircase_<block>.json`.
    pub fn run_staircase_block(
        &mut self,
        block: &str,
        color_mode: ColorMode,
    ) -> Result<StaircaseReport, ExperimentError> {
        let settings = StaircaseSettings::from_config(&self.config.staircase, &self.config.contrast);
        let mut engine = StaircaseEngine::new(settings)?;
        let timing = self.config.trial.clone();
        let detected_label = self.config.staircase.detected_label.clone();
        let latest_onset = timing
            .trial_duration_frames
            .saturating_sub(timing.no_stimulus_back_frames)
            .max(timing.no_stimulus_front_frames);

        tracing::info!(block, ?color_mode, "[Session] Staircase block started");

        let mut index = 0;
        let threshold = loop {
            let pick = engine.next_trial(&mut self.rng);
            let onset = self
                .rng
                .gen_range(timing.no_stimulus_front_frames..=latest_onset);
            let stimulus = self.grating(pick.alpha, color_mode, onset, timing.stimulus_duration_frames)?;
            let mut kind = TrialKind::Detection {
                presentation: PresentationSpec::new(timing.trial_duration_frames, stimulus, Vec::new()),
                report: timing.detection_report.clone(),
            };

            let trial_id = format!("{}_{}", block, index);
            let record = self.execute(block, &trial_id, &mut kind)?;
            let detected = record.choice(&timing.detection_report.report) == Some(detected_label.as_str());
            index += 1;

            if let Some(threshold) = engine.record_response(pick.sequence, detected) {
                break threshold;
            }
            self.insert_inter_trial_interval(timing.inter_trial_frames);
        };

        tracing::info!(block, threshold, trials = index, "[Session] Staircase converged");
        let report = engine.report();
        self.store.save_staircase(block, &report)?;
        Ok(report)
    }

    /// Manual adjustment starting from a jittered `alpha`
    pub fn run_adjustment_trial(
        &mut self,
        block: &str,
        trial_id: &str,
        alpha: f64,
        seed: u64,
    ) -> Result<TrialRecord, ExperimentError> {
        let adjustment = self.config.adjustment.clone();
        let controller = AdjustmentController::with_jitter(
            self.color_model,
            self.gains.clone(),
            alpha,
            adjustment.jitter,
            seed,
            adjustment.step,
            self.config.contrast.gamma,
        );
        let mut kind = TrialKind::Adjustment(AdjustmentSpec {
            controller,
            increase_key: adjustment.increase_key,
            decrease_key: adjustment.decrease_key,
            terminate_key: adjustment.terminate_key,
            flicker_period_frames: adjustment.flicker_period_frames,
        });
        self.execute(block, trial_id, &mut kind)
    }

    /// Rating scale trial
    pub fn run_slider_trial(
        &mut self,
        block: &str,
        trial_id: &str,
        spec: SliderSpec,
    ) -> Result<TrialRecord, ExperimentError> {
        let mut kind = TrialKind::Slider(spec);
        self.execute(block, trial_id, &mut kind)
    }

    /// Instruction screen; nothing is persisted
    pub fn show_instructions(&mut self, text: &str) -> Result<String, ExperimentError> {
        let mut kind = TrialKind::Text(TextSpec::new(text, self.config.keys.continue_keys.clone()));
        let mut ctx = self.context();
        let record = run_trial(&mut ctx, "instructions", &mut kind)?;
        Ok(record.terminated_by)
    }

    /// Show only the scene template for `frames` flips
    pub fn insert_inter_trial_interval(&mut self, frames: u32) {
        self.renderer
            .set_background_color(self.config.visual.background_rgb1);
        for _ in 0..frames {
            self.scene.draw(&mut self.renderer);
            self.renderer.flip();
        }
    }

    fn context(&mut self) -> TrialContext<'_> {
        TrialContext {
            renderer: &mut self.renderer,
            input: &mut self.input,
            scene: &self.scene,
            layout: &self.layout,
            rng: &mut self.rng,
        }
    }

    fn grating(
        &mut self,
        alpha: f64,
        color_mode: ColorMode,
        onset: u32,
        duration: u32,
    ) -> Result<TimedStimulus, ConfigError> {
        let colors = self.color_model.colors_at(alpha, &self.gains);
        let request = GratingRequest {
            alpha,
            color_mode,
            orientation: Orientation::random(&mut self.rng),
            onset,
            duration,
            resolution: self.config.visual.grating_resolution,
        };
        build_grating_stimulus(&self.layout, &colors, request, &mut self.rng)
    }

    fn execute(
        &mut self,
        block: &str,
        trial_id: &str,
        kind: &mut TrialKind,
    ) -> Result<TrialRecord, ExperimentError> {
        let mut ctx = self.context();
        let record = run_trial(&mut ctx, trial_id, kind)?;
        self.store.save_trial(block, &record).map_err(|err| {
            log_storage_error(&err, "save_trial");
            err
        })?;
        telemetry::hub().record_trial(block, &record.trial_id, &record.terminated_by);
        Ok(record)
    }
}

fn check_length(field: &str, expected: usize, actual: usize) -> Result<(), ConfigError> {
    if expected != actual {
        let err = ConfigError::LengthMismatch {
            field: field.to_string(),
            expected,
            actual,
        };
        log_config_error(&err, "run_experimental_block");
        return Err(err);
    }
    Ok(())
}
