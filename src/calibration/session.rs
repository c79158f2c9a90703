// CalibrationSession - full luminance calibration sweep
//
// Runs one calibrator round per contrast level in shuffled order, fits the
// gain polynomial over (alpha, beta) and asks the experimenter to approve it.
// Rejected sweeps are repeated from scratch until one is approved.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::calibration::approval::{request_approval, FitReview, Judgement};
use crate::calibration::calibrator::{Calibrator, CalibratorKeys, CalibratorSettings};
use crate::calibration::polynomial::{Polynomial, DEFAULT_DEGREE};
use crate::config::{ContrastConfig, ExperimentConfig};
use crate::display::{InputSource, Renderer};
use crate::error::{CalibrationError, ConfigError, ExperimentError};
use crate::stimulus::ColorModel;
use crate::telemetry;

/// Fewest levels a degree-2 fit can use
pub const MIN_LEVELS: usize = DEFAULT_DEGREE + 1;

/// Which gain a calibration produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationTarget {
    /// Colour B against colour A, yields the beta polynomial
    #[serde(rename = "DCF_colors")]
    DcfColors,
    /// Background against colour A, yields the kappa polynomial
    #[serde(rename = "background")]
    Background,
}

impl CalibrationTarget {
    /// Suffix used in `calibration_<type>.json` and `polynomial_<type>.json`
    pub fn file_stem(&self) -> &'static str {
        match self {
            CalibrationTarget::DcfColors => "DCF_colors",
            CalibrationTarget::Background => "background",
        }
    }
}

impl fmt::Display for CalibrationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for CalibrationTarget {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "DCF_colors" => Ok(CalibrationTarget::DcfColors),
            "background" => Ok(CalibrationTarget::Background),
            other => Err(ConfigError::UnknownCalibrationTarget {
                value: other.to_string(),
            }),
        }
    }
}

/// Reject any raw or fitted beta above 1.0
///
/// Fitted values are checked at the alphas of the sampled levels.
pub fn verify_betas(
    raw_betas: &BTreeMap<usize, f64>,
    polynomial: &Polynomial,
    contrast: &ContrastConfig,
) -> Result<(), CalibrationError> {
    if let Some((&level, &beta)) = raw_betas.iter().find(|(_, &beta)| beta > 1.0) {
        return Err(CalibrationError::RawBetaExceedsOne { level, beta });
    }
    for &level in raw_betas.keys() {
        let alpha = contrast.alpha_for_level(level);
        let beta = polynomial.evaluate(alpha);
        if beta > 1.0 {
            return Err(CalibrationError::FittedBetaExceedsOne { alpha, beta });
        }
    }
    Ok(())
}

/// Calibration sweep state for one target
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    target: CalibrationTarget,
    n_levels: usize,
    template: CalibratorSettings,
    color_model: ColorModel,
    contrast: ContrastConfig,
    keys: crate::config::KeysConfig,
    inter_round_frames: u32,
    raw_betas: BTreeMap<usize, f64>,
    polynomial: Option<Polynomial>,
    is_calibration_approved: bool,
    sweeps: usize,
}

impl CalibrationSession {
    /// Prepare a session, validating display parameters before anything is shown
    pub fn new(
        config: &ExperimentConfig,
        target: CalibrationTarget,
        n_levels: usize,
    ) -> Result<Self, ConfigError> {
        if n_levels < MIN_LEVELS {
            return Err(ConfigError::invalid_parameter("n_levels", n_levels));
        }

        let template = CalibratorSettings {
            refresh_rate_hz: config.screen.refresh_rate_hz,
            beta_0: config.calibration.beta_0,
            beta_increment: config.calibration.beta_increment,
            display: config.calibration.display,
            color_a: config.visual.color_a_rgb1,
            color_b: config.visual.color_b_rgb1,
            field_size: 3.0 * (config.visual.square_size_deg * config.screen.px_per_deg()).trunc(),
            background: config.visual.background_rgb1,
            keys: CalibratorKeys {
                up: config.keys.up.clone(),
                down: config.keys.down.clone(),
                terminate: config.keys.terminate.clone(),
            },
        };
        // Fails fast on an unusable refresh rate.
        Calibrator::new(template.clone())?;

        Ok(Self {
            target,
            n_levels,
            template,
            color_model: ColorModel::from_config(&config.visual),
            contrast: config.contrast.clone(),
            keys: config.keys.clone(),
            inter_round_frames: config.calibration.inter_round_frames,
            raw_betas: BTreeMap::new(),
            polynomial: None,
            is_calibration_approved: false,
            sweeps: 0,
        })
    }

    pub fn target(&self) -> CalibrationTarget {
        self.target
    }

    pub fn n_levels(&self) -> usize {
        self.n_levels
    }

    /// Raw betas of the approved sweep, keyed by level
    pub fn raw_betas(&self) -> &BTreeMap<usize, f64> {
        &self.raw_betas
    }

    pub fn polynomial(&self) -> Option<&Polynomial> {
        self.polynomial.as_ref()
    }

    pub fn is_calibration_approved(&self) -> bool {
        self.is_calibration_approved
    }

    /// Number of sweeps run so far, including rejected ones
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    /// Repeat sweeps until the experimenter approves one
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        renderer: &mut dyn Renderer,
        input: &mut dyn InputSource,
        rng: &mut R,
    ) -> Result<&Polynomial, ExperimentError> {
        self.is_calibration_approved = false;

        loop {
            let sweep = self.run_sweep(renderer, input, rng)?;
            if sweep.len() != self.n_levels {
                return Err(CalibrationError::InsufficientSamples {
                    required: self.n_levels,
                    collected: sweep.len(),
                }
                .into());
            }

            let (alphas, betas): (Vec<f64>, Vec<f64>) = sweep
                .iter()
                .map(|(&level, &beta)| (self.contrast.alpha_for_level(level), beta))
                .unzip();
            let polynomial = Polynomial::fit(&alphas, &betas, DEFAULT_DEGREE)?;

            let review = FitReview::new(&sweep, &self.contrast, polynomial.clone());
            let judgement = request_approval(&review, &self.keys, renderer, input);
            let approved = judgement == Judgement::Approved;
            telemetry::hub().record_calibration_judgement(self.target, self.sweeps, approved);

            if approved {
                log::info!(
                    "[CalibrationSession] {} calibration approved after {} sweep(s): {:?}",
                    self.target,
                    self.sweeps,
                    polynomial.coefficients()
                );
                self.raw_betas = sweep;
                self.is_calibration_approved = true;
                return Ok(self.polynomial.insert(polynomial));
            }

            log::info!(
                "[CalibrationSession] {} calibration rejected, repeating sweep",
                self.target
            );
        }
    }

    /// Integrity check performed before persisting an approved calibration
    pub fn check_integrity(&self) -> Result<(), CalibrationError> {
        let polynomial = match (&self.polynomial, self.is_calibration_approved) {
            (Some(polynomial), true) => polynomial,
            _ => {
                return Err(CalibrationError::InsufficientSamples {
                    required: self.n_levels,
                    collected: 0,
                })
            }
        };
        verify_betas(&self.raw_betas, polynomial, &self.contrast)
    }

    fn run_sweep<R: Rng + ?Sized>(
        &mut self,
        renderer: &mut dyn Renderer,
        input: &mut dyn InputSource,
        rng: &mut R,
    ) -> Result<BTreeMap<usize, f64>, ConfigError> {
        self.sweeps += 1;

        let mut levels: Vec<usize> = (0..self.n_levels).collect();
        levels.shuffle(rng);
        log::debug!(
            "[CalibrationSession] Sweep {} level order: {:?}",
            self.sweeps,
            levels
        );

        let mut sweep = BTreeMap::new();
        for (round, &level) in levels.iter().enumerate() {
            if round > 0 {
                self.inter_round_pause(renderer);
            }

            let alpha = self.contrast.alpha_for_level(level);
            let (color_a, color_b) = self.color_model.calibration_pair(self.target, alpha, 1.0);
            let calibrator = Calibrator::new(CalibratorSettings {
                color_a,
                color_b,
                ..self.template.clone()
            })?;

            let beta = calibrator.run_calibration_trial(renderer, input);
            telemetry::hub().record_calibration_round(self.target, level, alpha, beta);
            sweep.insert(level, beta);
        }

        Ok(sweep)
    }

    fn inter_round_pause(&self, renderer: &mut dyn Renderer) {
        renderer.set_background_color(self.template.background);
        for _ in 0..self.inter_round_frames {
            renderer.flip();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRenderer, ScriptedInput};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> ExperimentConfig {
        let mut config = ExperimentConfig::default();
        config.calibration.inter_round_frames = 2;
        config
    }

    /// One "down" then terminate per level, followed by the approval key
    fn sweep_script(n_levels: usize, decision: &str) -> Vec<Vec<&str>> {
        let mut polls = Vec::new();
        for _ in 0..n_levels {
            polls.push(vec!["down"]);
            polls.push(vec!["space"]);
        }
        polls.push(vec![decision]);
        polls
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!(
            "DCF_colors".parse::<CalibrationTarget>().unwrap(),
            CalibrationTarget::DcfColors
        );
        assert_eq!(CalibrationTarget::Background.file_stem(), "background");
        assert!(matches!(
            "foreground".parse::<CalibrationTarget>(),
            Err(ConfigError::UnknownCalibrationTarget { .. })
        ));
        assert_eq!(
            serde_json::to_string(&CalibrationTarget::DcfColors).unwrap(),
            "\"DCF_colors\""
        );
    }

    #[test]
    fn test_rejects_too_few_levels() {
        assert!(matches!(
            CalibrationSession::new(&config(), CalibrationTarget::DcfColors, 2),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_refresh_rate_before_display() {
        let mut config = config();
        config.screen.refresh_rate_hz = 100;
        assert!(matches!(
            CalibrationSession::new(&config, CalibrationTarget::DcfColors, 5),
            Err(ConfigError::RefreshRateNotMultipleOf30 { refresh_rate: 100 })
        ));
    }

    #[test]
    fn test_approved_sweep_collects_every_level() {
        let mut session = CalibrationSession::new(&config(), CalibrationTarget::DcfColors, 4).unwrap();
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(sweep_script(4, "a"));
        let mut rng = StdRng::seed_from_u64(5);

        let polynomial = session.run(&mut renderer, &mut input, &mut rng).unwrap().clone();

        assert!(session.is_calibration_approved());
        assert_eq!(session.sweeps(), 1);
        assert_eq!(session.raw_betas().len(), 4);
        assert_eq!(
            session.raw_betas().keys().copied().collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        for beta in session.raw_betas().values() {
            assert!((beta - 0.89).abs() < 1e-12);
        }
        assert!((polynomial.evaluate(0.9) - 0.89).abs() < 1e-9);
        assert!(session.check_integrity().is_ok());
    }

    #[test]
    fn test_rejection_repeats_the_sweep() {
        let mut session = CalibrationSession::new(&config(), CalibrationTarget::Background, 3).unwrap();
        let mut script = sweep_script(3, "r");
        script.extend(sweep_script(3, "a"));
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(script);
        let mut rng = StdRng::seed_from_u64(9);

        session.run(&mut renderer, &mut input, &mut rng).unwrap();
        assert_eq!(session.sweeps(), 2);
        assert!(session.is_calibration_approved());
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_integrity_blocks_raw_beta_above_one() {
        let mut config = config();
        config.calibration.beta_0 = 1.0;
        let mut session = CalibrationSession::new(&config, CalibrationTarget::DcfColors, 3).unwrap();
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(vec![
            vec!["up"],
            vec!["space"],
            vec!["space"],
            vec!["space"],
            vec!["a"],
        ]);
        let mut rng = StdRng::seed_from_u64(1);

        session.run(&mut renderer, &mut input, &mut rng).unwrap();
        assert!(matches!(
            session.check_integrity(),
            Err(CalibrationError::RawBetaExceedsOne { .. })
        ));
    }

    #[test]
    fn test_verify_betas_flags_fitted_values() {
        let raw: BTreeMap<usize, f64> = [(0, 0.95), (1, 0.97), (2, 0.99)].into_iter().collect();
        let contrast = ContrastConfig::default();
        let rising = Polynomial::new(vec![1.1]);
        assert!(matches!(
            verify_betas(&raw, &rising, &contrast),
            Err(CalibrationError::FittedBetaExceedsOne { .. })
        ));
        assert!(verify_betas(&raw, &Polynomial::new(vec![0.97]), &contrast).is_ok());
    }

    #[test]
    fn test_unapproved_session_fails_integrity() {
        let session = CalibrationSession::new(&config(), CalibrationTarget::DcfColors, 3).unwrap();
        assert!(session.check_integrity().is_err());
    }
}
