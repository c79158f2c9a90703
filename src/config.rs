//! Configuration management for experiment sessions
//!
//! This module provides runtime configuration loading from JSON files so that
//! screen geometry, calibration step sizes and staircase parameters can be
//! adjusted per lab setup without recompilation. All values are consumed as
//! opaque numbers; `validate` enforces the handful of rules the procedures
//! depend on.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::calibration::CalibrationDisplay;
use crate::display::Rgb;
use crate::error::ConfigError;

/// Complete experiment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub screen: ScreenConfig,
    pub visual: VisualConfig,
    pub contrast: ContrastConfig,
    pub calibration: CalibrationConfig,
    pub staircase: StaircaseConfig,
    pub trial: TrialConfig,
    pub practice: PracticeConfig,
    pub adjustment: AdjustmentConfig,
    pub keys: KeysConfig,
}

/// Physical monitor description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Vertical refresh in Hz; must be a multiple of 30 for the 15 Hz flicker
    pub refresh_rate_hz: u32,
    pub distance_to_screen_cm: f64,
    pub resolution_x_px: u32,
    pub resolution_y_px: u32,
    pub screen_width_cm: f64,
    pub screen_height_cm: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60,
            distance_to_screen_cm: 60.0,
            resolution_x_px: 1920,
            resolution_y_px: 1080,
            screen_width_cm: 53.0,
            screen_height_cm: 30.0,
        }
    }
}

impl ScreenConfig {
    /// Pixels per degree of visual angle, averaged over both screen axes
    pub fn px_per_deg(&self) -> f64 {
        let cm_per_degree = self.distance_to_screen_cm * 1.0_f64.to_radians().tan();
        let y_px_per_cm = self.resolution_y_px as f64 / self.screen_height_cm;
        let x_px_per_cm = self.resolution_x_px as f64 / self.screen_width_cm;
        let px_per_cm = (y_px_per_cm + x_px_per_cm) / 2.0;
        px_per_cm * cm_per_degree
    }

    /// Frames per half flicker cycle for the 15 Hz calibration flicker
    pub fn frames_per_flicker_phase(&self) -> Result<u32, ConfigError> {
        if self.refresh_rate_hz == 0 || self.refresh_rate_hz % 30 != 0 {
            return Err(ConfigError::RefreshRateNotMultipleOf30 {
                refresh_rate: self.refresh_rate_hz,
            });
        }
        Ok(self.refresh_rate_hz / 30)
    }
}

/// Stimulus geometry and base colours
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub square_size_deg: f64,
    pub inter_square_distance_deg: f64,
    pub frame_thickness_percent: f64,
    pub fixation_cross_size_deg: f64,
    pub background_rgb1: Rgb,
    pub frame_rgb1: Rgb,
    /// Reference colour (colour A) at full contrast
    pub color_a_rgb1: Rgb,
    /// Gain-corrected colour (colour B) at full contrast
    pub color_b_rgb1: Rgb,
    /// Grating texture resolution, a power of two up to 512
    pub grating_resolution: usize,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            square_size_deg: 4.0,
            inter_square_distance_deg: 2.0,
            frame_thickness_percent: 3.0,
            fixation_cross_size_deg: 0.5,
            background_rgb1: Rgb::new(0.0, 0.0, 0.5),
            frame_rgb1: Rgb::new(0.0, 0.0, 0.0),
            color_a_rgb1: Rgb::new(0.75, 0.25, 0.0),
            color_b_rgb1: Rgb::new(0.25, 0.75, 0.0),
            grating_resolution: 128,
        }
    }
}

/// Contrast scale shared by calibration and staircase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContrastConfig {
    /// Full saturation bound; alpha and staircase values live in `[0, gamma]`
    pub gamma: f64,
    /// Alpha step between consecutive calibration levels
    pub alpha_decrement: f64,
}

impl Default for ContrastConfig {
    fn default() -> Self {
        Self {
            gamma: 1.0,
            alpha_decrement: 0.05,
        }
    }
}

impl ContrastConfig {
    /// Nominal alpha of a calibration contrast level
    pub fn alpha_for_level(&self, level: usize) -> f64 {
        self.gamma - self.alpha_decrement * level as f64
    }
}

/// Luminance calibration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub beta_0: f64,
    pub beta_increment: f64,
    pub display: CalibrationDisplay,
    pub n_levels: usize,
    /// Blank frames shown between two calibration rounds
    pub inter_round_frames: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            beta_0: 0.9,
            beta_increment: 0.01,
            display: CalibrationDisplay::Checkerboard,
            n_levels: 15,
            inter_round_frames: 60,
        }
    }
}

/// Dual staircase parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaircaseConfig {
    pub suggested_alpha: f64,
    pub exploration_range: f64,
    pub alpha_increment: f64,
    pub n_reversals: usize,
    /// Detection label that counts as a "yes" response
    pub detected_label: String,
}

impl Default for StaircaseConfig {
    fn default() -> Self {
        Self {
            suggested_alpha: 0.3,
            exploration_range: 1.0 / 50.0,
            alpha_increment: 1.0 / 255.0,
            n_reversals: 6,
            detected_label: "seen".to_string(),
        }
    }
}

/// Two-choice report shown after a presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Report name stored with the response, e.g. `detection`
    pub report: String,
    pub question_icon_text: String,
    pub response_buttons: Vec<String>,
    pub response_labels: Vec<String>,
    /// Randomly reassign labels to buttons on every trial
    #[serde(default = "default_shuffle_mapping")]
    pub shuffle_mapping: bool,
}

fn default_shuffle_mapping() -> bool {
    true
}

impl ResponseConfig {
    pub fn detection() -> Self {
        Self {
            report: "detection".to_string(),
            question_icon_text: "?".to_string(),
            response_buttons: vec!["f".to_string(), "j".to_string()],
            response_labels: vec!["seen".to_string(), "not seen".to_string()],
            shuffle_mapping: true,
        }
    }

    pub fn discrimination() -> Self {
        Self {
            report: "discrimination".to_string(),
            question_icon_text: "<>".to_string(),
            response_buttons: vec!["f".to_string(), "j".to_string()],
            response_labels: vec!["left".to_string(), "right".to_string()],
            shuffle_mapping: true,
        }
    }
}

/// Experimental trial timing, in frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialConfig {
    pub trial_duration_frames: u32,
    pub stimulus_duration_frames: u32,
    pub no_stimulus_front_frames: u32,
    pub no_stimulus_back_frames: u32,
    pub inter_trial_frames: u32,
    pub detection_report: ResponseConfig,
    pub discrimination_report: ResponseConfig,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            trial_duration_frames: 330,
            stimulus_duration_frames: 30,
            no_stimulus_front_frames: 45,
            no_stimulus_back_frames: 75,
            inter_trial_frames: 60,
            detection_report: ResponseConfig::detection(),
            discrimination_report: ResponseConfig::discrimination(),
        }
    }
}

/// Contrast practice block
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    pub alphas: Vec<f64>,
    pub trials_per_level: usize,
    pub max_trial_duration_frames: u32,
    pub termination_buttons: Vec<String>,
    pub inter_trial_frames: u32,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            alphas: vec![0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9],
            trials_per_level: 1,
            max_trial_duration_frames: 500,
            termination_buttons: vec!["left".to_string(), "right".to_string()],
            inter_trial_frames: 30,
        }
    }
}

/// Manual adjustment trial
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub step: f64,
    /// Half-width of the uniform jitter applied to the starting alpha
    pub jitter: f64,
    /// Frames per on/off group of the adjustment flicker
    pub flicker_period_frames: u32,
    pub increase_key: String,
    pub decrease_key: String,
    pub terminate_key: Option<String>,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            step: 1.0 / 255.0,
            jitter: 0.05,
            flicker_period_frames: 8,
            increase_key: "up".to_string(),
            decrease_key: "down".to_string(),
            terminate_key: Some("space".to_string()),
        }
    }
}

/// Keys used by calibration and approval screens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub up: String,
    pub down: String,
    pub terminate: String,
    pub approve: String,
    pub reject: String,
    pub continue_keys: Vec<String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            up: "up".to_string(),
            down: "down".to_string(),
            terminate: "space".to_string(),
            approve: "a".to_string(),
            reject: "r".to_string(),
            continue_keys: vec!["space".to_string()],
        }
    }
}

impl ExperimentConfig {
    /// Load configuration from a JSON file, failing on any read or parse error
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        log::info!("[Config] Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load configuration from JSON file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults when the file is missing or
    /// malformed (a warning is logged in that case).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("[Config] {}. Using defaults.", err);
                Self::default()
            }
        }
    }

    /// Check the rules the procedures rely on before anything is displayed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.screen.frames_per_flicker_phase()?;

        if !(self.contrast.gamma > 0.0) {
            return Err(ConfigError::invalid_parameter("gamma", self.contrast.gamma));
        }
        if self.calibration.n_levels < 3 {
            return Err(ConfigError::invalid_parameter(
                "n_levels",
                self.calibration.n_levels,
            ));
        }
        if self.staircase.n_reversals == 0 {
            return Err(ConfigError::invalid_parameter("n_reversals", 0));
        }
        if !(self.staircase.alpha_increment > 0.0) {
            return Err(ConfigError::invalid_parameter(
                "alpha_increment",
                self.staircase.alpha_increment,
            ));
        }
        if self.staircase.exploration_range < 0.0 {
            return Err(ConfigError::invalid_parameter(
                "exploration_range",
                self.staircase.exploration_range,
            ));
        }

        validate_response(&self.trial.detection_report)?;
        validate_response(&self.trial.discrimination_report)?;
        if !self
            .trial
            .detection_report
            .response_labels
            .contains(&self.staircase.detected_label)
        {
            return Err(ConfigError::InvalidResponseMapping {
                reason: format!(
                    "detected label '{}' is not one of the detection labels",
                    self.staircase.detected_label
                ),
            });
        }

        let window = self
            .trial
            .no_stimulus_front_frames
            .checked_add(self.trial.no_stimulus_back_frames)
            .filter(|&window| window <= self.trial.trial_duration_frames);
        if window.is_none() {
            return Err(ConfigError::invalid_parameter(
                "no_stimulus_front_frames + no_stimulus_back_frames",
                format!(
                    "{} + {}",
                    self.trial.no_stimulus_front_frames, self.trial.no_stimulus_back_frames
                ),
            ));
        }

        if self
            .adjustment
            .terminate_key
            .as_deref()
            .map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingTerminationKey {
                trial_id: "adjustment".to_string(),
            });
        }
        if self.adjustment.flicker_period_frames == 0 {
            return Err(ConfigError::invalid_parameter("flicker_period_frames", 0));
        }

        Ok(())
    }
}

/// A two-choice report needs exactly two distinct buttons and two labels
pub fn validate_response(response: &ResponseConfig) -> Result<(), ConfigError> {
    if response.response_buttons.len() != 2 {
        return Err(ConfigError::InvalidResponseMapping {
            reason: format!(
                "{} report needs exactly two buttons, got {}",
                response.report,
                response.response_buttons.len()
            ),
        });
    }
    if response.response_labels.len() != 2 {
        return Err(ConfigError::InvalidResponseMapping {
            reason: format!(
                "{} report needs exactly two labels, got {}",
                response.report,
                response.response_labels.len()
            ),
        });
    }
    if response.response_buttons[0] == response.response_buttons[1] {
        return Err(ConfigError::InvalidResponseMapping {
            reason: format!("{} report buttons must differ", response.report),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.screen.refresh_rate_hz, 60);
        assert_eq!(config.calibration.n_levels, 15);
        assert_eq!(config.adjustment.flicker_period_frames, 8);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = ExperimentConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: ExperimentConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.staircase.alpha_increment, config.staircase.alpha_increment);
        assert_eq!(parsed.visual.color_a_rgb1, config.visual.color_a_rgb1);
        assert_eq!(parsed.calibration.display, config.calibration.display);
    }

    #[test]
    fn test_partial_json_uses_section_defaults() {
        let parsed: ExperimentConfig =
            serde_json::from_str(r#"{ "screen": { "refresh_rate_hz": 120 } }"#).unwrap();
        assert_eq!(parsed.screen.refresh_rate_hz, 120);
        assert_eq!(parsed.screen.resolution_x_px, 1920);
        assert_eq!(parsed.screen.frames_per_flicker_phase().unwrap(), 4);
    }

    #[test]
    fn test_refresh_rate_must_be_multiple_of_30() {
        let mut config = ExperimentConfig::default();
        config.screen.refresh_rate_hz = 75;
        assert_eq!(
            config.validate(),
            Err(ConfigError::RefreshRateNotMultipleOf30 { refresh_rate: 75 })
        );
    }

    #[test]
    fn test_blank_window_overflow_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.trial.no_stimulus_front_frames = u32::MAX;
        config.trial.no_stimulus_back_frames = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_blank_window_longer_than_trial_is_rejected() {
        let mut config = ExperimentConfig::default();
        config.trial.no_stimulus_front_frames = config.trial.trial_duration_frames;
        config.trial.no_stimulus_back_frames = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_unknown_display_fails_to_parse() {
        let err = serde_json::from_str::<ExperimentConfig>(
            r#"{ "calibration": { "display": "stripes" } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("stripes"));
    }

    #[test]
    fn test_missing_adjustment_terminate_key_rejected() {
        let mut config = ExperimentConfig::default();
        config.adjustment.terminate_key = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingTerminationKey { .. })
        ));
    }

    #[test]
    fn test_response_needs_two_buttons() {
        let mut response = ResponseConfig::detection();
        response.response_buttons.push("k".to_string());
        assert!(matches!(
            validate_response(&response),
            Err(ConfigError::InvalidResponseMapping { .. })
        ));
    }

    #[test]
    fn test_alpha_for_level() {
        let contrast = ContrastConfig {
            gamma: 1.0,
            alpha_decrement: 0.05,
        };
        assert_eq!(contrast.alpha_for_level(0), 1.0);
        assert!((contrast.alpha_for_level(4) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_px_per_deg_is_positive() {
        let screen = ScreenConfig::default();
        let px = screen.px_per_deg();
        assert!(px > 30.0 && px < 60.0, "unexpected px/deg {}", px);
    }

    #[test]
    fn test_load_from_file_falls_back_to_defaults() {
        let config = ExperimentConfig::load_from_file("does/not/exist.json");
        assert_eq!(config.screen.refresh_rate_hz, 60);
        assert!(matches!(
            ExperimentConfig::from_file("does/not/exist.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
