//! Stimulus colour model and dichoptic stimulus construction.
//!
//! Contrast is expressed as a nominal `alpha`. The colour model turns it into
//! actual channel colours through the calibrated gain polynomials: colour B is
//! scaled by `beta(alpha)` and the background by `kappa(alpha)`.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationTarget, GainFunctions};
use crate::config::VisualConfig;
use crate::display::{ImageSource, ImageStim, Mask, Rgb, Shape, Side, SquareLayout, Visual};
use crate::error::ConfigError;

pub mod grating;

pub use grating::GratingTexture;

/// Colours of both channels and the background after gain correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjustedColors {
    pub color_a: Rgb,
    pub color_b: Rgb,
    pub background: Rgb,
}

/// Base colours at full contrast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorModel {
    pub color_a: Rgb,
    pub color_b: Rgb,
    pub background: Rgb,
}

impl ColorModel {
    pub fn from_config(visual: &VisualConfig) -> Self {
        Self {
            color_a: visual.color_a_rgb1,
            color_b: visual.color_b_rgb1,
            background: visual.background_rgb1,
        }
    }

    /// Gain-corrected colours for a nominal contrast.
    pub fn colors_at(&self, alpha: f64, gains: &GainFunctions) -> AdjustedColors {
        let beta = gains.beta.evaluate(alpha);
        let kappa = gains.kappa.evaluate(alpha);
        AdjustedColors {
            color_a: self.color_a.scale(alpha).clamped(),
            color_b: self.color_b.scale(alpha * beta).clamped(),
            background: self.background.scale(kappa).clamped(),
        }
    }

    /// Reference colour and candidate-gain colour flickered during calibration.
    pub fn calibration_pair(&self, target: CalibrationTarget, alpha: f64, gain: f64) -> (Rgb, Rgb) {
        let reference = self.color_a.scale(alpha);
        let candidate = match target {
            CalibrationTarget::DcfColors => self.color_b.scale(alpha * gain),
            CalibrationTarget::Background => self.background.scale(gain),
        };
        (reference, candidate)
    }
}

/// Which channel(s) carry the stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Colour A on one side and colour B on the other, sides shuffled
    Fusion,
    ColorA,
    ColorB,
}

/// Grating tilt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Left,
    Right,
}

impl Orientation {
    pub fn degrees(self) -> f64 {
        match self {
            Orientation::Left => 315.0,
            Orientation::Right => 45.0,
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Orientation::Left
        } else {
            Orientation::Right
        }
    }
}

/// What was shown on a trial, persisted with the trial record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusRecord {
    pub alpha: f64,
    pub color_mode: ColorMode,
    pub orientation: Orientation,
    pub onset: u32,
    pub duration: u32,
    pub left_color: Rgb,
    pub right_color: Rgb,
    pub background: Rgb,
}

/// Timed stimulus content for one presentation
#[derive(Debug, Clone)]
pub struct TimedStimulus {
    pub onset: u32,
    pub duration: u32,
    /// Background-filled squares drawn under the scene template every frame
    pub support: Vec<Visual>,
    /// Visuals shown only inside the presentation window
    pub visuals: Vec<Visual>,
    pub record: Option<StimulusRecord>,
}

impl TimedStimulus {
    /// No stimulus at all; used by stereo practice and plain waits
    pub fn blank() -> Self {
        Self {
            onset: 0,
            duration: 0,
            support: Vec::new(),
            visuals: Vec::new(),
            record: None,
        }
    }

    pub fn is_visible(&self, frame: u32) -> bool {
        frame >= self.onset && frame < self.onset.saturating_add(self.duration)
    }
}

/// Inputs for a dichoptic grating presentation
#[derive(Debug, Clone, Copy)]
pub struct GratingRequest {
    pub alpha: f64,
    pub color_mode: ColorMode,
    pub orientation: Orientation,
    pub onset: u32,
    pub duration: u32,
    pub resolution: usize,
}

/// Grating pair for both squares at the requested contrast.
pub fn build_grating_stimulus<R: Rng + ?Sized>(
    layout: &SquareLayout,
    colors: &AdjustedColors,
    request: GratingRequest,
    rng: &mut R,
) -> Result<TimedStimulus, ConfigError> {
    let (left_color, right_color) = match request.color_mode {
        ColorMode::Fusion => {
            let mut pair = [colors.color_a, colors.color_b];
            pair.shuffle(rng);
            (pair[0], pair[1])
        }
        ColorMode::ColorA => (colors.color_a, colors.color_a),
        ColorMode::ColorB => (colors.color_b, colors.color_b),
    };

    let mut support = Vec::with_capacity(2);
    let mut visuals = Vec::with_capacity(2);
    for (side, color) in [(Side::Left, left_color), (Side::Right, right_color)] {
        let pos = layout.center(side);
        support.push(Visual::Shape(Shape::filled_square(
            pos,
            layout.square_size,
            colors.background,
        )));
        let texture = GratingTexture::generate(request.resolution, color, colors.background, rng)?;
        visuals.push(Visual::Image(ImageStim {
            pos,
            size: (layout.square_size * 0.8, layout.square_size * 0.8),
            source: ImageSource::Grating {
                texture: Arc::new(texture),
                orientation_deg: request.orientation.degrees(),
                cycles: 4.0,
                mask: Mask::Gaussian,
            },
        }));
    }

    Ok(TimedStimulus {
        onset: request.onset,
        duration: request.duration,
        support,
        visuals,
        record: Some(StimulusRecord {
            alpha: request.alpha,
            color_mode: request.color_mode,
            orientation: request.orientation,
            onset: request.onset,
            duration: request.duration,
            left_color,
            right_color,
            background: colors.background,
        }),
    })
}
