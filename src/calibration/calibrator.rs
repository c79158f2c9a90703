// Calibrator - single flicker-photometry round
//
// Two colours alternate at 15 Hz while the participant nudges the gain of
// the candidate colour until the flicker is minimal. One call to
// `run_calibration_trial` is one contrast level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::display::{InputSource, Renderer, Rgb, Shape, Visual};
use crate::error::ConfigError;

/// Checkerboard side length in cells
const CHECKERBOARD_CELLS: usize = 6;

/// Cell edge relative to the grid pitch
const CELL_GAP_RATIO: f64 = 1.05;

/// Flicker layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationDisplay {
    Checkerboard,
    SingleSquare,
}

impl CalibrationDisplay {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationDisplay::Checkerboard => "checkerboard",
            CalibrationDisplay::SingleSquare => "single_square",
        }
    }
}

impl fmt::Display for CalibrationDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationDisplay {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "checkerboard" => Ok(CalibrationDisplay::Checkerboard),
            "single_square" => Ok(CalibrationDisplay::SingleSquare),
            other => Err(ConfigError::UnknownCalibrationDisplay {
                value: other.to_string(),
            }),
        }
    }
}

/// Keys the participant uses during a round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibratorKeys {
    pub up: String,
    pub down: String,
    pub terminate: String,
}

/// Parameters of one calibration round
#[derive(Debug, Clone)]
pub struct CalibratorSettings {
    pub refresh_rate_hz: u32,
    pub beta_0: f64,
    pub beta_increment: f64,
    pub display: CalibrationDisplay,
    /// Fixed reference colour
    pub color_a: Rgb,
    /// Candidate colour before the gain is applied
    pub color_b: Rgb,
    /// Edge of the flicker field in pixels
    pub field_size: f64,
    pub background: Rgb,
    pub keys: CalibratorKeys,
}

/// Flicker photometry round
#[derive(Debug, Clone)]
pub struct Calibrator {
    settings: CalibratorSettings,
    frames_per_phase: u64,
}

impl Calibrator {
    /// Create a calibrator
    ///
    /// # Errors
    /// `ConfigError::RefreshRateNotMultipleOf30` when the 15 Hz flicker cannot
    /// be produced with whole frames.
    pub fn new(settings: CalibratorSettings) -> Result<Self, ConfigError> {
        if settings.refresh_rate_hz == 0 || settings.refresh_rate_hz % 30 != 0 {
            return Err(ConfigError::RefreshRateNotMultipleOf30 {
                refresh_rate: settings.refresh_rate_hz,
            });
        }
        let frames_per_phase = u64::from(settings.refresh_rate_hz / 30);
        Ok(Self {
            settings,
            frames_per_phase,
        })
    }

    pub fn settings(&self) -> &CalibratorSettings {
        &self.settings
    }

    /// Spatial phase shown at `frame`, 0 or 1
    pub fn phase(&self, frame: u64) -> u8 {
        ((frame / self.frames_per_phase) % 2) as u8
    }

    /// Everything drawn on `frame` for the candidate gain `beta`
    pub fn frame_visuals(&self, frame: u64, beta: f64) -> Vec<Visual> {
        let color_a = self.settings.color_a.clamped();
        let color_b = self.settings.color_b.scale(beta).clamped();
        let phase = self.phase(frame);

        match self.settings.display {
            CalibrationDisplay::Checkerboard => {
                let pitch = self.settings.field_size / CHECKERBOARD_CELLS as f64;
                let cell = pitch / CELL_GAP_RATIO;
                let offset = (CHECKERBOARD_CELLS as f64 - 1.0) / 2.0;

                let mut cells = Vec::with_capacity(CHECKERBOARD_CELLS * CHECKERBOARD_CELLS);
                for xi in 0..CHECKERBOARD_CELLS {
                    for yi in 0..CHECKERBOARD_CELLS {
                        let pos = ((xi as f64 - offset) * pitch, (yi as f64 - offset) * pitch);
                        let even = (xi + yi) % 2 == 0;
                        let fill = if even == (phase == 0) { color_b } else { color_a };
                        cells.push(Visual::Shape(Shape::filled_square(pos, cell, fill)));
                    }
                }
                cells
            }
            CalibrationDisplay::SingleSquare => {
                let fill = if phase == 0 { color_a } else { color_b };
                vec![Visual::Shape(Shape::filled_square(
                    (0.0, 0.0),
                    self.settings.field_size / 3.0,
                    fill,
                ))]
            }
        }
    }

    /// Run one round until the terminate key is pressed and return the gain
    ///
    /// `up`/`down` move the gain by `beta_increment`; when several keys arrive
    /// in one poll only the first of up, down, terminate applies. The gain is
    /// not clamped.
    pub fn run_calibration_trial(
        &self,
        renderer: &mut dyn Renderer,
        input: &mut dyn InputSource,
    ) -> f64 {
        let keys = &self.settings.keys;
        let mut beta = self.settings.beta_0;
        let mut frame: u64 = 0;

        input.clear();
        renderer.set_background_color(self.settings.background);

        loop {
            for visual in self.frame_visuals(frame, beta) {
                visual.draw(renderer);
            }
            renderer.flip();

            let pressed = input.poll_pressed_keys();
            if pressed.contains(&keys.up) {
                beta += self.settings.beta_increment;
            } else if pressed.contains(&keys.down) {
                beta -= self.settings.beta_increment;
            } else if pressed.contains(&keys.terminate) {
                log::debug!(
                    "[Calibrator] Round finished after {} frames with beta {:.4}",
                    frame + 1,
                    beta
                );
                return beta;
            }

            frame += 1;
        }
    }
}
