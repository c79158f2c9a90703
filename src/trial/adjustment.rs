// Manual contrast adjustment
//
// The participant nudges the stimulus contrast with two keys while it
// flickers on and off in fixed frame groups. Every change re-derives the
// colour B gain (beta polynomial) and background luminance (kappa polynomial).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::calibration::GainFunctions;
use crate::display::{Shape, Side, Visual};
use crate::error::ConfigError;
use crate::stimulus::{AdjustedColors, ColorModel};
use crate::trial::{ResponseRecord, TrialContext, TrialRecord};

/// Adjusted contrast plus the colours derived from it
#[derive(Debug, Clone)]
pub struct AdjustmentController {
    alpha: f64,
    step: f64,
    gamma: f64,
    model: ColorModel,
    gains: GainFunctions,
    colors: AdjustedColors,
}

impl AdjustmentController {
    pub fn new(model: ColorModel, gains: GainFunctions, alpha: f64, step: f64, gamma: f64) -> Self {
        let alpha = alpha.clamp(0.0, gamma);
        let colors = model.colors_at(alpha, &gains);
        Self {
            alpha,
            step,
            gamma,
            model,
            gains,
            colors,
        }
    }

    /// Start from `alpha` shifted by a uniform draw in `[-jitter, jitter]`
    ///
    /// The draw comes from a generator seeded for this trial only, so the
    /// starting point is reproducible from the seed.
    pub fn with_jitter(
        model: ColorModel,
        gains: GainFunctions,
        alpha: f64,
        jitter: f64,
        seed: u64,
        step: f64,
        gamma: f64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let offset = if jitter > 0.0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        Self::new(model, gains, alpha + offset, step, gamma)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn colors(&self) -> &AdjustedColors {
        &self.colors
    }

    pub fn increase(&mut self) -> &AdjustedColors {
        self.set_alpha(self.alpha + self.step)
    }

    pub fn decrease(&mut self) -> &AdjustedColors {
        self.set_alpha(self.alpha - self.step)
    }

    fn set_alpha(&mut self, alpha: f64) -> &AdjustedColors {
        self.alpha = alpha.clamp(0.0, self.gamma);
        self.colors = self.model.colors_at(self.alpha, &self.gains);
        &self.colors
    }
}

/// Adjustment trial data
#[derive(Debug, Clone)]
pub struct AdjustmentSpec {
    pub controller: AdjustmentController,
    pub increase_key: String,
    pub decrease_key: String,
    pub terminate_key: Option<String>,
    /// Frames per on/off flicker group
    pub flicker_period_frames: u32,
}

impl AdjustmentSpec {
    pub fn validate(&self, trial_id: &str) -> Result<(), ConfigError> {
        match self.terminate_key.as_deref() {
            Some(key) if !key.is_empty() => {}
            _ => {
                return Err(ConfigError::MissingTerminationKey {
                    trial_id: trial_id.to_string(),
                })
            }
        }
        if self.flicker_period_frames == 0 {
            return Err(ConfigError::invalid_parameter("flicker_period_frames", 0));
        }
        Ok(())
    }

    /// Stimulus is drawn on even flicker groups
    pub fn is_visible(&self, frame: u32) -> bool {
        (frame / self.flicker_period_frames) % 2 == 0
    }
}

/// Run the adjustment loop until the terminate key
///
/// The terminate key is checked before the adjustment keys of the same poll.
pub fn run_adjustment(
    ctx: &mut TrialContext<'_>,
    spec: &mut AdjustmentSpec,
    record: &mut TrialRecord,
) -> Result<(), ConfigError> {
    spec.validate(&record.trial_id)?;
    let terminate_key = spec.terminate_key.clone().unwrap_or_default();
    let size = ctx.layout.square_size;

    let mut key_presses = 0;
    let mut frame: u32 = 0;
    ctx.input.clear();

    loop {
        let colors = *spec.controller.colors();
        ctx.renderer.set_background_color(colors.background);
        for side in Side::BOTH {
            let support = Shape::filled_square(ctx.layout.center(side), size, colors.background);
            Visual::Shape(support).draw(ctx.renderer);
        }
        ctx.scene.draw(ctx.renderer);
        if spec.is_visible(frame) {
            let pairs = [(Side::Left, colors.color_a), (Side::Right, colors.color_b)];
            for (side, color) in pairs {
                let patch = Shape::filled_square(ctx.layout.center(side), size / 2.0, color);
                Visual::Shape(patch).draw(ctx.renderer);
            }
        }
        ctx.renderer.flip();

        let pressed = ctx.input.poll_pressed_keys();
        if pressed.contains(&terminate_key) {
            record.terminated_by = terminate_key;
            record.termination_frame = frame;
            record.responses.push(ResponseRecord::Adjustment {
                value: spec.controller.alpha(),
                key_presses,
            });
            log::info!(
                "[Adjustment] {} settled at alpha {:.4} after {} key presses",
                record.trial_id,
                spec.controller.alpha(),
                key_presses
            );
            return Ok(());
        }

        for key in &pressed {
            if *key == spec.increase_key {
                spec.controller.increase();
                key_presses += 1;
            } else if *key == spec.decrease_key {
                spec.controller.decrease();
                key_presses += 1;
            }
        }
        frame = frame.saturating_add(1);
    }
}
