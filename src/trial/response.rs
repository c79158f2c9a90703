// Two-choice response collection

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{validate_response, ResponseConfig};
use crate::display::{first_matching, Rgb, Side, TextStim, Visual};
use crate::error::ConfigError;
use crate::trial::{ResponseRecord, TrialContext};

/// Button to label assignment for one report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMapping {
    report: String,
    buttons: Vec<String>,
    labels: Vec<String>,
}

impl ResponseMapping {
    /// Validate the configured pair and shuffle labels when requested
    pub fn new<R: Rng + ?Sized>(config: &ResponseConfig, rng: &mut R) -> Result<Self, ConfigError> {
        validate_response(config)?;
        let mut labels = config.response_labels.clone();
        if config.shuffle_mapping {
            labels.shuffle(rng);
        }
        Ok(Self {
            report: config.report.clone(),
            buttons: config.response_buttons.clone(),
            labels,
        })
    }

    pub fn buttons(&self) -> &[String] {
        &self.buttons
    }

    pub fn label_for(&self, button: &str) -> Option<&str> {
        self.buttons
            .iter()
            .position(|candidate| candidate == button)
            .map(|index| self.labels[index].as_str())
    }

    /// e.g. `"f if seen\nj if not seen"`
    pub fn instructions(&self) -> String {
        self.buttons
            .iter()
            .zip(self.labels.iter())
            .map(|(button, label)| format!("{} if {}", button, label))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Show the prompt in both squares and block until one of the two buttons
pub fn collect_response(
    ctx: &mut TrialContext<'_>,
    config: &ResponseConfig,
) -> Result<ResponseRecord, ConfigError> {
    let mapping = ResponseMapping::new(config, &mut *ctx.rng)?;
    let letter_height = (ctx.layout.square_size / 8.0).trunc();

    let mut prompt = Vec::with_capacity(4);
    for side in Side::BOTH {
        prompt.push(Visual::Text(TextStim::new(
            config.question_icon_text.clone(),
            ctx.layout.lining(side, true),
            letter_height,
            Rgb::BLACK,
        )));
        prompt.push(Visual::Text(TextStim::new(
            mapping.instructions(),
            ctx.layout.lining(side, false),
            letter_height,
            Rgb::BLACK,
        )));
    }

    ctx.input.clear();
    loop {
        for visual in &prompt {
            visual.draw(ctx.renderer);
        }
        ctx.scene.draw(ctx.renderer);
        ctx.renderer.flip();

        let pressed = ctx.input.poll_pressed_keys();
        if let Some(button) = first_matching(&pressed, mapping.buttons()) {
            let label = mapping.label_for(button).unwrap_or_default().to_string();
            log::debug!(
                "[Trial] {} report: '{}' -> '{}'",
                mapping.report,
                button,
                label
            );
            return Ok(ResponseRecord::Choice {
                report: mapping.report.clone(),
                button: button.clone(),
                label,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::display::{SceneTemplate, SquareLayout};
    use crate::testing::{RecordingRenderer, ScriptedInput};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unshuffled() -> ResponseConfig {
        ResponseConfig {
            shuffle_mapping: false,
            ..ResponseConfig::detection()
        }
    }

    #[test]
    fn test_fixed_mapping_follows_config_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let mapping = ResponseMapping::new(&unshuffled(), &mut rng).unwrap();
        assert_eq!(mapping.label_for("f"), Some("seen"));
        assert_eq!(mapping.label_for("j"), Some("not seen"));
        assert_eq!(mapping.label_for("k"), None);
        assert_eq!(mapping.instructions(), "f if seen\nj if not seen");
    }

    #[test]
    fn test_shuffled_mapping_is_a_permutation() {
        let mut seen_swapped = false;
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mapping = ResponseMapping::new(&ResponseConfig::detection(), &mut rng).unwrap();
            let f = mapping.label_for("f").unwrap();
            let j = mapping.label_for("j").unwrap();
            assert_ne!(f, j);
            seen_swapped |= f == "not seen";
        }
        assert!(seen_swapped);
    }

    #[test]
    fn test_waits_for_configured_button() {
        let config = ExperimentConfig::default();
        let layout = SquareLayout::from_config(&config.screen, &config.visual);
        let scene = SceneTemplate::dichoptic(&layout, &config.screen, &config.visual);
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(vec![vec![], vec!["space"], vec!["j"]]);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TrialContext {
            renderer: &mut renderer,
            input: &mut input,
            scene: &scene,
            layout: &layout,
            rng: &mut rng,
        };

        let record = collect_response(&mut ctx, &unshuffled()).unwrap();
        assert_eq!(
            record,
            ResponseRecord::Choice {
                report: "detection".to_string(),
                button: "j".to_string(),
                label: "not seen".to_string(),
            }
        );
        assert_eq!(renderer.flips(), 3);
        // two prompt lines per square plus the scene crosses
        assert_eq!(renderer.last_frame().unwrap().texts.len(), 6);
    }

    #[test]
    fn test_rejects_three_buttons() {
        let mut config = unshuffled();
        config.response_buttons.push("k".to_string());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(ResponseMapping::new(&config, &mut rng).is_err());
    }
}
