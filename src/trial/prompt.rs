// Blocking prompts: rating slider and instruction text

use crate::display::{first_matching, Rgb, TextStim, Visual};
use crate::error::ConfigError;
use crate::trial::{ResponseRecord, TrialContext, TrialRecord};

const PROMPT_LETTER_HEIGHT: f64 = 28.0;
const TICK_LETTER_HEIGHT: f64 = 20.0;
const TICK_SPACING: f64 = 120.0;

/// Discrete rating scale moved with two keys and confirmed with a third
#[derive(Debug, Clone)]
pub struct SliderSpec {
    pub prompt: String,
    pub ticks: Vec<String>,
    pub start: usize,
    pub left_key: String,
    pub right_key: String,
    pub confirm_key: String,
}

impl SliderSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks.is_empty() {
            return Err(ConfigError::invalid_parameter("slider ticks", 0));
        }
        if self.start >= self.ticks.len() {
            return Err(ConfigError::invalid_parameter("slider start", self.start));
        }
        if self.confirm_key.is_empty() {
            return Err(ConfigError::invalid_parameter("slider confirm key", "''"));
        }
        Ok(())
    }

    fn visuals(&self, selected: usize) -> Vec<Visual> {
        let first_x = -TICK_SPACING * (self.ticks.len() as f64 - 1.0) / 2.0;
        let mut visuals = vec![Visual::Text(TextStim::new(
            self.prompt.clone(),
            (0.0, 150.0),
            PROMPT_LETTER_HEIGHT,
            Rgb::WHITE,
        ))];
        for (index, tick) in self.ticks.iter().enumerate() {
            let pos = (first_x + TICK_SPACING * index as f64, 0.0);
            let text = TextStim::new(tick.clone(), pos, TICK_LETTER_HEIGHT, Rgb::WHITE);
            visuals.push(Visual::Text(if index == selected {
                text.with_fill(Rgb::new(0.3, 0.3, 0.3))
            } else {
                text
            }));
        }
        visuals
    }
}

/// Instruction screen dismissed by any continue key
#[derive(Debug, Clone)]
pub struct TextSpec {
    pub text: String,
    pub continue_keys: Vec<String>,
}

impl TextSpec {
    pub fn new(text: impl Into<String>, continue_keys: Vec<String>) -> Self {
        Self {
            text: text.into(),
            continue_keys,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.continue_keys.is_empty() {
            return Err(ConfigError::invalid_parameter("continue_keys", "[]"));
        }
        Ok(())
    }
}

/// Move the slider until the confirm key; keys in one poll apply in order
pub fn run_slider(ctx: &mut TrialContext<'_>, spec: &SliderSpec, record: &mut TrialRecord) {
    let last = spec.ticks.len().saturating_sub(1);
    let mut selected = spec.start.min(last);
    let mut frame: u32 = 0;
    ctx.input.clear();

    loop {
        for visual in spec.visuals(selected) {
            visual.draw(ctx.renderer);
        }
        ctx.renderer.flip();

        for key in ctx.input.poll_pressed_keys() {
            if key == spec.confirm_key {
                record.terminated_by = key;
                record.termination_frame = frame;
                record.responses.push(ResponseRecord::Slider {
                    value: selected,
                    label: spec.ticks[selected].clone(),
                });
                return;
            }
            if key == spec.left_key {
                selected = selected.saturating_sub(1);
            } else if key == spec.right_key {
                selected = (selected + 1).min(last);
            }
        }
        frame = frame.saturating_add(1);
    }
}

/// Show text until a continue key
pub fn run_text(ctx: &mut TrialContext<'_>, spec: &TextSpec, record: &mut TrialRecord) {
    let text = Visual::Text(TextStim::new(
        spec.text.clone(),
        (0.0, 0.0),
        PROMPT_LETTER_HEIGHT,
        Rgb::WHITE,
    ));
    let mut frame: u32 = 0;
    ctx.input.clear();

    loop {
        text.draw(ctx.renderer);
        ctx.renderer.flip();

        let pressed = ctx.input.poll_pressed_keys();
        if let Some(button) = first_matching(&pressed, &spec.continue_keys) {
            record.terminated_by = button.clone();
            record.termination_frame = frame;
            record.responses.push(ResponseRecord::Acknowledged {
                button: button.clone(),
            });
            return;
        }
        frame = frame.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider() -> SliderSpec {
        SliderSpec {
            prompt: "How visible was the grating?".to_string(),
            ticks: vec!["none".to_string(), "weak".to_string(), "clear".to_string()],
            start: 1,
            left_key: "left".to_string(),
            right_key: "right".to_string(),
            confirm_key: "space".to_string(),
        }
    }

    #[test]
    fn test_slider_validation() {
        assert!(slider().validate().is_ok());
        let mut spec = slider();
        spec.start = 3;
        assert!(spec.validate().is_err());
        spec.ticks.clear();
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_selected_tick_is_highlighted() {
        let visuals = slider().visuals(2);
        assert_eq!(visuals.len(), 4);
        let highlighted: Vec<&str> = visuals
            .iter()
            .filter_map(|v| match v {
                Visual::Text(text) if text.fill.is_some() => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(highlighted, vec!["clear"]);
    }

    #[test]
    fn test_text_needs_continue_key() {
        assert!(TextSpec::new("Welcome", Vec::new()).validate().is_err());
        assert!(TextSpec::new("Welcome", vec!["space".to_string()]).validate().is_ok());
    }
}
