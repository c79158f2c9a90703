// Timed presentation phase

use crate::display::first_matching;
use crate::stimulus::TimedStimulus;
use crate::trial::{TrialContext, TrialPhase, DEFAULT_TERMINATION};

/// Presentation window of a trial
#[derive(Debug, Clone)]
pub struct PresentationSpec {
    /// Frames before the trial times out
    pub max_duration: u32,
    pub stimulus: TimedStimulus,
    /// Buttons that end the presentation early; empty means always time out
    pub termination_buttons: Vec<String>,
}

impl PresentationSpec {
    pub fn new(max_duration: u32, stimulus: TimedStimulus, termination_buttons: Vec<String>) -> Self {
        Self {
            max_duration,
            stimulus,
            termination_buttons,
        }
    }
}

/// How the presentation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationOutcome {
    pub phase: TrialPhase,
    pub terminated_by: String,
    pub termination_frame: u32,
}

/// Draw the scene for up to `max_duration` frames
///
/// Support squares go first, then the shared scene, then the stimulus while
/// `frame` is inside `[onset, onset + duration)`. The first configured
/// termination button moves the trial to `Response`.
pub fn run_presentation(ctx: &mut TrialContext<'_>, spec: &PresentationSpec) -> PresentationOutcome {
    let stimulus = &spec.stimulus;
    ctx.input.clear();

    for frame in 0..spec.max_duration {
        for visual in &stimulus.support {
            visual.draw(ctx.renderer);
        }
        ctx.scene.draw(ctx.renderer);
        if stimulus.is_visible(frame) {
            for visual in &stimulus.visuals {
                visual.draw(ctx.renderer);
            }
        }
        ctx.renderer.flip();

        let pressed = ctx.input.poll_pressed_keys();
        if let Some(button) = first_matching(&pressed, &spec.termination_buttons) {
            log::debug!("[Trial] Presentation ended by '{}' at frame {}", button, frame);
            return PresentationOutcome {
                phase: TrialPhase::Response,
                terminated_by: button.clone(),
                termination_frame: frame,
            };
        }
    }

    PresentationOutcome {
        phase: TrialPhase::TimedOut,
        terminated_by: DEFAULT_TERMINATION.to_string(),
        termination_frame: spec.max_duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::display::{SceneTemplate, Shape, SquareLayout, Visual};
    use crate::display::Rgb;
    use crate::testing::{RecordingRenderer, ScriptedInput};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn marker_stimulus(onset: u32, duration: u32) -> TimedStimulus {
        TimedStimulus {
            onset,
            duration,
            support: Vec::new(),
            visuals: vec![Visual::Shape(Shape::filled_square((0.0, 0.0), 1.0, Rgb::WHITE))],
            record: None,
        }
    }

    fn fixtures() -> (SceneTemplate, SquareLayout) {
        let config = ExperimentConfig::default();
        let layout = SquareLayout::from_config(&config.screen, &config.visual);
        (SceneTemplate::empty(), layout)
    }

    #[test]
    fn test_times_out_at_max_duration() {
        let (scene, layout) = fixtures();
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(Vec::<Vec<&str>>::new());
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TrialContext {
            renderer: &mut renderer,
            input: &mut input,
            scene: &scene,
            layout: &layout,
            rng: &mut rng,
        };

        let spec = PresentationSpec::new(10, marker_stimulus(3, 2), Vec::new());
        let outcome = run_presentation(&mut ctx, &spec);

        assert_eq!(outcome.phase, TrialPhase::TimedOut);
        assert_eq!(outcome.terminated_by, "time_out");
        assert_eq!(outcome.termination_frame, 10);
        assert_eq!(renderer.flips(), 10);

        let visible: Vec<usize> = renderer
            .frames()
            .iter()
            .enumerate()
            .filter(|(_, frame)| !frame.shapes.is_empty())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(visible, vec![3, 4]);
    }

    #[test]
    fn test_first_configured_button_ends_presentation() {
        let (scene, layout) = fixtures();
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(vec![vec![], vec!["x"], vec!["q", "right", "left"]]);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TrialContext {
            renderer: &mut renderer,
            input: &mut input,
            scene: &scene,
            layout: &layout,
            rng: &mut rng,
        };

        let spec = PresentationSpec::new(
            100,
            TimedStimulus::blank(),
            vec!["left".to_string(), "right".to_string()],
        );
        let outcome = run_presentation(&mut ctx, &spec);

        assert_eq!(outcome.phase, TrialPhase::Response);
        assert_eq!(outcome.terminated_by, "right");
        assert_eq!(outcome.termination_frame, 2);
    }

    #[test]
    fn test_keys_ignored_without_termination_buttons() {
        let (scene, layout) = fixtures();
        let mut renderer = RecordingRenderer::new();
        let mut input = ScriptedInput::new(vec![vec!["left"], vec!["right"]]);
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = TrialContext {
            renderer: &mut renderer,
            input: &mut input,
            scene: &scene,
            layout: &layout,
            rng: &mut rng,
        };

        let outcome = run_presentation(&mut ctx, &PresentationSpec::new(5, TimedStimulus::blank(), Vec::new()));
        assert_eq!(outcome.phase, TrialPhase::TimedOut);
        assert_eq!(outcome.termination_frame, 5);
    }
}
