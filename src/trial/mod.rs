//! Frame-synchronous trial state machine.
//!
//! A trial moves `Idle -> Presenting -> (Response | TimedOut)`. Every kind of
//! trial is one [`TrialKind`] variant carrying its own data; a single driver
//! ([`run_trial`]) reads the variant's [`TrialCapabilities`] to decide which
//! phases run. Each frame is render, blocking flip, poll.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::{validate_response, ResponseConfig};
use crate::display::{InputSource, Renderer, SceneTemplate, SquareLayout};
use crate::error::ConfigError;
use crate::stimulus::StimulusRecord;

pub mod adjustment;
pub mod driver;
pub mod presentation;
pub mod prompt;
pub mod response;

pub use adjustment::{AdjustmentController, AdjustmentSpec};
pub use driver::run_trial;
pub use presentation::{PresentationOutcome, PresentationSpec};
pub use prompt::{SliderSpec, TextSpec};
pub use response::ResponseMapping;

/// Termination cause recorded when no button ends the presentation
pub const DEFAULT_TERMINATION: &str = "time_out";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    Idle,
    Presenting,
    Response,
    TimedOut,
}

/// Borrowed collaborators shared by every phase of a trial
pub struct TrialContext<'a> {
    pub renderer: &'a mut dyn Renderer,
    pub input: &'a mut dyn InputSource,
    pub scene: &'a SceneTemplate,
    pub layout: &'a SquareLayout,
    pub rng: &'a mut dyn RngCore,
}

/// Which phases a trial kind runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrialCapabilities {
    /// Timed presentation over the dichoptic scene
    pub presentation: bool,
    /// Two-choice reports after the presentation
    pub reports: bool,
    /// Continuous adjustment with a dedicated terminate key
    pub adjustment: bool,
    /// Discrete rating scale
    pub slider: bool,
    /// Static text waiting for a continue key
    pub text: bool,
}

/// Every supported trial, with its kind-specific data
#[derive(Debug, Clone)]
pub enum TrialKind {
    Detection {
        presentation: PresentationSpec,
        report: ResponseConfig,
    },
    Discrimination {
        presentation: PresentationSpec,
        detection: ResponseConfig,
        discrimination: ResponseConfig,
    },
    /// Independent left/right content ended by a button
    Stereo {
        presentation: PresentationSpec,
    },
    Adjustment(AdjustmentSpec),
    Slider(SliderSpec),
    Text(TextSpec),
}

impl TrialKind {
    pub fn capabilities(&self) -> TrialCapabilities {
        match self {
            TrialKind::Detection { .. } | TrialKind::Discrimination { .. } => TrialCapabilities {
                presentation: true,
                reports: true,
                ..Default::default()
            },
            TrialKind::Stereo { .. } => TrialCapabilities {
                presentation: true,
                ..Default::default()
            },
            TrialKind::Adjustment(_) => TrialCapabilities {
                adjustment: true,
                ..Default::default()
            },
            TrialKind::Slider(_) => TrialCapabilities {
                slider: true,
                ..Default::default()
            },
            TrialKind::Text(_) => TrialCapabilities {
                text: true,
                ..Default::default()
            },
        }
    }

    /// Name stored in the trial record
    pub fn label(&self) -> &'static str {
        match self {
            TrialKind::Detection { .. } => "detection",
            TrialKind::Discrimination { .. } => "discrimination",
            TrialKind::Stereo { .. } => "stereo",
            TrialKind::Adjustment(_) => "adjustment",
            TrialKind::Slider(_) => "slider",
            TrialKind::Text(_) => "text",
        }
    }

    pub fn presentation(&self) -> Option<&PresentationSpec> {
        match self {
            TrialKind::Detection { presentation, .. }
            | TrialKind::Discrimination { presentation, .. }
            | TrialKind::Stereo { presentation } => Some(presentation),
            _ => None,
        }
    }

    /// Reports in the order they are asked
    pub fn reports(&self) -> Vec<&ResponseConfig> {
        match self {
            TrialKind::Detection { report, .. } => vec![report],
            TrialKind::Discrimination {
                detection,
                discrimination,
                ..
            } => vec![detection, discrimination],
            _ => Vec::new(),
        }
    }

    /// Reject malformed trials before anything is drawn
    pub fn validate(&self, trial_id: &str) -> Result<(), ConfigError> {
        for report in self.reports() {
            validate_response(report)?;
        }
        match self {
            TrialKind::Adjustment(spec) => spec.validate(trial_id),
            TrialKind::Slider(spec) => spec.validate(),
            TrialKind::Text(spec) => spec.validate(),
            _ => Ok(()),
        }
    }
}

/// One collected answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseRecord {
    Choice {
        report: String,
        button: String,
        label: String,
    },
    Adjustment {
        value: f64,
        key_presses: usize,
    },
    Slider {
        value: usize,
        label: String,
    },
    Acknowledged {
        button: String,
    },
}

impl ResponseRecord {
    pub fn label(&self) -> Option<&str> {
        match self {
            ResponseRecord::Choice { label, .. } | ResponseRecord::Slider { label, .. } => {
                Some(label)
            }
            _ => None,
        }
    }
}

/// Persisted outcome of a trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_id: String,
    pub kind: String,
    pub terminated_by: String,
    pub termination_frame: u32,
    pub stimulus: Option<StimulusRecord>,
    pub responses: Vec<ResponseRecord>,
}

impl TrialRecord {
    pub fn new(trial_id: impl Into<String>, kind: &str) -> Self {
        Self {
            trial_id: trial_id.into(),
            kind: kind.to_string(),
            terminated_by: DEFAULT_TERMINATION.to_string(),
            termination_frame: 0,
            stimulus: None,
            responses: Vec::new(),
        }
    }

    /// Label of the first choice made for `report`
    pub fn choice(&self, report: &str) -> Option<&str> {
        self.responses.iter().find_map(|response| match response {
            ResponseRecord::Choice {
                report: name,
                label,
                ..
            } if name == report => Some(label.as_str()),
            _ => None,
        })
    }
}
