// StaircaseEngine - dual interleaved up/down staircase
//
// Two sequences start symmetrically around a suggested contrast. Each trial
// picks one of them at random and steps it up on a "yes" and down on a "no".
// The threshold is the mean of both sequence estimates once both converge.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ContrastConfig, StaircaseConfig};
use crate::error::ConfigError;
use crate::staircase::sequence::{SequenceName, StaircaseSequence};
use crate::telemetry;

/// Staircase parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseSettings {
    pub suggested_alpha: f64,
    pub exploration_range: f64,
    pub alpha_increment: f64,
    pub n_reversals: usize,
    pub gamma: f64,
}

impl StaircaseSettings {
    pub fn from_config(staircase: &StaircaseConfig, contrast: &ContrastConfig) -> Self {
        Self {
            suggested_alpha: staircase.suggested_alpha,
            exploration_range: staircase.exploration_range,
            alpha_increment: staircase.alpha_increment,
            n_reversals: staircase.n_reversals,
            gamma: contrast.gamma,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_reversals == 0 {
            return Err(ConfigError::invalid_parameter("n_reversals", 0));
        }
        if !(self.alpha_increment > 0.0) {
            return Err(ConfigError::invalid_parameter(
                "alpha_increment",
                self.alpha_increment,
            ));
        }
        if !(self.gamma > 0.0) {
            return Err(ConfigError::invalid_parameter("gamma", self.gamma));
        }
        Ok(())
    }
}

/// Sequence and contrast chosen for the next trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaircasePick {
    pub sequence: SequenceName,
    pub alpha: f64,
}

/// One answered staircase trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseStep {
    pub step: usize,
    pub sequence: SequenceName,
    pub alpha: f64,
    pub detected: bool,
    pub next_alpha: f64,
}

/// Serialisable record of a finished (or interrupted) staircase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseReport {
    pub settings: StaircaseSettings,
    pub swiss: Vec<f64>,
    pub dutch: Vec<f64>,
    pub swiss_estimate: Option<f64>,
    pub dutch_estimate: Option<f64>,
    pub threshold: Option<f64>,
    pub history: Vec<StaircaseStep>,
}

/// Dual staircase state
#[derive(Debug, Clone)]
pub struct StaircaseEngine {
    settings: StaircaseSettings,
    swiss: StaircaseSequence,
    dutch: StaircaseSequence,
    history: Vec<StaircaseStep>,
}

impl StaircaseEngine {
    /// Seed Swiss at `suggested + range / 2` and Dutch at `suggested - range / 2`
    pub fn new(settings: StaircaseSettings) -> Result<Self, ConfigError> {
        settings.validate()?;

        let half_range = settings.exploration_range / 2.0;
        let swiss = StaircaseSequence::new(
            SequenceName::Swiss,
            settings.suggested_alpha + half_range,
            settings.gamma,
        );
        let dutch = StaircaseSequence::new(
            SequenceName::Dutch,
            settings.suggested_alpha - half_range,
            settings.gamma,
        );

        log::info!(
            "[Staircase] Starting at swiss={:.4} dutch={:.4} (n_reversals={})",
            swiss.current(),
            dutch.current(),
            settings.n_reversals
        );

        Ok(Self {
            settings,
            swiss,
            dutch,
            history: Vec::new(),
        })
    }

    pub fn settings(&self) -> &StaircaseSettings {
        &self.settings
    }

    pub fn sequence(&self, name: SequenceName) -> &StaircaseSequence {
        match name {
            SequenceName::Swiss => &self.swiss,
            SequenceName::Dutch => &self.dutch,
        }
    }

    fn sequence_mut(&mut self, name: SequenceName) -> &mut StaircaseSequence {
        match name {
            SequenceName::Swiss => &mut self.swiss,
            SequenceName::Dutch => &mut self.dutch,
        }
    }

    pub fn history(&self) -> &[StaircaseStep] {
        &self.history
    }

    /// Pick a sequence uniformly at random and return its current value
    pub fn next_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> StaircasePick {
        let sequence = if rng.gen_bool(0.5) {
            SequenceName::Swiss
        } else {
            SequenceName::Dutch
        };
        StaircasePick {
            sequence,
            alpha: self.sequence(sequence).current(),
        }
    }

    /// Step `name` up on detection and down otherwise
    ///
    /// # Returns
    /// The converged threshold once both sequences have an estimate
    pub fn record_response(&mut self, name: SequenceName, detected: bool) -> Option<f64> {
        let increment = self.settings.alpha_increment;
        let gamma = self.settings.gamma;
        let step = self.history.len();

        let sequence = self.sequence_mut(name);
        let alpha = sequence.current();
        let next = if detected {
            alpha + increment
        } else {
            alpha - increment
        };
        let next_alpha = sequence.push_clamped(next, gamma);

        self.history.push(StaircaseStep {
            step,
            sequence: name,
            alpha,
            detected,
            next_alpha,
        });

        log::debug!(
            "[Staircase] step {} {}: {:.5} -> {:.5} (detected={}, reversals={})",
            step,
            name,
            alpha,
            next_alpha,
            detected,
            self.sequence(name).reversal_count()
        );
        telemetry::hub().record_staircase_step(name, alpha, detected, next_alpha);

        let threshold = self.converged_threshold();
        if let Some(threshold) = threshold {
            log::info!(
                "[Staircase] Converged after {} steps: threshold={:.5}",
                self.history.len(),
                threshold
            );
            telemetry::hub().record_staircase_converged(threshold, self.history.len());
        }
        threshold
    }

    /// Per-sequence estimate, recomputed from the current values
    pub fn sequence_estimate(&self, name: SequenceName) -> Option<f64> {
        self.sequence(name).estimate(self.settings.n_reversals)
    }

    /// Mean of both sequence estimates, or `None` while either is missing
    pub fn converged_threshold(&self) -> Option<f64> {
        let swiss = self.sequence_estimate(SequenceName::Swiss)?;
        let dutch = self.sequence_estimate(SequenceName::Dutch)?;
        Some((swiss + dutch) / 2.0)
    }

    /// Drive trials until both sequences converge
    ///
    /// `respond` presents the picked contrast and reports whether the stimulus
    /// was detected. There is no trial cap; errors from `respond` abort.
    pub fn run_until_converged<R, E, F>(&mut self, rng: &mut R, mut respond: F) -> Result<f64, E>
    where
        R: Rng + ?Sized,
        F: FnMut(StaircasePick) -> Result<bool, E>,
    {
        loop {
            let pick = self.next_trial(rng);
            let detected = respond(pick)?;
            if let Some(threshold) = self.record_response(pick.sequence, detected) {
                return Ok(threshold);
            }
        }
    }

    pub fn report(&self) -> StaircaseReport {
        StaircaseReport {
            settings: self.settings.clone(),
            swiss: self.swiss.values().to_vec(),
            dutch: self.dutch.values().to_vec(),
            swiss_estimate: self.sequence_estimate(SequenceName::Swiss),
            dutch_estimate: self.sequence_estimate(SequenceName::Dutch),
            threshold: self.converged_threshold(),
            history: self.history.clone(),
        }
    }
}
