// Single trial driver
//
// Runs the phases enabled by the kind's capabilities in a fixed order:
// presentation, reports, adjustment, slider, text.

use crate::error::ConfigError;
use crate::trial::adjustment::run_adjustment;
use crate::trial::presentation::run_presentation;
use crate::trial::prompt::{run_slider, run_text};
use crate::trial::response::collect_response;
use crate::trial::{TrialContext, TrialKind, TrialPhase, TrialRecord};

/// Run one trial to completion and return its record
///
/// # Errors
/// Configuration errors are raised before the first frame is drawn.
pub fn run_trial(
    ctx: &mut TrialContext<'_>,
    trial_id: &str,
    kind: &mut TrialKind,
) -> Result<TrialRecord, ConfigError> {
    kind.validate(trial_id)?;

    let capabilities = kind.capabilities();
    let mut record = TrialRecord::new(trial_id, kind.label());
    let mut phase = TrialPhase::Idle;

    if capabilities.presentation {
        if let Some(presentation) = kind.presentation() {
            phase = TrialPhase::Presenting;
            log::trace!("[Trial] {} -> {:?}", trial_id, phase);
            record.stimulus = presentation.stimulus.record.clone();
            let outcome = run_presentation(ctx, presentation);
            phase = outcome.phase;
            record.terminated_by = outcome.terminated_by;
            record.termination_frame = outcome.termination_frame;
        }
    }

    if capabilities.reports {
        for report in kind.reports() {
            let response = collect_response(ctx, report)?;
            record.responses.push(response);
        }
    }

    match kind {
        TrialKind::Adjustment(spec) if capabilities.adjustment => {
            phase = TrialPhase::Response;
            run_adjustment(ctx, spec, &mut record)?;
        }
        TrialKind::Slider(spec) if capabilities.slider => {
            phase = TrialPhase::Response;
            run_slider(ctx, spec, &mut record);
        }
        TrialKind::Text(spec) if capabilities.text => {
            phase = TrialPhase::Response;
            run_text(ctx, spec, &mut record);
        }
        _ => {}
    }

    log::debug!(
        "[Trial] {} ({}) finished in {:?}: terminated_by={} frame={}",
        record.trial_id,
        record.kind,
        phase,
        record.terminated_by,
        record.termination_frame
    );
    Ok(record)
}
