//! Transition step - fades the verified clip in and out.

use super::{existing_clip, page_scratch};
use crate::assembly::TransitionEncoder;
use crate::models::{PageStatus, PageUnit};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PageStep;
use crate::orchestrator::types::Context;

/// Writes a faded copy of the page clip into the page scratch directory.
/// The per-page output clip itself is left without fades.
pub struct TransitionStep;

impl TransitionStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TransitionStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStep for TransitionStep {
    fn name(&self) -> &str {
        "Transition"
    }

    fn produces(&self) -> PageStatus {
        PageStatus::Transitioned
    }


    fn validate_input(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        existing_clip(page)?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, page: &mut PageUnit) -> StepResult<()> {
        let clip = existing_clip(page)?;
        let scratch = page_scratch(ctx, page)?;
        let output = scratch.join(format!(
            "faded_page_{}.{}",
            page.page_number, ctx.settings.paths.clip_extension
        ));

        let encoder = TransitionEncoder::new(
            ctx.transcoder.as_ref(),
            ctx.settings.assembly.fade_duration_secs,
        );
        let (faded, plan) = encoder.apply(&clip, &output)?;

        if plan.adapted {
            ctx.log_page(
                page.page_number,
                &format!(
                    "clip of {:.3}s is short, fades shortened to {:.3}s",
                    plan.clip_secs, plan.fade_in_secs
                ),
            );
        }

        page.faded = Some(faded);
        page.fade = Some(plan);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        match page.faded.as_ref() {
            Some(faded) if faded.exists() => Ok(()),
            _ => Err(StepError::invalid_output("faded clip was not written")),
        }
    }
}
