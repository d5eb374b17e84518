//! Verify step - makes sure the clip carries audio.

use super::{existing_clip, page_scratch};
use crate::assembly::{require_audio, AudioEmbedVerifier};
use crate::models::{PageStatus, PageUnit};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PageStep;
use crate::orchestrator::types::Context;

/// Checks the reconciled clip for an audio stream and repairs it by
/// remuxing the narration when it is missing.
pub struct VerifyStep;

impl VerifyStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VerifyStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStep for VerifyStep {
    fn name(&self) -> &str {
        "Verify"
    }

    fn produces(&self) -> PageStatus {
        PageStatus::Verified
    }


    fn validate_input(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        existing_clip(page)?;
        require_audio(page)?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, page: &mut PageUnit) -> StepResult<()> {
        let clip = existing_clip(page)?;
        let narration = require_audio(page)?.path.clone();
        let scratch = page_scratch(ctx, page)?;

        let verification =
            AudioEmbedVerifier::new(ctx.transcoder.as_ref()).verify(&clip, &narration, &scratch)?;
        if verification.repaired {
            ctx.log_page(page.page_number, "audio stream was missing, repaired by remux");
        }
        page.audio_repaired |= verification.repaired;
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        existing_clip(page)
            .map(|_| ())
            .map_err(|_| StepError::invalid_output("verified clip is gone"))
    }
}
