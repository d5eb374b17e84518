//! Synthesize step - builds the page's visual clip.

use super::page_scratch;
use crate::assembly::{require_audio, synthesizer_for, DurationProbe, RevealSynthesizer, StageError};
use crate::models::{PageStatus, PageUnit, SynthesisMode};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PageStep;
use crate::orchestrator::types::Context;

/// Produces the visual clip for a page (still image or reveal).
pub struct SynthesizeStep;

impl SynthesizeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SynthesizeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStep for SynthesizeStep {
    fn name(&self) -> &str {
        "Synthesize"
    }

    fn produces(&self) -> PageStatus {
        PageStatus::Synthesized
    }


    fn validate_input(&self, ctx: &Context, page: &PageUnit) -> StepResult<()> {
        require_audio(page)?;

        let has_visual = match ctx.settings.assembly.synthesis {
            SynthesisMode::Still => page.image.as_ref().is_some_and(|i| i.exists()),
            SynthesisMode::Reveal => {
                page.animation.as_ref().is_some_and(|a| a.exists())
                    || !RevealSynthesizer::frame_order(page).is_empty()
            }
        };
        if !has_visual {
            let path = page.image.as_ref().map(|i| i.path.clone());
            return Err(StageError::missing(page.page_number, "slide image", path).into());
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, page: &mut PageUnit) -> StepResult<()> {
        let scratch = page_scratch(ctx, page)?;
        let transcoder = ctx.transcoder.as_ref();

        // Probe once; later stages read the cached value
        if let Some(audio) = page.audio.as_mut() {
            let secs = DurationProbe::new(transcoder)
                .probe_asset(audio)
                .map_err(StageError::from)?;
            ctx.debug_page(page.page_number, &format!("narration is {:.3}s", secs));
        }

        let assembly = &ctx.settings.assembly;
        let synthesizer =
            synthesizer_for(assembly.synthesis, transcoder, assembly.reveal_step_secs);
        let clip = synthesizer.synthesize(page, &scratch)?;

        ctx.debug_page(
            page.page_number,
            &format!("{} clip {}", synthesizer.mode(), clip.display_name()),
        );
        page.clip = Some(clip);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        match page.clip.as_ref() {
            Some(clip) if clip.exists() => Ok(()),
            _ => Err(StepError::invalid_output("synthesized clip was not written")),
        }
    }
}
