//! Reconcile step - matches the clip length to the narration.

use std::fs;

use super::{existing_clip, output_clip_path, page_scratch};
use crate::assembly::{require_audio, DurationReconciler};
use crate::models::{PageStatus, PageUnit, Reconciliation};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PageStep;
use crate::orchestrator::types::Context;

/// Trims or extends the synthesized clip and writes the per-page output
/// clip into the clip folder.
pub struct ReconcileStep;

impl ReconcileStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReconcileStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStep for ReconcileStep {
    fn name(&self) -> &str {
        "Reconcile"
    }

    fn produces(&self) -> PageStatus {
        PageStatus::Reconciled
    }


    fn validate_input(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        existing_clip(page)?;
        require_audio(page)?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, page: &mut PageUnit) -> StepResult<()> {
        let visual = existing_clip(page)?;
        let audio = require_audio(page)?.clone();
        let scratch = page_scratch(ctx, page)?;

        let output = output_clip_path(&ctx.settings, page.page_number);
        if let Some(clip_dir) = output.parent() {
            fs::create_dir_all(clip_dir)
                .map_err(|e| StepError::io_error("creating clip directory", e))?;
        }

        let reconciler = DurationReconciler::new(ctx.transcoder.as_ref(), &ctx.settings.assembly);
        let (clip, reconciliation) = reconciler.reconcile(&visual, &audio, &scratch, &output)?;

        let message = match &reconciliation {
            Reconciliation::Trimmed {
                visual_secs,
                audio_secs,
                result_secs,
            } => format!(
                "visual {:.3}s, audio {:.3}s: trimmed to {:.3}s",
                visual_secs, audio_secs, result_secs
            ),
            Reconciliation::Extended {
                visual_secs,
                audio_secs,
                extend_secs,
                strategy,
                used_fallback,
                ..
            } => format!(
                "visual {:.3}s, audio {:.3}s: held last frame {:.3}s ({}{})",
                visual_secs,
                audio_secs,
                extend_secs,
                strategy,
                if *used_fallback { ", fallback" } else { "" }
            ),
        };
        ctx.log_page(page.page_number, &message);

        page.clip = Some(clip);
        page.reconciliation = Some(reconciliation);
        Ok(())
    }

    fn validate_output(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
        if page.reconciliation.is_none() {
            return Err(StepError::invalid_output("reconciliation not recorded"));
        }
        existing_clip(page)
            .map(|_| ())
            .map_err(|_| StepError::invalid_output("reconciled clip was not written"))
    }
}
