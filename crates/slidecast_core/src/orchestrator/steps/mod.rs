//! Page step implementations.
//!
//! Each step handles one transition of the page state machine.

mod reconcile;
mod synthesize;
mod transition;
mod verify;

pub use reconcile::ReconcileStep;
pub use synthesize::SynthesizeStep;
pub use transition::TransitionStep;
pub use verify::VerifyStep;

use std::path::PathBuf;

use crate::config::Settings;
use crate::models::{PageNumber, PageUnit};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::types::Context;

/// Where the reconciled clip of `page` is written (`<clip_dir>/page_<n>.<ext>`).
pub(crate) fn output_clip_path(settings: &Settings, page: PageNumber) -> PathBuf {
    let paths = &settings.paths;
    paths
        .clip_dir()
        .join(paths.clip_file_name(&page.file_stem(&paths.file_prefix)))
}

/// Path of the page's current clip, which must exist on disk.
fn existing_clip(page: &PageUnit) -> StepResult<PathBuf> {
    match page.clip.as_ref() {
        Some(clip) if clip.exists() => Ok(clip.path.clone()),
        Some(clip) => Err(StepError::invalid_input(format!(
            "clip {} does not exist",
            clip.path.display()
        ))),
        None => Err(StepError::invalid_input(format!(
            "{} has no clip yet",
            page.label()
        ))),
    }
}

/// The page's scratch directory, created if needed.
fn page_scratch(ctx: &Context, page: &PageUnit) -> StepResult<PathBuf> {
    ctx.page_scratch(page.page_number)
        .map_err(|e| StepError::io_error("creating page scratch directory", e))
}
