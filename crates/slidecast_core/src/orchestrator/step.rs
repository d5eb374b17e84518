//! Page step trait definition.
//!
//! All page steps implement this trait, providing a consistent
//! interface for validation and execution.

use super::errors::StepResult;
use super::types::Context;
use crate::models::{PageStatus, PageUnit};

/// Trait for page pipeline steps.
///
/// The pipeline runner calls these methods in order:
///
/// 1. `validate_input` - Check preconditions before execution
/// 2. `execute` - Perform the step's work, recording results on the page
/// 3. `validate_output` - Verify the step produced valid output
///
/// After all three pass, the page advances to [`PageStep::produces`].
///
/// # Example
///
/// ```ignore
/// struct SynthesizeStep;
///
/// impl PageStep for SynthesizeStep {
///     fn name(&self) -> &str { "Synthesize" }
///
///     fn produces(&self) -> PageStatus { PageStatus::Synthesized }
///
///     fn validate_input(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
///         require_audio(page)?;
///         Ok(())
///     }
///
///     fn execute(&self, ctx: &Context, page: &mut PageUnit) -> StepResult<()> {
///         page.clip = Some(synthesize(ctx, page)?);
///         Ok(())
///     }
///
///     fn validate_output(&self, _ctx: &Context, page: &PageUnit) -> StepResult<()> {
///         if page.clip.is_none() {
///             return Err(StepError::invalid_output("No clip recorded"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait PageStep: Send + Sync {
    /// Get the step name (for logging and error context).
    fn name(&self) -> &str;

    /// Status the page reaches when this step succeeds.
    fn produces(&self) -> PageStatus;

    /// Validate inputs before execution.
    ///
    /// Called before `execute`. Should check that the page carries what
    /// this step needs (assets on disk, clip from the previous step).
    fn validate_input(&self, ctx: &Context, page: &PageUnit) -> StepResult<()>;

    /// Execute the step's main work.
    fn execute(&self, ctx: &Context, page: &mut PageUnit) -> StepResult<()>;

    /// Validate outputs after execution.
    fn validate_output(&self, ctx: &Context, page: &PageUnit) -> StepResult<()>;
}
