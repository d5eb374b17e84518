//! Pipeline runner that moves one page through its steps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{PipelineError, PipelineResult, StepError};
use super::step::PageStep;
use super::types::Context;
use crate::models::PageUnit;

/// Pipeline that runs a sequence of steps on a page.
///
/// The pipeline executes steps in order, running validation before
/// and after each step, and advances the page's status after each
/// success. It checks for cancellation at every step boundary.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PageStep>>,
    /// Cancellation flag.
    cancel: CancelHandle,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            cancel: CancelHandle::new(),
        }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PageStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PageStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Share an existing cancellation flag.
    pub fn with_cancel_handle(mut self, handle: CancelHandle) -> Self {
        self.cancel = handle;
        self
    }

    /// Get a cancellation handle.
    ///
    /// Call `cancel()` on the returned handle to stop every page at its
    /// next step boundary.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Check if pipeline has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run every step on `page`.
    ///
    /// For each step:
    /// 1. Check for cancellation
    /// 2. Run `validate_input`
    /// 3. Run `execute`
    /// 4. Run `validate_output`
    /// 5. Advance the page to the step's status
    ///
    /// The page is left at the last status it reached; recording the
    /// failure on it is up to the caller.
    pub fn run_page(&self, ctx: &Context, page: &mut PageUnit) -> PipelineResult<PageRunResult> {
        let mut result = PageRunResult::default();
        let number = page.page_number;

        for step in &self.steps {
            let step_name = step.name();

            if self.is_cancelled() {
                return Err(PipelineError::cancelled(number, step_name));
            }

            ctx.debug_page(number, &format!("Validating input for '{}'", step_name));
            step.validate_input(ctx, page)
                .map_err(|e| PipelineError::step_failed(number, step_name, e))?;

            ctx.debug_page(number, &format!("Executing '{}'", step_name));
            step.execute(ctx, page)
                .map_err(|e| PipelineError::step_failed(number, step_name, e))?;
            step.validate_output(ctx, page)
                .map_err(|e| PipelineError::step_failed(number, step_name, e))?;

            let from = page.status;
            if !page.advance(step.produces()) {
                return Err(PipelineError::step_failed(
                    number,
                    step_name,
                    StepError::invalid_output(format!(
                        "cannot move from {} to {}",
                        from,
                        step.produces()
                    )),
                ));
            }
            result.steps_completed.push(step_name.to_string());
        }

        Ok(result)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for cancelling a running pipeline.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pipeline.
    ///
    /// Pages stop at their next step boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Steps a page went through.
#[derive(Debug, Clone, Default)]
pub struct PageRunResult {
    /// Steps that completed successfully, in order.
    pub steps_completed: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::ScratchSpace;
    use crate::config::Settings;
    use crate::models::{FailureKind, PageNumber, PageStatus};
    use crate::orchestrator::errors::StepResult;
    use crate::transcode::fake::FakeTranscoder;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    struct CountingStep {
        name: &'static str,
        produces: PageStatus,
        execute_count: Arc<AtomicUsize>,
        fail: bool,
        bad_output: bool,
    }

    impl CountingStep {
        fn new(name: &'static str, produces: PageStatus, count: &Arc<AtomicUsize>) -> Self {
            Self {
                name,
                produces,
                execute_count: Arc::clone(count),
                fail: false,
                bad_output: false,
            }
        }
    }

    impl PageStep for CountingStep {
        fn name(&self) -> &str {
            self.name
        }

        fn produces(&self) -> PageStatus {
            self.produces
        }

        fn validate_input(&self, _ctx: &Context, _page: &PageUnit) -> StepResult<()> {
            Ok(())
        }

        fn execute(&self, _ctx: &Context, _page: &mut PageUnit) -> StepResult<()> {
            self.execute_count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StepError::invalid_input("boom"));
            }
            Ok(())
        }

        fn validate_output(&self, _ctx: &Context, _page: &PageUnit) -> StepResult<()> {
            if self.bad_output {
                return Err(StepError::invalid_output("nothing written"));
            }
            Ok(())
        }
    }

    fn context(dir: &std::path::Path) -> Context {
        Context::new(
            Arc::new(Settings::default()),
            Arc::new(FakeTranscoder::new()),
            ScratchSpace::at(dir),
        )
    }

    fn page() -> PageUnit {
        PageUnit::new(PageNumber::new(1).unwrap())
    }

    #[test]
    fn pipeline_builds_correctly() {
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", PageStatus::Synthesized, &count))
            .with_step(CountingStep::new("Step2", PageStatus::Reconciled, &count));

        assert_eq!(pipeline.step_count(), 2);
        assert_eq!(pipeline.step_names(), vec!["Step1", "Step2"]);
    }

    #[test]
    fn steps_advance_the_page() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", PageStatus::Synthesized, &count))
            .with_step(CountingStep::new("Step2", PageStatus::Reconciled, &count));

        let mut unit = page();
        let result = pipeline.run_page(&context(dir.path()), &mut unit).unwrap();
        assert_eq!(unit.status, PageStatus::Reconciled);
        assert_eq!(result.steps_completed, vec!["Step1", "Step2"]);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failing_step_stops_the_page() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let mut failing = CountingStep::new("Step2", PageStatus::Reconciled, &count);
        failing.fail = true;
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", PageStatus::Synthesized, &count))
            .with_step(failing)
            .with_step(CountingStep::new("Step3", PageStatus::Verified, &count));

        let mut unit = page();
        let err = pipeline
            .run_page(&context(dir.path()), &mut unit)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StepFailed { ref step_name, .. } if step_name == "Step2"
        ));
        assert_eq!(unit.status, PageStatus::Synthesized);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rejected_output_does_not_advance() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let mut unchecked = CountingStep::new("Step2", PageStatus::Reconciled, &count);
        unchecked.bad_output = true;
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", PageStatus::Synthesized, &count))
            .with_step(unchecked);

        let mut unit = page();
        let err = pipeline
            .run_page(&context(dir.path()), &mut unit)
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Validation);
        assert_eq!(unit.status, PageStatus::Synthesized);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn out_of_order_step_is_rejected() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let pipeline =
            Pipeline::new().with_step(CountingStep::new("Jump", PageStatus::Verified, &count));

        let mut unit = page();
        let err = pipeline
            .run_page(&context(dir.path()), &mut unit)
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Validation);
        assert_eq!(unit.status, PageStatus::Pending);
    }

    #[test]
    fn cancel_handle_works() {
        let dir = tempdir().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = CancelHandle::new();
        let pipeline = Pipeline::new()
            .with_step(CountingStep::new("Step1", PageStatus::Synthesized, &count))
            .with_cancel_handle(handle.clone());

        assert!(!pipeline.is_cancelled());
        handle.cancel();
        assert!(pipeline.is_cancelled());
        assert!(pipeline.cancel_handle().is_cancelled());

        let mut unit = page();
        let err = pipeline
            .run_page(&context(dir.path()), &mut unit)
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Cancelled);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
