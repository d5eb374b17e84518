//! Pipeline orchestrator for coordinating a run.
//!
//! Every page goes through the same state machine on its own. Page
//! failures are recorded on the page and never stop the others; only a
//! run where no page finishes (or one that cannot start) is an error.
//!
//! # Architecture
//!
//! ```text
//! PipelineOrchestrator
//!     ├── per page (sequential or on a rayon pool):
//!     │     Pipeline
//!     │         ├── Step: Synthesize   → Synthesized
//!     │         ├── Step: Reconcile    → Reconciled
//!     │         ├── Step: Verify       → Verified
//!     │         └── Step: Transition   → Transitioned
//!     └── Concatenator (transitioned pages, ascending page number)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use slidecast_core::config::Settings;
//! use slidecast_core::logging::{LogConfig, RunLogger};
//! use slidecast_core::orchestrator::PipelineOrchestrator;
//!
//! let settings = Arc::new(Settings::default());
//! let name = RunLogger::timestamped_name("slidecast");
//! let logger = RunLogger::new(name, ".logs", LogConfig::default(), None).expect("log file");
//! let report = PipelineOrchestrator::with_ffmpeg(settings, Arc::new(logger)).discover_and_run()?;
//! println!("Wrote {:?}", report.output_path);
//! # Ok::<(), slidecast_core::orchestrator::AssemblyError>(())
//! ```

mod errors;
mod pipeline;
mod step;
pub mod steps;
mod types;

pub use errors::{
    AssemblyError, AssemblyResult, PipelineError, PipelineResult, StepError, StepResult,
};
pub use pipeline::{CancelHandle, PageRunResult, Pipeline};
pub use step::PageStep;
pub use steps::{ReconcileStep, SynthesizeStep, TransitionStep, VerifyStep};
pub use types::{Context, ProgressCallback};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Local;
use rayon::prelude::*;

use crate::assembly::{ConcatError, Concatenator, ScratchSpace};
use crate::config::Settings;
use crate::discovery::discover_pages;
use crate::logging::RunLogger;
use crate::models::{page_reports, FailureKind, PageStatus, PageUnit, PipelineRun, RunReport};
use crate::transcode::{FfmpegTranscoder, MediaTranscoder};

/// Create the page pipeline with all steps in the correct order.
///
/// 1. Synthesize - build the visual track
/// 2. Reconcile - match its length to the narration
/// 3. Verify - make sure the clip carries audio
/// 4. Transition - fade in and out
pub fn create_page_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(SynthesizeStep::new())
        .with_step(ReconcileStep::new())
        .with_step(VerifyStep::new())
        .with_step(TransitionStep::new())
}

/// Runs every page of a [`PipelineRun`] and assembles the final artifact.
pub struct PipelineOrchestrator {
    settings: Arc<Settings>,
    transcoder: Arc<dyn MediaTranscoder>,
    logger: Option<Arc<RunLogger>>,
    progress_callback: Option<ProgressCallback>,
    cancel: CancelHandle,
}

impl PipelineOrchestrator {
    pub fn new(settings: Arc<Settings>, transcoder: Arc<dyn MediaTranscoder>) -> Self {
        Self {
            settings,
            transcoder,
            logger: None,
            progress_callback: None,
            cancel: CancelHandle::new(),
        }
    }

    /// Orchestrator over ffmpeg/ffprobe that also records every tool
    /// command line in `logger`.
    pub fn with_ffmpeg(settings: Arc<Settings>, logger: Arc<RunLogger>) -> Self {
        let transcoder = FfmpegTranscoder::new(&settings).with_command_sink(logger.command_sink());
        Self::new(settings, Arc::new(transcoder)).with_logger(logger)
    }

    /// Write phases, page outcomes and tool output to a run log.
    pub fn with_logger(mut self, logger: Arc<RunLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Handle that stops the run at the next step boundary of every page.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Discover pages from the configured folders and run them.
    pub fn discover_and_run(&self) -> AssemblyResult<RunReport> {
        let pages = discover_pages(&self.settings)?;
        let run = PipelineRun::new(pages, self.settings.paths.output_path())?;
        self.run(run)
    }

    /// Process every pending page, then concatenate the finished ones.
    pub fn run(&self, mut run: PipelineRun) -> AssemblyResult<RunReport> {
        let started_at = Local::now().to_rfc3339();

        let scratch = ScratchSpace::for_run(&self.settings.paths.scratch_dir());
        scratch.create().map_err(|e| {
            AssemblyError::setup(
                format!("creating scratch directory {}", scratch.root().display()),
                e,
            )
        })?;

        let ctx = Context::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.transcoder),
            scratch.clone(),
        )
        .with_logger(self.logger.clone())
        .with_progress_callback(self.progress_callback.clone());
        let pipeline = create_page_pipeline().with_cancel_handle(self.cancel.clone());

        let total = run.len();
        if let Some(logger) = ctx.logger() {
            logger.phase("Pages");
        }
        tracing::info!(
            "Assembling {} pages ({} synthesis, {} workers)",
            total,
            self.settings.assembly.synthesis,
            self.settings.assembly.workers
        );
        ctx.report_progress("Pages", 0, &format!("0 of {} pages", total));

        let done = AtomicUsize::new(0);
        let process = |page: &mut PageUnit| {
            self.process_page(&pipeline, &ctx, page);
            let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
            let percent = (finished * 100 / total.max(1)) as u32;
            ctx.report_progress("Pages", percent, &format!("{} of {} pages", finished, total));
            if let Some(logger) = ctx.logger() {
                logger.progress(percent);
            }
        };

        let workers = self.settings.assembly.workers.max(1).min(total.max(1));
        if workers == 1 {
            run.pages_mut().iter_mut().for_each(process);
        } else {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => pool.install(|| run.pages_mut().par_iter_mut().for_each(process)),
                Err(e) => {
                    tracing::warn!(
                        "Cannot start {} workers ({}), running sequentially",
                        workers,
                        e
                    );
                    run.pages_mut().iter_mut().for_each(process);
                }
            }
        }

        if self.cancel.is_cancelled() {
            for page in run.pages_mut().iter_mut().filter(|p| !p.status.is_terminal()) {
                page.fail(FailureKind::Cancelled, "run cancelled");
            }
            self.finish_scratch(&scratch);
            tracing::warn!("Run cancelled; no output written");
            return Err(AssemblyError::Cancelled {
                pages: page_reports(run.pages()),
            });
        }

        if let Some(logger) = ctx.logger() {
            logger.phase("Concatenate");
        }
        ctx.report_progress("Concatenate", 100, "Joining page clips");

        let concatenated = Concatenator::new(self.transcoder.as_ref(), &scratch)
            .concatenate(run.pages(), run.output_path());
        let output = match concatenated {
            Ok(output) => output,
            Err(ConcatError::NoClips) => {
                self.finish_scratch(&scratch);
                let pages = page_reports(run.pages());
                tracing::error!("No page produced a clip; {} pages failed", pages.len());
                if let Some(logger) = ctx.logger() {
                    logger.error("No page produced a clip");
                }
                return Err(AssemblyError::NoClips { pages });
            }
            Err(e) => {
                tracing::error!("Concatenation failed: {}", e);
                if let Some(logger) = ctx.logger() {
                    logger.error(&format!("Concatenation failed: {}", e));
                }
                return Err(AssemblyError::Concat(e));
            }
        };

        self.finish_scratch(&scratch);

        let report = RunReport {
            pages: page_reports(run.pages()),
            output_path: Some(output),
            started_at,
            finished_at: Local::now().to_rfc3339(),
        };

        let failed = report.failed_pages().len();
        let message = format!(
            "Wrote {} ({} pages, {} failed)",
            run.output_path().display(),
            report.succeeded_pages().len(),
            failed
        );
        tracing::info!("{}", message);
        if let Some(logger) = ctx.logger() {
            logger.success(&message);
            logger.flush();
        }

        Ok(report)
    }

    /// Run one page through the pipeline, recording any failure on it.
    fn process_page(&self, pipeline: &Pipeline, ctx: &Context, page: &mut PageUnit) {
        if page.status != PageStatus::Pending {
            ctx.debug_page(page.page_number, &format!("already {}, skipping", page.status));
            return;
        }

        match pipeline.run_page(ctx, page) {
            Ok(_) => ctx.log_page(page.page_number, "done"),
            Err(e) => {
                let kind = e.failure_kind();
                let reason = e.reason();
                tracing::warn!(page = page.page_number.get(), kind = %kind, "{}", e);
                if let Some(logger) = ctx.logger() {
                    logger.error(&e.to_string());
                    if let PipelineError::StepFailed { source, .. } = &e {
                        if let Some(tail) = source.tool_output() {
                            logger.tool_output(&page.label(), tail);
                        }
                    }
                }
                page.fail(kind, reason);

                if let Err(err) = ctx.scratch.remove_page(page.page_number) {
                    tracing::warn!(
                        page = page.page_number.get(),
                        "Cannot remove page scratch: {}",
                        err
                    );
                }
                remove_output_clip(ctx, page);
            }
        }
    }

    fn finish_scratch(&self, scratch: &ScratchSpace) {
        if self.settings.paths.keep_scratch {
            tracing::debug!("Keeping scratch at {}", scratch.root().display());
            return;
        }
        if let Err(e) = scratch.remove() {
            tracing::warn!("Cannot remove scratch {}: {}", scratch.root().display(), e);
        }
    }
}

/// Delete the per-page clip of a failed page, if reconcile got that far.
fn remove_output_clip(ctx: &Context, page: &mut PageUnit) {
    let clip = steps::output_clip_path(&ctx.settings, page.page_number);
    if !clip.exists() {
        return;
    }
    match std::fs::remove_file(&clip) {
        Ok(()) => {
            if page.clip_path() == Some(clip.as_path()) {
                page.clip = None;
            }
        }
        Err(err) => tracing::warn!(
            page = page.page_number.get(),
            "Cannot remove {}: {}",
            clip.display(),
            err
        ),
    }
}
