//! Core types for the orchestrator pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use crate::assembly::ScratchSpace;
use crate::config::Settings;
use crate::logging::RunLogger;
use crate::models::PageNumber;
use crate::transcode::MediaTranscoder;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (stage, percent_complete, message)
pub type ProgressCallback = Arc<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context shared by every page of a run.
///
/// Steps read settings and shared resources from here; everything they
/// produce goes on the `PageUnit` they are given. The context is shared
/// across worker threads, so it holds no per-page state.
pub struct Context {
    /// Run settings.
    pub settings: Arc<Settings>,
    /// Media backend.
    pub transcoder: Arc<dyn MediaTranscoder>,
    /// Scratch space for this run.
    pub scratch: ScratchSpace,
    /// Per-run logger.
    logger: Option<Arc<RunLogger>>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    pub fn new(
        settings: Arc<Settings>,
        transcoder: Arc<dyn MediaTranscoder>,
        scratch: ScratchSpace,
    ) -> Self {
        Self {
            settings,
            transcoder,
            scratch,
            logger: None,
            progress_callback: None,
        }
    }

    pub fn with_logger(mut self, logger: Option<Arc<RunLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: Option<ProgressCallback>) -> Self {
        self.progress_callback = callback;
        self
    }

    pub fn logger(&self) -> Option<&RunLogger> {
        self.logger.as_deref()
    }

    /// Report progress to callback (if set).
    pub fn report_progress(&self, stage: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(stage, percent, message);
        }
    }

    /// Log a page-level event to tracing and the run log.
    pub fn log_page(&self, page: PageNumber, message: &str) {
        tracing::info!(page = page.get(), "{}", message);
        if let Some(logger) = self.logger() {
            logger.page(page.get(), message);
        }
    }

    /// Debug-level page event.
    pub fn debug_page(&self, page: PageNumber, message: &str) {
        tracing::debug!(page = page.get(), "{}", message);
        if let Some(logger) = self.logger() {
            logger.debug(&format!("Page {}: {}", page, message));
        }
    }

    /// Scratch directory of one page, created on demand.
    pub fn page_scratch(&self, page: PageNumber) -> std::io::Result<PathBuf> {
        self.scratch.create_page(page)
    }
}
