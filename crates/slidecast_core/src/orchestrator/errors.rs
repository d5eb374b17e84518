//! Error types for the orchestrator pipeline.
//!
//! Errors carry context that chains through layers:
//! Run → Page → Step → Stage → Tool

use std::io;

use thiserror::Error;

use crate::assembly::{ConcatError, StageError};
use crate::discovery::DiscoveryError;
use crate::models::{DuplicatePageError, FailureKind, PageNumber, PageReport};

/// Page-level pipeline error with step context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Page {page} failed at step '{step_name}': {source}")]
    StepFailed {
        page: PageNumber,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Processing was cancelled before the step ran.
    #[error("Page {page} was cancelled before '{before_step}'")]
    Cancelled { page: PageNumber, before_step: String },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(page: PageNumber, step_name: impl Into<String>, source: StepError) -> Self {
        Self::StepFailed {
            page,
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(page: PageNumber, before_step: impl Into<String>) -> Self {
        Self::Cancelled {
            page,
            before_step: before_step.into(),
        }
    }

    /// Failure kind recorded on the page.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PipelineError::StepFailed { source, .. } => source.failure_kind(),
            PipelineError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// The underlying reason, without the page/step prefix.
    pub fn reason(&self) -> String {
        match self {
            PipelineError::StepFailed { source, .. } => source.to_string(),
            PipelineError::Cancelled { .. } => self.to_string(),
        }
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    /// An assembly stage failed.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            StepError::Stage(e) => e.failure_kind(),
            StepError::InvalidInput(_) | StepError::InvalidOutput(_) => FailureKind::Validation,
            StepError::IoError { .. } => FailureKind::Encode,
        }
    }

    /// stderr tail of a failed tool, when the failure came from one.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            StepError::Stage(e) => e.tool_output(),
            _ => None,
        }
    }
}

/// Run-level error. Page failures never end up here; only conditions that
/// leave nothing to assemble or prevent the run from starting do.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error(transparent)]
    DuplicatePage(#[from] DuplicatePageError),

    /// Every page failed.
    #[error("No page produced a clip ({} pages failed)", .pages.len())]
    NoClips { pages: Vec<PageReport> },

    /// The run was cancelled; no final artifact was written.
    #[error("Run cancelled")]
    Cancelled { pages: Vec<PageReport> },

    /// Joining the finished clips failed.
    #[error(transparent)]
    Concat(ConcatError),

    /// Scratch or output directories could not be prepared.
    #[error("Setup failed: {message}: {source}")]
    Setup {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

impl AssemblyError {
    pub fn setup(message: impl Into<String>, source: io::Error) -> Self {
        Self::Setup {
            message: message.into(),
            source,
        }
    }

    /// Per-page reports, when the error carries them.
    pub fn page_reports(&self) -> Option<&[PageReport]> {
        match self {
            AssemblyError::NoClips { pages } | AssemblyError::Cancelled { pages } => Some(pages),
            _ => None,
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for page pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for whole runs.
pub type AssemblyResult<T> = Result<T, AssemblyError>;
