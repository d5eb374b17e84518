//! Data models for slidecast.
//!
//! This module contains the core data structures used throughout the engine:
//! - Enums for media kinds, page status, failure kinds and modes
//! - Media asset handles
//! - Page numbers and page units
//! - The pipeline run and its reports

mod enums;
mod media;
mod page;
mod run;

// Re-export all public types
pub use enums::{ExtensionMode, FailureKind, MediaKind, PageStatus, SynthesisMode};
pub use media::MediaAsset;
pub use page::{
    page_number_of, parse_page_number, parse_reveal_frame, FadePlan, PageFailure, PageNameError,
    PageNumber, PageUnit, Reconciliation,
};
pub use run::{page_reports, DuplicatePageError, PageReport, PipelineRun, RunReport};
