//! The whole assembly job and the reports it produces.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::{FailureKind, PageStatus};
use super::page::{FadePlan, PageNumber, PageUnit, Reconciliation};

/// Two page units claim the same page number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Page {page} appears more than once ({first} and {second})")]
pub struct DuplicatePageError {
    pub page: PageNumber,
    pub first: String,
    pub second: String,
}

/// An assembly job: the discovered pages plus the final output path.
///
/// Pages keep their discovery order here; only the final concatenation
/// sorts them by page number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pages: Vec<PageUnit>,
    output_path: PathBuf,
}

impl PipelineRun {
    /// Create a run, rejecting duplicate page numbers.
    pub fn new(
        pages: Vec<PageUnit>,
        output_path: impl Into<PathBuf>,
    ) -> Result<Self, DuplicatePageError> {
        let mut seen: HashSet<PageNumber> = HashSet::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            if !seen.insert(page.page_number) {
                let first = pages[..i]
                    .iter()
                    .find(|p| p.page_number == page.page_number)
                    .map(describe_source)
                    .unwrap_or_default();
                return Err(DuplicatePageError {
                    page: page.page_number,
                    first,
                    second: describe_source(page),
                });
            }
        }

        Ok(Self {
            pages,
            output_path: output_path.into(),
        })
    }

    pub fn pages(&self) -> &[PageUnit] {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [PageUnit] {
        &mut self.pages
    }

    pub fn into_pages(self) -> Vec<PageUnit> {
        self.pages
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Transitioned pages in ascending page order.
    pub fn transitioned_in_order(&self) -> Vec<&PageUnit> {
        let mut done: Vec<&PageUnit> = self.pages.iter().filter(|p| p.is_transitioned()).collect();
        done.sort_by_key(|p| p.page_number);
        done
    }
}

/// Name of the file a page was discovered from, for error messages.
fn describe_source(page: &PageUnit) -> String {
    page.image
        .as_ref()
        .or(page.animation.as_ref())
        .or(page.audio.as_ref())
        .map(|a| a.display_name())
        .unwrap_or_else(|| page.label())
}

/// Outcome of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub page_number: PageNumber,
    pub status: PageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<Reconciliation>,
    pub audio_repaired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fade: Option<FadePlan>,
    /// Per-page output clip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_path: Option<PathBuf>,
}

impl PageReport {
    pub fn succeeded(&self) -> bool {
        self.status == PageStatus::Transitioned
    }
}

impl From<&PageUnit> for PageReport {
    fn from(page: &PageUnit) -> Self {
        Self {
            page_number: page.page_number,
            status: page.status,
            failure_kind: page.failure.as_ref().map(|f| f.kind),
            failure_reason: page.failure.as_ref().map(|f| f.reason.clone()),
            reconciliation: page.reconciliation.clone(),
            audio_repaired: page.audio_repaired,
            fade: page.fade,
            clip_path: page.clip.as_ref().map(|c| c.path.clone()),
        }
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-page results in ascending page order.
    pub pages: Vec<PageReport>,
    /// The final artifact, when one was written.
    pub output_path: Option<PathBuf>,
    pub started_at: String,
    pub finished_at: String,
}

impl RunReport {
    /// The run succeeded when a final artifact was written.
    pub fn success(&self) -> bool {
        self.output_path.is_some()
    }

    pub fn succeeded_pages(&self) -> Vec<PageNumber> {
        self.pages
            .iter()
            .filter(|p| p.succeeded())
            .map(|p| p.page_number)
            .collect()
    }

    pub fn failed_pages(&self) -> Vec<&PageReport> {
        self.pages.iter().filter(|p| !p.succeeded()).collect()
    }

    pub fn page(&self, page_number: u32) -> Option<&PageReport> {
        self.pages.iter().find(|p| p.page_number.get() == page_number)
    }
}

/// Build reports for a set of pages, sorted by page number.
pub fn page_reports(pages: &[PageUnit]) -> Vec<PageReport> {
    let mut reports: Vec<PageReport> = pages.iter().map(PageReport::from).collect();
    reports.sort_by_key(|r| r.page_number);
    reports
}
