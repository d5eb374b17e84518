//! Page-level assembly errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::probe::ProbeError;
use crate::models::{FailureKind, PageNumber};
use crate::transcode::TranscodeError;

/// Error from one assembly stage working on one page.
#[derive(Error, Debug)]
pub enum StageError {
    /// An expected input file is absent.
    #[error("Page {page}: {what} is missing{}", .path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    MissingAsset {
        page: PageNumber,
        what: &'static str,
        path: Option<PathBuf>,
    },

    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// A transcoding operation failed.
    #[error("{operation} failed: {source}")]
    Encode {
        operation: &'static str,
        #[source]
        source: TranscodeError,
    },

    /// A duration needed to match clip and narration could not be read.
    #[error("Cannot measure {what}: {source}")]
    Measure {
        what: &'static str,
        #[source]
        source: ProbeError,
    },

    /// A transcode finished but produced the wrong length.
    #[error("{operation} produced {actual:.3}s, expected {expected:.3}s (tolerance {tolerance:.3}s)")]
    DurationMismatch {
        operation: &'static str,
        expected: f64,
        actual: f64,
        tolerance: f64,
    },

    /// Every extension strategy failed.
    #[error("Frame-hold extension failed: {0}")]
    ExtensionFailed(String),

    /// The clip has no audio stream even after the remux repair.
    #[error("{} has no audio stream after remux repair", .clip.display())]
    AudioEmbed { clip: PathBuf },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    pub fn missing(page: PageNumber, what: &'static str, path: Option<PathBuf>) -> Self {
        Self::MissingAsset { page, what, path }
    }

    pub fn encode(operation: &'static str, source: TranscodeError) -> Self {
        Self::Encode { operation, source }
    }

    pub fn measure(what: &'static str, source: ProbeError) -> Self {
        Self::Measure { what, source }
    }

    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }

    /// Failure kind recorded on the page.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            StageError::MissingAsset { .. } => FailureKind::MissingAsset,
            StageError::Probe(_) => FailureKind::Probe,
            StageError::AudioEmbed { .. } => FailureKind::AudioEmbed,
            StageError::Encode { .. }
            | StageError::Measure { .. }
            | StageError::DurationMismatch { .. }
            | StageError::ExtensionFailed(_)
            | StageError::Io { .. } => FailureKind::Encode,
        }
    }

    /// stderr tail of the failed tool, when there is one.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            StageError::Encode {
                source: TranscodeError::CommandFailed { stderr_tail, .. },
                ..
            } => Some(stderr_tail),
            _ => None,
        }
    }
}

/// Result type for assembly stages.
pub type StageResult<T> = Result<T, StageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_failure_kinds() {
        let page = PageNumber::new(3).unwrap();
        let missing = StageError::missing(
            page,
            "narration audio",
            Some(PathBuf::from("voice/page_3.mp3")),
        );
        assert_eq!(missing.failure_kind(), FailureKind::MissingAsset);
        assert_eq!(
            missing.to_string(),
            "Page 3: narration audio is missing (voice/page_3.mp3)"
        );

        let encode = StageError::encode(
            "mux_shortest",
            TranscodeError::CommandFailed {
                tool: "ffmpeg".into(),
                exit_code: 1,
                stderr_tail: "Invalid data found".into(),
            },
        );
        assert_eq!(encode.failure_kind(), FailureKind::Encode);
        assert_eq!(encode.tool_output(), Some("Invalid data found"));

        let embed = StageError::AudioEmbed {
            clip: PathBuf::from("video/page_3.mp4"),
        };
        assert_eq!(embed.failure_kind(), FailureKind::AudioEmbed);
    }
}
