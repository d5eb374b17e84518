//! Core enums used throughout the engine.

use serde::{Deserialize, Serialize};

/// Kind of media a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Position of a page in the assembly state machine.
///
/// Pages move strictly forward through
/// `Pending → Synthesized → Reconciled → Verified → Transitioned`.
/// `Failed` is reachable from every state and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Pending,
    Synthesized,
    Reconciled,
    Verified,
    Transitioned,
    Failed,
}

impl PageStatus {
    /// Whether the page has finished processing (either way).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PageStatus::Transitioned | PageStatus::Failed)
    }

    /// The status that follows this one on the success path.
    pub fn next(&self) -> Option<PageStatus> {
        match self {
            PageStatus::Pending => Some(PageStatus::Synthesized),
            PageStatus::Synthesized => Some(PageStatus::Reconciled),
            PageStatus::Reconciled => Some(PageStatus::Verified),
            PageStatus::Verified => Some(PageStatus::Transitioned),
            PageStatus::Transitioned | PageStatus::Failed => None,
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PageStatus::Pending => "Pending",
            PageStatus::Synthesized => "Synthesized",
            PageStatus::Reconciled => "Reconciled",
            PageStatus::Verified => "Verified",
            PageStatus::Transitioned => "Transitioned",
            PageStatus::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Why a page failed, as reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An asset could not be probed (missing, empty, corrupt).
    Probe,
    /// The page's image or audio was never provided.
    MissingAsset,
    /// A transcoding step failed.
    Encode,
    /// The clip still had no audio stream after a remux repair.
    AudioEmbed,
    /// Processing was cancelled before the page finished.
    Cancelled,
    /// A step's own precondition or postcondition check failed.
    Validation,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Probe => "ProbeError",
            FailureKind::MissingAsset => "MissingAssetError",
            FailureKind::Encode => "EncodeError",
            FailureKind::AudioEmbed => "AudioEmbedError",
            FailureKind::Cancelled => "Cancelled",
            FailureKind::Validation => "ValidationError",
        };
        write!(f, "{}", name)
    }
}

/// How the visual track of a page is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisMode {
    /// One still image held for the narration length.
    #[default]
    Still,
    /// Per-element reveal: a pre-rendered animation clip or a sequence of
    /// cumulative reveal frames.
    Reveal,
}

impl std::fmt::Display for SynthesisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SynthesisMode::Still => write!(f, "still"),
            SynthesisMode::Reveal => write!(f, "reveal"),
        }
    }
}

/// Algorithm used to hold the last frame when narration outlasts the visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionMode {
    /// One transcode with a hold filter on video and silence padding on audio.
    #[default]
    SinglePass,
    /// Extract last frame, render it as a clip, concat, then mux audio.
    MultiPass,
}

impl ExtensionMode {
    /// The other mode, used as fallback.
    pub fn alternate(&self) -> ExtensionMode {
        match self {
            ExtensionMode::SinglePass => ExtensionMode::MultiPass,
            ExtensionMode::MultiPass => ExtensionMode::SinglePass,
        }
    }
}

impl std::fmt::Display for ExtensionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtensionMode::SinglePass => write!(f, "single_pass"),
            ExtensionMode::MultiPass => write!(f, "multi_pass"),
        }
    }
}
