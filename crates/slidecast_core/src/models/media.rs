//! Media asset handles.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::MediaKind;

/// A handle to one media file on disk.
///
/// The duration is unknown until the asset is probed. Once probed the value
/// is kept, so probing the same asset again returns the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Location of the file.
    pub path: PathBuf,
    /// What the file contains.
    pub kind: MediaKind,
    /// Duration in seconds, once probed.
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

impl MediaAsset {
    /// Create an unprobed asset.
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
            duration_secs: None,
        }
    }

    /// Create an unprobed image asset.
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::new(path, MediaKind::Image)
    }

    /// Create an unprobed audio asset.
    pub fn audio(path: impl Into<PathBuf>) -> Self {
        Self::new(path, MediaKind::Audio)
    }

    /// Create an unprobed video asset.
    pub fn video(path: impl Into<PathBuf>) -> Self {
        Self::new(path, MediaKind::Video)
    }

    /// Create a video asset whose duration is already known.
    pub fn probed_video(path: impl Into<PathBuf>, duration_secs: f64) -> Self {
        Self {
            path: path.into(),
            kind: MediaKind::Video,
            duration_secs: Some(duration_secs),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Duration in seconds, if the asset has been probed.
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    pub fn is_probed(&self) -> bool {
        self.duration_secs.is_some()
    }

    /// Record the probed duration.
    ///
    /// The first recorded value wins; later calls leave it unchanged.
    pub fn record_duration(&mut self, duration_secs: f64) -> f64 {
        *self.duration_secs.get_or_insert(duration_secs)
    }

    /// Whether the file is present on disk.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// File name for log messages.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
