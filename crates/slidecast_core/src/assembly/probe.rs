//! Duration probing with input checks and per-asset caching.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::MediaAsset;
use crate::transcode::{MediaInfo, MediaTranscoder, TranscodeError};

/// A media file whose duration cannot be measured.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Media file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Media file is empty: {}", .0.display())]
    Empty(PathBuf),

    #[error("Cannot read metadata of {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("{} reports no usable duration", .0.display())]
    NoDuration(PathBuf),

    #[error("Probing {} failed: {source}", .path.display())]
    Tool {
        path: PathBuf,
        #[source]
        source: TranscodeError,
    },
}

impl ProbeError {
    fn from_transcode(path: &Path, err: TranscodeError) -> Self {
        match err {
            TranscodeError::NotFound(p) => ProbeError::Missing(p),
            TranscodeError::EmptyFile(p) => ProbeError::Empty(p),
            TranscodeError::Parse { message, .. } => ProbeError::Unreadable {
                path: path.to_path_buf(),
                reason: message,
            },
            other => ProbeError::Tool {
                path: path.to_path_buf(),
                source: other,
            },
        }
    }
}

pub type ProbeResult<T> = Result<T, ProbeError>;

/// Measures media durations through a transcoder.
///
/// Probing has no side effects and returns the same value for an
/// unchanged file.
pub struct DurationProbe<'a> {
    transcoder: &'a dyn MediaTranscoder,
}

impl<'a> DurationProbe<'a> {
    pub fn new(transcoder: &'a dyn MediaTranscoder) -> Self {
        Self { transcoder }
    }

    /// Stream and duration information for an existing, non-empty file.
    pub fn inspect(&self, path: &Path) -> ProbeResult<MediaInfo> {
        check_file(path)?;
        self.transcoder
            .probe(path)
            .map_err(|e| ProbeError::from_transcode(path, e))
    }

    /// Container duration in seconds.
    pub fn probe(&self, path: &Path) -> ProbeResult<f64> {
        let info = self.inspect(path)?;
        usable(path, info.duration_secs)
    }

    /// Duration of the visual content: the first video stream, falling
    /// back to the container.
    pub fn visual_duration(&self, path: &Path) -> ProbeResult<f64> {
        let info = self.inspect(path)?;
        usable(path, info.video_duration())
    }

    /// Probe an asset once; later calls return the cached value without
    /// touching the file.
    pub fn probe_asset(&self, asset: &mut MediaAsset) -> ProbeResult<f64> {
        if let Some(secs) = asset.duration_secs() {
            return Ok(secs);
        }
        let secs = self.probe(asset.path())?;
        Ok(asset.record_duration(secs))
    }
}

fn check_file(path: &Path) -> ProbeResult<()> {
    let meta = fs::metadata(path).map_err(|_| ProbeError::Missing(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(ProbeError::Missing(path.to_path_buf()));
    }
    if meta.len() == 0 {
        return Err(ProbeError::Empty(path.to_path_buf()));
    }
    Ok(())
}

fn usable(path: &Path, secs: Option<f64>) -> ProbeResult<f64> {
    match secs {
        Some(s) if s.is_finite() && s > 0.0 => Ok(s),
        _ => Err(ProbeError::NoDuration(path.to_path_buf())),
    }
}
