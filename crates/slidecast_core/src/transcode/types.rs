//! Types shared by transcoder bindings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for external transcoding operations.
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File is empty: {}", .0.display())]
    EmptyFile(PathBuf),

    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {secs}s and was killed")]
    Timeout { tool: String, secs: u64 },

    #[error("{tool} failed (exit code {exit_code}): {stderr_tail}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        stderr_tail: String,
    },

    #[error("Failed to parse {tool} output for {}: {message}", .path.display())]
    Parse {
        tool: String,
        path: PathBuf,
        message: String,
    },

    #[error("Output file missing or empty: {}", .0.display())]
    OutputMissing(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscodeError {
    pub fn parse(tool: &str, path: &Path, message: impl Into<String>) -> Self {
        Self::Parse {
            tool: tool.to_string(),
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Whether the input file itself was unusable (as opposed to the tool failing).
    pub fn is_input_problem(&self) -> bool {
        matches!(
            self,
            TranscodeError::NotFound(_)
                | TranscodeError::EmptyFile(_)
                | TranscodeError::Parse { .. }
        )
    }
}

/// Result type for transcoding operations.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Kind of a stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl StreamKind {
    /// Map an ffprobe `codec_type`.
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => StreamKind::Video,
            "audio" => StreamKind::Audio,
            "subtitle" => StreamKind::Subtitle,
            _ => StreamKind::Other,
        }
    }
}

/// One stream of a probed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    pub kind: StreamKind,
    pub codec: String,
    /// Per-stream duration, when the container reports one.
    pub duration_secs: Option<f64>,
}

/// Probe result for one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration.
    pub duration_secs: Option<f64>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.kind == StreamKind::Audio)
    }

    pub fn has_video(&self) -> bool {
        self.streams.iter().any(|s| s.kind == StreamKind::Video)
    }

    pub fn first_video(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == StreamKind::Video)
    }

    pub fn first_audio(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.kind == StreamKind::Audio)
    }

    /// Duration of the visual content: the first video stream's own
    /// duration, falling back to the container duration.
    pub fn video_duration(&self) -> Option<f64> {
        self.first_video()
            .and_then(|s| s.duration_secs)
            .or(self.duration_secs)
    }
}

/// Quote a path for an ffmpeg concat list line (`file '<path>'`).
///
/// Single quotes inside the path are closed, escaped and reopened.
pub fn concat_list_line(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\'', "'\\''");
    format!("file '{}'", escaped)
}

/// Absolute form of `path` without resolving symlinks.
pub fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Write an ffmpeg concat list for `paths`, one absolute path per line.
pub fn write_concat_list(paths: &[PathBuf], list_file: &Path) -> std::io::Result<()> {
    if let Some(parent) = list_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut content = String::new();
    for path in paths {
        content.push_str(&concat_list_line(&absolute_path(path)));
        content.push('\n');
    }
    std::fs::write(list_file, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn concat_line_escapes_quotes() {
        assert_eq!(
            concat_list_line(Path::new("/tmp/page_1.mp4")),
            "file '/tmp/page_1.mp4'"
        );
        assert_eq!(
            concat_list_line(Path::new("/tmp/it's/page_1.mp4")),
            "file '/tmp/it'\\''s/page_1.mp4'"
        );
    }

    #[test]
    fn concat_list_uses_absolute_paths() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("lists").join("concat.txt");
        write_concat_list(&[PathBuf::from("video/page_2.mp4")], &list).unwrap();

        let content = std::fs::read_to_string(&list).unwrap();
        let line = content.lines().next().unwrap();
        assert!(line.starts_with("file '/"));
        assert!(line.ends_with("video/page_2.mp4'"));
    }

    #[test]
    fn video_duration_prefers_stream() {
        let info = MediaInfo {
            duration_secs: Some(10.0),
            streams: vec![
                StreamInfo {
                    index: 0,
                    kind: StreamKind::Video,
                    codec: "h264".into(),
                    duration_secs: Some(7.0),
                },
                StreamInfo {
                    index: 1,
                    kind: StreamKind::Audio,
                    codec: "aac".into(),
                    duration_secs: Some(10.0),
                },
            ],
        };
        assert_eq!(info.video_duration(), Some(7.0));
        assert!(info.has_audio());

        let no_stream_duration = MediaInfo {
            duration_secs: Some(4.0),
            streams: vec![StreamInfo {
                index: 0,
                kind: StreamKind::Video,
                codec: "h264".into(),
                duration_secs: None,
            }],
        };
        assert_eq!(no_stream_duration.video_duration(), Some(4.0));
        assert!(!no_stream_duration.has_audio());
    }
}
