//! External media transcoding capability.
//!
//! The engine never shells out directly; every encode, probe and mux goes
//! through [`MediaTranscoder`]. [`FfmpegTranscoder`] is the production
//! binding. All operations block until the external process exits and
//! write to an explicit output path supplied by the caller.

mod ffmpeg;
mod probe;
mod runner;
mod types;

#[cfg(test)]
pub mod fake;

pub use ffmpeg::{fade_filter, reveal_script, FfmpegTranscoder, ToolVersions};
pub use probe::parse_probe_json;
pub use runner::{format_command, tail_lines, CommandOutput, CommandRunner};
pub use types::{
    absolute_path, concat_list_line, write_concat_list, MediaInfo, StreamInfo, StreamKind,
    TranscodeError, TranscodeResult,
};

use std::path::{Path, PathBuf};

use crate::models::FadePlan;

/// Media operations the assembly engine relies on.
pub trait MediaTranscoder: Send + Sync {
    /// Container duration and stream list of a file.
    fn probe(&self, path: &Path) -> TranscodeResult<MediaInfo>;

    /// Container duration of a file.
    fn probe_duration(&self, path: &Path) -> TranscodeResult<f64> {
        self.probe(path)?
            .duration_secs
            .ok_or_else(|| TranscodeError::parse("ffprobe", path, "no duration reported"))
    }

    /// Hold `image` for `duration_secs` and mux it with `audio`, trimmed to
    /// the shorter stream.
    fn compose_image_audio(
        &self,
        image: &Path,
        audio: &Path,
        duration_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()>;

    /// Silent clip showing `image` for `duration_secs`.
    fn render_still(&self, image: &Path, duration_secs: f64, output: &Path) -> TranscodeResult<()>;

    /// Silent clip showing each frame for `step_secs`, in order.
    fn render_reveal(
        &self,
        frames: &[PathBuf],
        step_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()>;

    /// Write the final visual frame of `clip` as an image.
    fn extract_last_frame(&self, clip: &Path, output: &Path) -> TranscodeResult<()>;

    /// Hold the last frame of `clip` for `extend_secs` extra seconds and
    /// attach `audio` padded with silence, trimmed to the shorter stream.
    fn extend_with_frame_hold(
        &self,
        clip: &Path,
        audio: &Path,
        extend_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()>;

    /// Video from `visual` (stream copy) with audio from `audio`, trimmed
    /// to the shorter stream.
    fn mux_shortest(&self, visual: &Path, audio: &Path, output: &Path) -> TranscodeResult<()>;

    /// Re-wrap the video of `visual_source` with the audio of
    /// `audio_source`. The video stream is not re-encoded.
    fn remux(
        &self,
        visual_source: &Path,
        audio_source: &Path,
        output: &Path,
    ) -> TranscodeResult<()>;

    /// Re-encode `clip` with the fades described by `plan`.
    fn apply_fade(&self, clip: &Path, plan: &FadePlan, output: &Path) -> TranscodeResult<()>;

    /// Join clips without re-encoding. `list_file` receives the concat list.
    fn concatenate_stream_copy(
        &self,
        ordered: &[PathBuf],
        list_file: &Path,
        output: &Path,
        video_only: bool,
    ) -> TranscodeResult<()>;
}
