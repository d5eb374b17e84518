//! In-process transcoder for tests.
//!
//! "Media files" are small JSON documents recording the container
//! duration, which streams exist and which frame is visible over which
//! time range. Images are plain text files whose content is a frame id.
//! Operations follow the stream semantics of the ffmpeg binding
//! (shortest-stream trims, silence padding, stream-copy concat), so
//! duration arithmetic and the frozen-frame property can be asserted
//! without ffmpeg installed.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::types::{
    write_concat_list, MediaInfo, StreamInfo, StreamKind, TranscodeError, TranscodeResult,
};
use super::MediaTranscoder;
use crate::models::FadePlan;

/// A frame shown from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub frame: String,
    pub start: f64,
    pub end: f64,
}

/// Contents of a fake media file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FakeMedia {
    pub duration: f64,
    /// Video stream duration, if the file has video.
    #[serde(default)]
    pub video: Option<f64>,
    /// Audio stream duration, if the file has audio.
    #[serde(default)]
    pub audio: Option<f64>,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub fade: Option<FadePlan>,
}

impl FakeMedia {
    fn video_len(&self) -> f64 {
        self.video.unwrap_or(self.duration)
    }

    /// Frame visible at time `t`.
    pub fn frame_at(&self, t: f64) -> Option<&str> {
        self.segments
            .iter()
            .find(|s| t >= s.start && t < s.end)
            .map(|s| s.frame.as_str())
    }

    /// Distinct frames in display order (consecutive repeats collapsed).
    pub fn frame_sequence(&self) -> Vec<String> {
        let mut frames: Vec<String> = Vec::new();
        for segment in &self.segments {
            if frames.last() != Some(&segment.frame) {
                frames.push(segment.frame.clone());
            }
        }
        frames
    }

    /// Frames visible at any time at or after `t`.
    pub fn frames_after(&self, t: f64) -> Vec<String> {
        let mut frames: Vec<String> = Vec::new();
        for segment in self.segments.iter().filter(|s| s.end > t + 1e-9) {
            if !frames.contains(&segment.frame) {
                frames.push(segment.frame.clone());
            }
        }
        frames
    }

    fn last_frame(&self) -> Option<&str> {
        self.segments.last().map(|s| s.frame.as_str())
    }
}

/// Keep only the part of `segments` before `len`.
fn trim_segments(segments: &[Segment], len: f64) -> Vec<Segment> {
    segments
        .iter()
        .filter(|s| s.start < len)
        .map(|s| Segment {
            frame: s.frame.clone(),
            start: s.start,
            end: s.end.min(len),
        })
        .collect()
}

fn shift_segments(segments: &[Segment], offset: f64) -> Vec<Segment> {
    segments
        .iter()
        .map(|s| Segment {
            frame: s.frame.clone(),
            start: s.start + offset,
            end: s.end + offset,
        })
        .collect()
}

/// Write a narration file of `secs`.
pub fn write_audio(path: &Path, secs: f64) {
    write_media(
        path,
        &FakeMedia {
            duration: secs,
            audio: Some(secs),
            ..Default::default()
        },
    )
    .unwrap();
}

/// Write an image whose frame id is `frame`.
pub fn write_image(path: &Path, frame: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, frame).unwrap();
}

/// Write a clip showing `frame` for `video_secs`, optionally with audio.
pub fn write_clip(path: &Path, video_secs: f64, audio_secs: Option<f64>, frame: &str) {
    write_media(
        path,
        &FakeMedia {
            duration: video_secs.max(audio_secs.unwrap_or(0.0)),
            video: Some(video_secs),
            audio: audio_secs,
            segments: vec![Segment {
                frame: frame.to_string(),
                start: 0.0,
                end: video_secs,
            }],
            fade: None,
        },
    )
    .unwrap();
}

/// Read a fake media file.
pub fn read_media(path: &Path) -> FakeMedia {
    load_media(path).unwrap()
}

fn write_media(path: &Path, media: &FakeMedia) -> TranscodeResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(media)
        .map_err(|e| TranscodeError::parse("fake", path, e.to_string()))?;
    fs::write(path, json)?;
    Ok(())
}

fn check_input(path: &Path) -> TranscodeResult<()> {
    let meta = fs::metadata(path).map_err(|_| TranscodeError::NotFound(path.to_path_buf()))?;
    if meta.len() == 0 {
        return Err(TranscodeError::EmptyFile(path.to_path_buf()));
    }
    Ok(())
}

fn load_media(path: &Path) -> TranscodeResult<FakeMedia> {
    check_input(path)?;
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| TranscodeError::parse("ffprobe", path, e.to_string()))
}

fn frame_id(image: &Path) -> TranscodeResult<String> {
    check_input(image)?;
    Ok(fs::read_to_string(image)?.trim().to_string())
}

#[derive(Debug, Clone)]
struct Rule {
    op: &'static str,
    /// Applies only when some path of the call contains this text.
    path_contains: Option<String>,
}

impl Rule {
    fn matches(&self, op: &str, paths: &[&Path]) -> bool {
        self.op == op
            && self.path_contains.as_ref().map_or(true, |needle| {
                paths
                    .iter()
                    .any(|p| p.to_string_lossy().contains(needle.as_str()))
            })
    }
}

/// Test double for [`MediaTranscoder`] with failure injection.
#[derive(Default)]
pub struct FakeTranscoder {
    failures: Vec<Rule>,
    drop_audio: Vec<Rule>,
    skews: Vec<(Rule, f64)>,
    truncate_visual_secs: f64,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` fail.
    pub fn fail(mut self, op: &'static str) -> Self {
        self.failures.push(Rule {
            op,
            path_contains: None,
        });
        self
    }

    /// Make `op` fail when one of its paths contains `needle`.
    pub fn fail_when(mut self, op: &'static str, needle: &str) -> Self {
        self.failures.push(Rule {
            op,
            path_contains: Some(needle.to_string()),
        });
        self
    }

    /// Make `op` write its output without an audio stream.
    pub fn drop_audio(mut self, op: &'static str) -> Self {
        self.drop_audio.push(Rule {
            op,
            path_contains: None,
        });
        self
    }

    /// Add `secs` to the duration `op` produces.
    pub fn skew(mut self, op: &'static str, secs: f64) -> Self {
        self.skews.push((
            Rule {
                op,
                path_contains: None,
            },
            secs,
        ));
        self
    }

    /// Make `compose_image_audio` produce `secs` less visual than asked.
    pub fn truncate_visual(mut self, secs: f64) -> Self {
        self.truncate_visual_secs = secs;
        self
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().iter().filter(|(o, _)| o == op).count()
    }

    /// Total number of calls.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    fn enter(&self, op: &'static str, paths: &[&Path]) -> TranscodeResult<()> {
        let target = paths.last().map(|p| p.to_path_buf()).unwrap_or_default();
        self.calls.lock().push((op.to_string(), target));

        if self.failures.iter().any(|r| r.matches(op, paths)) {
            return Err(TranscodeError::CommandFailed {
                tool: "ffmpeg".to_string(),
                exit_code: 1,
                stderr_tail: format!("injected failure in {}", op),
            });
        }
        Ok(())
    }

    fn drops_audio(&self, op: &str, paths: &[&Path]) -> bool {
        self.drop_audio.iter().any(|r| r.matches(op, paths))
    }

    fn skew_for(&self, op: &str, paths: &[&Path]) -> f64 {
        self.skews
            .iter()
            .filter(|(r, _)| r.matches(op, paths))
            .map(|(_, s)| *s)
            .sum()
    }
}

impl MediaTranscoder for FakeTranscoder {
    fn probe(&self, path: &Path) -> TranscodeResult<MediaInfo> {
        self.enter("probe", &[path])?;
        let media = load_media(path)?;

        let mut streams = Vec::new();
        if let Some(secs) = media.video {
            streams.push(StreamInfo {
                index: streams.len(),
                kind: StreamKind::Video,
                codec: "h264".to_string(),
                duration_secs: Some(secs),
            });
        }
        if let Some(secs) = media.audio {
            streams.push(StreamInfo {
                index: streams.len(),
                kind: StreamKind::Audio,
                codec: "aac".to_string(),
                duration_secs: Some(secs),
            });
        }

        Ok(MediaInfo {
            duration_secs: Some(media.duration),
            streams,
        })
    }

    fn compose_image_audio(
        &self,
        image: &Path,
        audio: &Path,
        duration_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()> {
        let op = "compose_image_audio";
        self.enter(op, &[image, audio, output])?;
        let frame = frame_id(image)?;
        let narration = load_media(audio)?;
        let audio_len = narration
            .audio
            .ok_or_else(|| TranscodeError::parse("ffmpeg", audio, "no audio stream"))?;

        let visual = (duration_secs - self.truncate_visual_secs).max(0.0);
        let len = visual.min(audio_len) + self.skew_for(op, &[output]);
        let media = FakeMedia {
            duration: len,
            video: Some(len),
            audio: (!self.drops_audio(op, &[output])).then_some(len),
            segments: vec![Segment {
                frame,
                start: 0.0,
                end: len,
            }],
            fade: None,
        };
        write_media(output, &media)
    }

    fn render_still(&self, image: &Path, duration_secs: f64, output: &Path) -> TranscodeResult<()> {
        self.enter("render_still", &[image, output])?;
        let frame = frame_id(image)?;
        write_media(
            output,
            &FakeMedia {
                duration: duration_secs,
                video: Some(duration_secs),
                audio: None,
                segments: vec![Segment {
                    frame,
                    start: 0.0,
                    end: duration_secs,
                }],
                fade: None,
            },
        )
    }

    fn render_reveal(
        &self,
        frames: &[PathBuf],
        step_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()> {
        self.enter("render_reveal", &[output])?;
        let mut segments = Vec::new();
        for (i, frame) in frames.iter().enumerate() {
            segments.push(Segment {
                frame: frame_id(frame)?,
                start: i as f64 * step_secs,
                end: (i + 1) as f64 * step_secs,
            });
        }
        let len = frames.len() as f64 * step_secs;
        write_media(
            output,
            &FakeMedia {
                duration: len,
                video: Some(len),
                audio: None,
                segments,
                fade: None,
            },
        )
    }

    fn extract_last_frame(&self, clip: &Path, output: &Path) -> TranscodeResult<()> {
        self.enter("extract_last_frame", &[clip, output])?;
        let media = load_media(clip)?;
        let frame = media
            .last_frame()
            .ok_or_else(|| TranscodeError::parse("ffmpeg", clip, "no video frames"))?;
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, frame)?;
        Ok(())
    }

    fn extend_with_frame_hold(
        &self,
        clip: &Path,
        audio: &Path,
        extend_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()> {
        let op = "extend_with_frame_hold";
        self.enter(op, &[clip, audio, output])?;
        let media = load_media(clip)?;
        load_media(audio)?;
        let v = media.video_len();
        let last = media
            .last_frame()
            .ok_or_else(|| TranscodeError::parse("ffmpeg", clip, "no video frames"))?
            .to_string();

        let mut segments = trim_segments(&media.segments, v);
        segments.push(Segment {
            frame: last,
            start: v,
            end: v + extend_secs,
        });
        // Audio is padded with silence, so the held video decides the length
        let len = v + extend_secs + self.skew_for(op, &[output]);
        write_media(
            output,
            &FakeMedia {
                duration: len,
                video: Some(len),
                audio: (!self.drops_audio(op, &[output])).then_some(len),
                segments: trim_segments(&segments, len),
                fade: None,
            },
        )
    }

    fn mux_shortest(&self, visual: &Path, audio: &Path, output: &Path) -> TranscodeResult<()> {
        let op = "mux_shortest";
        self.enter(op, &[visual, audio, output])?;
        let video = load_media(visual)?;
        let narration = load_media(audio)?;
        let audio_len = narration
            .audio
            .ok_or_else(|| TranscodeError::parse("ffmpeg", audio, "no audio stream"))?;

        let len = video.video_len().min(audio_len) + self.skew_for(op, &[output]);
        write_media(
            output,
            &FakeMedia {
                duration: len,
                video: Some(len),
                audio: (!self.drops_audio(op, &[output])).then_some(len),
                segments: trim_segments(&video.segments, len),
                fade: None,
            },
        )
    }

    fn remux(
        &self,
        visual_source: &Path,
        audio_source: &Path,
        output: &Path,
    ) -> TranscodeResult<()> {
        let op = "remux";
        self.enter(op, &[visual_source, audio_source, output])?;
        let video = load_media(visual_source)?;
        let narration = load_media(audio_source)?;
        let len = video.video_len();
        let audio = if self.drops_audio(op, &[output]) {
            None
        } else {
            narration.audio.map(|a| a.min(len))
        };
        write_media(
            output,
            &FakeMedia {
                duration: len,
                video: Some(len),
                audio,
                segments: video.segments.clone(),
                fade: video.fade,
            },
        )
    }

    fn apply_fade(&self, clip: &Path, plan: &FadePlan, output: &Path) -> TranscodeResult<()> {
        let op = "apply_fade";
        self.enter(op, &[clip, output])?;
        let mut media = load_media(clip)?;
        media.fade = Some(*plan);
        if self.drops_audio(op, &[output]) {
            media.audio = None;
        }
        write_media(output, &media)
    }

    fn concatenate_stream_copy(
        &self,
        ordered: &[PathBuf],
        list_file: &Path,
        output: &Path,
        video_only: bool,
    ) -> TranscodeResult<()> {
        self.enter("concatenate_stream_copy", &[list_file, output])?;
        write_concat_list(ordered, list_file)?;

        let mut segments = Vec::new();
        let mut offset = 0.0;
        let mut all_audio = true;
        for path in ordered {
            let media = load_media(path)?;
            segments.extend(shift_segments(&media.segments, offset));
            offset += media.duration;
            all_audio &= media.audio.is_some();
        }
        write_media(
            output,
            &FakeMedia {
                duration: offset,
                video: Some(offset),
                audio: (!video_only && all_audio).then_some(offset),
                segments,
                fade: None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn compose_trims_to_shortest() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("page_1.png");
        let audio = dir.path().join("page_1.mp3");
        let out = dir.path().join("clip.mp4");
        write_image(&image, "slide-1");
        write_audio(&audio, 4.0);

        let fake = FakeTranscoder::new().truncate_visual(1.5);
        fake.compose_image_audio(&image, &audio, 4.0, &out).unwrap();

        let media = read_media(&out);
        assert_eq!(media.video, Some(2.5));
        assert_eq!(media.frame_at(1.0), Some("slide-1"));
        assert_eq!(fake.calls("compose_image_audio"), 1);
    }

    #[test]
    fn injected_failures_and_dropped_audio() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        let audio = dir.path().join("page_1.mp3");
        write_clip(&clip, 3.0, None, "slide-1");
        write_audio(&audio, 3.0);

        let fake = FakeTranscoder::new()
            .fail_when("remux", "broken")
            .drop_audio("mux_shortest");
        assert!(fake
            .remux(&clip, &audio, &dir.path().join("broken.mp4"))
            .is_err());

        let out = dir.path().join("muxed.mp4");
        fake.mux_shortest(&clip, &audio, &out).unwrap();
        assert!(!fake.probe(&out).unwrap().has_audio());
    }

    #[test]
    fn probe_reports_bad_files() {
        let dir = tempdir().unwrap();
        let fake = FakeTranscoder::new();
        let path = dir.path().join("corrupt.mp3");
        fs::write(&path, "not media").unwrap();
        assert!(matches!(fake.probe(&path), Err(TranscodeError::Parse { .. })));
    }
}
