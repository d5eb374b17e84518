//! `MediaTranscoder` implemented with the ffmpeg and ffprobe executables.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::probe::{parse_probe_json, PROBE_ARGS};
use super::runner::CommandRunner;
use super::types::{
    absolute_path, concat_list_line, write_concat_list, MediaInfo, TranscodeError,
    TranscodeResult,
};
use super::MediaTranscoder;
use crate::config::{EncodeSettings, Settings};
use crate::logging::CommandSink;
use crate::models::FadePlan;

/// First line of `-version` output for each tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersions {
    pub ffmpeg: String,
    pub ffprobe: String,
}

/// ffmpeg/ffprobe binding configured from settings.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg: String,
    ffprobe: String,
    encode: EncodeSettings,
    runner: CommandRunner,
}

/// Small helper for building argument lists.
#[derive(Default)]
struct Args(Vec<OsString>);

impl Args {
    fn new() -> Self {
        // Always overwrite; outputs are explicit paths owned by the engine
        let mut args = Self::default();
        args.push("-y").push("-hide_banner").push("-nostdin");
        args
    }

    fn push(&mut self, arg: impl Into<OsString>) -> &mut Self {
        self.0.push(arg.into());
        self
    }

    fn pair(&mut self, flag: &str, value: impl Into<OsString>) -> &mut Self {
        self.push(flag).push(value)
    }

    fn input(&mut self, path: &Path) -> &mut Self {
        self.pair("-i", path.as_os_str())
    }

    /// Video from the first input, audio from the second.
    fn map_video_audio(&mut self) -> &mut Self {
        self.pair("-map", "0:v:0").pair("-map", "1:a:0")
    }

    fn output(mut self, path: &Path) -> Vec<OsString> {
        self.push(path.as_os_str());
        self.0
    }
}

impl FfmpegTranscoder {
    pub fn new(settings: &Settings) -> Self {
        Self {
            ffmpeg: settings.tools.ffmpeg_path.clone(),
            ffprobe: settings.tools.ffprobe_path.clone(),
            encode: settings.encode.clone(),
            runner: CommandRunner::new(settings.tools.timeout_secs),
        }
    }

    /// Record every ffmpeg/ffprobe command line through `sink`.
    pub fn with_command_sink(mut self, sink: CommandSink) -> Self {
        self.runner = self.runner.with_command_sink(sink);
        self
    }

    /// Run `-version` on both tools.
    pub fn check_tools(&self) -> TranscodeResult<ToolVersions> {
        let version = |tool: &str, program: &str| -> TranscodeResult<String> {
            let out = self
                .runner
                .run(tool, program, &[OsString::from("-version")])?;
            Ok(out.stdout.lines().next().unwrap_or_default().trim().to_string())
        };

        Ok(ToolVersions {
            ffmpeg: version("ffmpeg", &self.ffmpeg)?,
            ffprobe: version("ffprobe", &self.ffprobe)?,
        })
    }

    fn ffmpeg(&self, args: Vec<OsString>, output: &Path) -> TranscodeResult<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        self.runner.run("ffmpeg", &self.ffmpeg, &args)?;
        ensure_output(output)
    }

    fn video_encode(&self, args: &mut Args) {
        let e = &self.encode;
        args.pair("-c:v", e.video_codec.as_str())
            .pair("-preset", e.preset.as_str())
            .pair("-crf", e.crf.to_string())
            .pair("-pix_fmt", e.pixel_format.as_str())
            .pair("-r", e.frame_rate.to_string());
    }

    fn audio_encode(&self, args: &mut Args) {
        let e = &self.encode;
        args.pair("-c:a", e.audio_codec.as_str())
            .pair("-b:a", e.audio_bitrate.as_str())
            .pair("-ar", e.audio_sample_rate.to_string());
    }

    fn fps_filter(&self) -> String {
        format!("fps={}", self.encode.frame_rate)
    }

    pub fn compose_args(
        &self,
        image: &Path,
        audio: &Path,
        duration_secs: f64,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args = Args::new();
        args.pair("-loop", "1")
            .pair("-framerate", self.encode.frame_rate.to_string())
            .pair("-t", secs(duration_secs))
            .input(image)
            .input(audio)
            .map_video_audio();
        self.video_encode(&mut args);
        self.audio_encode(&mut args);
        args.push("-shortest");
        args.output(output)
    }

    pub fn still_args(&self, image: &Path, duration_secs: f64, output: &Path) -> Vec<OsString> {
        let mut args = Args::new();
        args.pair("-loop", "1")
            .pair("-framerate", self.encode.frame_rate.to_string())
            .input(image)
            .pair("-t", secs(duration_secs))
            .pair("-vf", self.fps_filter());
        self.video_encode(&mut args);
        args.push("-an");
        args.output(output)
    }

    pub fn reveal_args(&self, script: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Args::new();
        args.pair("-f", "concat")
            .pair("-safe", "0")
            .input(script)
            .pair("-vf", self.fps_filter());
        self.video_encode(&mut args);
        args.push("-an");
        args.output(output)
    }

    pub fn last_frame_args(&self, clip: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Args::new();
        args.pair("-sseof", "-1")
            .input(clip)
            .pair("-update", "1")
            .pair("-q:v", "1");
        args.output(output)
    }

    /// Clone the last frame for `extend_secs`, pad audio with silence and
    /// stop at the shorter stream.
    pub fn frame_hold_args(
        &self,
        clip: &Path,
        audio: &Path,
        extend_secs: f64,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args = Args::new();
        args.input(clip)
            .input(audio)
            .map_video_audio()
            .pair(
                "-vf",
                format!("tpad=stop_mode=clone:stop_duration={}", secs(extend_secs)),
            )
            .pair("-af", "apad");
        self.video_encode(&mut args);
        self.audio_encode(&mut args);
        args.push("-shortest");
        args.output(output)
    }

    pub fn mux_shortest_args(&self, visual: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Args::new();
        args.input(visual)
            .input(audio)
            .map_video_audio()
            .pair("-c:v", "copy");
        self.audio_encode(&mut args);
        args.push("-shortest");
        args.output(output)
    }

    /// Video copied from `visual_source`, narration from `audio_source`.
    pub fn remux_args(
        &self,
        visual_source: &Path,
        audio_source: &Path,
        output: &Path,
    ) -> Vec<OsString> {
        let mut args = Args::new();
        args.input(visual_source)
            .input(audio_source)
            .map_video_audio()
            .pair("-c:v", "copy");
        self.audio_encode(&mut args);
        args.output(output)
    }

    pub fn fade_args(&self, clip: &Path, plan: &FadePlan, output: &Path) -> Vec<OsString> {
        let mut args = Args::new();
        args.input(clip);
        if let Some(filter) = fade_filter(plan) {
            args.pair("-vf", filter);
        }
        self.video_encode(&mut args);
        self.audio_encode(&mut args);
        args.output(output)
    }

    pub fn concat_args(&self, list_file: &Path, output: &Path, video_only: bool) -> Vec<OsString> {
        let mut args = Args::new();
        args.pair("-f", "concat")
            .pair("-safe", "0")
            .input(list_file)
            .pair("-c", "copy");
        if video_only {
            args.push("-an");
        }
        args.output(output)
    }
}

/// Check an input file exists and has content.
fn ensure_input(path: &Path) -> TranscodeResult<()> {
    let meta = fs::metadata(path).map_err(|_| TranscodeError::NotFound(path.to_path_buf()))?;
    if meta.len() == 0 {
        return Err(TranscodeError::EmptyFile(path.to_path_buf()));
    }
    Ok(())
}

fn ensure_output(path: &Path) -> TranscodeResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(TranscodeError::OutputMissing(path.to_path_buf())),
    }
}

fn secs(value: f64) -> String {
    format!("{:.3}", value.max(0.0))
}

/// Video filter for a fade plan (`fade=t=in...,fade=t=out...`).
pub fn fade_filter(plan: &FadePlan) -> Option<String> {
    let mut filters = Vec::new();
    if plan.fade_in_secs > 0.0 {
        filters.push(format!("fade=t=in:st=0:d={}", secs(plan.fade_in_secs)));
    }
    if plan.fade_out_secs > 0.0 {
        filters.push(format!(
            "fade=t=out:st={}:d={}",
            secs(plan.fade_out_start()),
            secs(plan.fade_out_secs)
        ));
    }
    (!filters.is_empty()).then(|| filters.join(","))
}

/// Concat demuxer script showing each frame for `step_secs`.
///
/// The last frame is listed twice; the demuxer ignores the final
/// `duration` directive otherwise.
pub fn reveal_script(frames: &[PathBuf], step_secs: f64) -> String {
    let mut script = String::new();
    for frame in frames {
        script.push_str(&concat_list_line(&absolute_path(frame)));
        script.push('\n');
        script.push_str(&format!("duration {}\n", secs(step_secs)));
    }
    if let Some(last) = frames.last() {
        script.push_str(&concat_list_line(&absolute_path(last)));
        script.push('\n');
    }
    script
}

impl MediaTranscoder for FfmpegTranscoder {
    fn probe(&self, path: &Path) -> TranscodeResult<MediaInfo> {
        ensure_input(path)?;

        let mut args: Vec<OsString> = PROBE_ARGS.iter().map(OsString::from).collect();
        args.push(path.as_os_str().to_os_string());

        let out = self.runner.run("ffprobe", &self.ffprobe, &args)?;
        parse_probe_json(&out.stdout, path)
    }

    fn compose_image_audio(
        &self,
        image: &Path,
        audio: &Path,
        duration_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()> {
        ensure_input(image)?;
        ensure_input(audio)?;
        self.ffmpeg(self.compose_args(image, audio, duration_secs, output), output)
    }

    fn render_still(&self, image: &Path, duration_secs: f64, output: &Path) -> TranscodeResult<()> {
        ensure_input(image)?;
        self.ffmpeg(self.still_args(image, duration_secs, output), output)
    }

    fn render_reveal(
        &self,
        frames: &[PathBuf],
        step_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()> {
        for frame in frames {
            ensure_input(frame)?;
        }
        let script_path = output.with_extension("reveal.txt");
        if let Some(parent) = script_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&script_path, reveal_script(frames, step_secs))?;

        let result = self.ffmpeg(self.reveal_args(&script_path, output), output);
        let _ = fs::remove_file(&script_path);
        result
    }

    fn extract_last_frame(&self, clip: &Path, output: &Path) -> TranscodeResult<()> {
        ensure_input(clip)?;
        self.ffmpeg(self.last_frame_args(clip, output), output)
    }

    fn extend_with_frame_hold(
        &self,
        clip: &Path,
        audio: &Path,
        extend_secs: f64,
        output: &Path,
    ) -> TranscodeResult<()> {
        ensure_input(clip)?;
        ensure_input(audio)?;
        self.ffmpeg(self.frame_hold_args(clip, audio, extend_secs, output), output)
    }

    fn mux_shortest(&self, visual: &Path, audio: &Path, output: &Path) -> TranscodeResult<()> {
        ensure_input(visual)?;
        ensure_input(audio)?;
        self.ffmpeg(self.mux_shortest_args(visual, audio, output), output)
    }

    fn remux(
        &self,
        visual_source: &Path,
        audio_source: &Path,
        output: &Path,
    ) -> TranscodeResult<()> {
        ensure_input(visual_source)?;
        ensure_input(audio_source)?;
        self.ffmpeg(self.remux_args(visual_source, audio_source, output), output)
    }

    fn apply_fade(&self, clip: &Path, plan: &FadePlan, output: &Path) -> TranscodeResult<()> {
        ensure_input(clip)?;
        self.ffmpeg(self.fade_args(clip, plan, output), output)
    }

    fn concatenate_stream_copy(
        &self,
        ordered: &[PathBuf],
        list_file: &Path,
        output: &Path,
        video_only: bool,
    ) -> TranscodeResult<()> {
        for path in ordered {
            ensure_input(path)?;
        }
        write_concat_list(ordered, list_file)?;
        self.ffmpeg(self.concat_args(list_file, output, video_only), output)
    }
}
