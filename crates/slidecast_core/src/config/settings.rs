//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::manager::{ConfigError, ConfigResult};
use crate::logging::LogLevel;
use crate::models::{ExtensionMode, SynthesisMode};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Input, output and scratch locations.
    #[serde(default)]
    pub paths: PathSettings,

    /// External tool locations and limits.
    #[serde(default)]
    pub tools: ToolSettings,

    /// Assembly behavior (synthesis, extension, fades, workers).
    #[serde(default)]
    pub assembly: AssemblySettings,

    /// Encode profile shared by every clip in a run.
    #[serde(default)]
    pub encode: EncodeSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Environment variables that override path and tool settings.
pub const ENV_OVERRIDES: &[&str] = &[
    "SLIDECAST_IMAGE_DIR",
    "SLIDECAST_AUDIO_DIR",
    "SLIDECAST_ANIMATION_DIR",
    "SLIDECAST_CLIP_DIR",
    "SLIDECAST_SCRATCH_DIR",
    "SLIDECAST_OUTPUT",
    "SLIDECAST_FFMPEG",
    "SLIDECAST_FFPROBE",
];

impl Settings {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> usize {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    ///
    /// Returns the number of settings that were overridden.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> usize
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for key in ENV_OVERRIDES {
            let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let target = match *key {
                "SLIDECAST_IMAGE_DIR" => &mut self.paths.image_dir,
                "SLIDECAST_AUDIO_DIR" => &mut self.paths.audio_dir,
                "SLIDECAST_ANIMATION_DIR" => &mut self.paths.animation_dir,
                "SLIDECAST_CLIP_DIR" => &mut self.paths.clip_dir,
                "SLIDECAST_SCRATCH_DIR" => &mut self.paths.scratch_dir,
                "SLIDECAST_OUTPUT" => &mut self.paths.output_path,
                "SLIDECAST_FFMPEG" => &mut self.tools.ffmpeg_path,
                "SLIDECAST_FFPROBE" => &mut self.tools.ffprobe_path,
                _ => continue,
            };
            tracing::debug!("Config override from {}: {}", key, value);
            *target = value.trim().to_string();
            applied += 1;
        }
        applied
    }

    /// Check values that would make a run meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.encode.frame_rate == 0 {
            return Err(ConfigError::Invalid("encode.frame_rate must be positive".to_string()));
        }
        if self.assembly.workers == 0 {
            return Err(ConfigError::Invalid("assembly.workers must be at least 1".to_string()));
        }
        if !self.assembly.fade_duration_secs.is_finite() || self.assembly.fade_duration_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "assembly.fade_duration_secs must be zero or positive".to_string(),
            ));
        }
        if !(self.assembly.reveal_step_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "assembly.reveal_step_secs must be positive".to_string(),
            ));
        }
        if self.assembly.extension_threshold_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "assembly.extension_threshold_secs must not be negative".to_string(),
            ));
        }
        if !(self.assembly.duration_tolerance_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "assembly.duration_tolerance_secs must be positive".to_string(),
            ));
        }
        if self.paths.file_prefix.is_empty() {
            return Err(ConfigError::Invalid("paths.file_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Path configuration for inputs, outputs, scratch, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder holding `page_<n>.png` slide images and reveal frames.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,

    /// Folder holding `page_<n>.mp3` narration.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    /// Folder holding pre-rendered `page_<n>.mp4` animations (reveal mode).
    #[serde(default = "default_animation_dir")]
    pub animation_dir: String,

    /// Folder receiving the per-page output clips.
    #[serde(default = "default_clip_dir")]
    pub clip_dir: String,

    /// Root folder for intermediate files.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,

    /// Final artifact.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Folder for run log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// File name prefix shared by all page files.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    #[serde(default = "default_clip_extension")]
    pub clip_extension: String,

    /// Keep the scratch folder after a successful run.
    #[serde(default)]
    pub keep_scratch: bool,
}

fn default_image_dir() -> String {
    "img".to_string()
}

fn default_audio_dir() -> String {
    "voice".to_string()
}

fn default_animation_dir() -> String {
    "temp/video".to_string()
}

fn default_clip_dir() -> String {
    "video".to_string()
}

fn default_scratch_dir() -> String {
    "temp".to_string()
}

fn default_output_path() -> String {
    "final_video.mp4".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_file_prefix() -> String {
    "page_".to_string()
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_audio_extension() -> String {
    "mp3".to_string()
}

fn default_clip_extension() -> String {
    "mp4".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            audio_dir: default_audio_dir(),
            animation_dir: default_animation_dir(),
            clip_dir: default_clip_dir(),
            scratch_dir: default_scratch_dir(),
            output_path: default_output_path(),
            logs_folder: default_logs_folder(),
            file_prefix: default_file_prefix(),
            image_extension: default_image_extension(),
            audio_extension: default_audio_extension(),
            clip_extension: default_clip_extension(),
            keep_scratch: false,
        }
    }
}

impl PathSettings {
    pub fn image_dir(&self) -> PathBuf {
        PathBuf::from(&self.image_dir)
    }

    pub fn audio_dir(&self) -> PathBuf {
        PathBuf::from(&self.audio_dir)
    }

    pub fn animation_dir(&self) -> PathBuf {
        PathBuf::from(&self.animation_dir)
    }

    pub fn clip_dir(&self) -> PathBuf {
        PathBuf::from(&self.clip_dir)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        PathBuf::from(&self.scratch_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_path)
    }

    /// File name of a page's output clip (`page_3.mp4`).
    pub fn clip_file_name(&self, stem: &str) -> String {
        format!("{}.{}", stem, self.clip_extension)
    }
}

/// External tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg executable (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe executable (name on PATH or absolute path).
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Kill an external invocation after this many seconds. 0 disables.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_timeout_secs() -> u64 {
    600
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySettings {
    /// How each page's visual track is produced.
    #[serde(default)]
    pub synthesis: SynthesisMode,

    /// Primary last-frame hold algorithm.
    #[serde(default)]
    pub extension: ExtensionMode,

    /// Retry with the other hold algorithm when the primary fails.
    #[serde(default = "default_true")]
    pub extension_fallback: bool,

    /// Requested fade-in/fade-out length.
    #[serde(default = "default_fade_duration")]
    pub fade_duration_secs: f64,

    /// Audio overhangs up to this length are treated as container rounding.
    #[serde(default = "default_extension_threshold")]
    pub extension_threshold_secs: f64,

    /// Allowed difference between expected and produced clip durations.
    #[serde(default = "default_duration_tolerance")]
    pub duration_tolerance_secs: f64,

    /// How long each reveal frame is shown.
    #[serde(default = "default_reveal_step")]
    pub reveal_step_secs: f64,

    /// Pages processed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_fade_duration() -> f64 {
    1.0
}

fn default_extension_threshold() -> f64 {
    0.05
}

fn default_duration_tolerance() -> f64 {
    0.1
}

fn default_reveal_step() -> f64 {
    1.0
}

fn default_workers() -> usize {
    1
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            synthesis: SynthesisMode::default(),
            extension: ExtensionMode::default(),
            extension_fallback: true,
            fade_duration_secs: default_fade_duration(),
            extension_threshold_secs: default_extension_threshold(),
            duration_tolerance_secs: default_duration_tolerance(),
            reveal_step_secs: default_reveal_step(),
            workers: default_workers(),
        }
    }
}

/// Encode profile applied to every produced clip.
///
/// All clips share it so the final concatenation can stream-copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeSettings {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,
}

fn default_frame_rate() -> u32 {
    30
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_pixel_format() -> String {
    "yuv420p".to_string()
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "128k".to_string()
}

fn default_audio_sample_rate() -> u32 {
    44100
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            video_codec: default_video_codec(),
            pixel_format: default_pixel_format(),
            preset: default_preset(),
            crf: default_crf(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_sample_rate: default_audio_sample_rate(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Minimum level written to the run log.
    #[serde(default)]
    pub level: LogLevel,

    /// Use compact log format (tool output only kept for the error tail).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool output lines to show on error.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Write a log file per run into `paths.logs_folder`.
    #[serde(default = "default_true")]
    pub write_run_log: bool,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            write_run_log: true,
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Tools,
    Assembly,
    Encode,
    Logging,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Assembly,
        ConfigSection::Encode,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Assembly => "assembly",
            ConfigSection::Encode => "encode",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Input, output and scratch directories",
            ConfigSection::Tools => "# External tools",
            ConfigSection::Assembly => "# Clip synthesis, duration reconciliation and fades",
            ConfigSection::Encode => "# Encode profile shared by all clips",
            ConfigSection::Logging => "# Logging configuration",
        }
    }
}
