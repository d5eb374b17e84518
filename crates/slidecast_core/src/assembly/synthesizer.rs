//! Per-page visual synthesis.
//!
//! Two ways to produce a page's clip:
//! - [`StillImageSynthesizer`] holds the slide image for the narration's
//!   length and muxes the narration in.
//! - [`RevealSynthesizer`] builds a silent visual track from a
//!   pre-rendered animation or from cumulative reveal frames; its length
//!   is independent of the narration and the reconciler attaches audio.

use std::path::{Path, PathBuf};

use super::error::{StageError, StageResult};
use super::probe::DurationProbe;
use crate::models::{MediaAsset, PageUnit, SynthesisMode};
use crate::transcode::MediaTranscoder;

/// Produces the visual clip for one page.
pub trait PageSynthesizer: Send + Sync {
    fn mode(&self) -> SynthesisMode;

    /// Write the page's clip into `scratch` and return it.
    ///
    /// The clip may come out shorter than intended; lengths are checked
    /// downstream.
    fn synthesize(&self, page: &PageUnit, scratch: &Path) -> StageResult<MediaAsset>;
}

/// Synthesizer for the configured mode.
pub fn synthesizer_for<'a>(
    mode: SynthesisMode,
    transcoder: &'a dyn MediaTranscoder,
    reveal_step_secs: f64,
) -> Box<dyn PageSynthesizer + 'a> {
    match mode {
        SynthesisMode::Still => Box::new(StillImageSynthesizer::new(transcoder)),
        SynthesisMode::Reveal => Box::new(RevealSynthesizer::new(transcoder, reveal_step_secs)),
    }
}

/// Narration asset of a page, which must exist on disk.
pub fn require_audio(page: &PageUnit) -> StageResult<&MediaAsset> {
    match page.audio.as_ref() {
        Some(audio) if audio.exists() => Ok(audio),
        Some(audio) => Err(StageError::missing(
            page.page_number,
            "narration audio",
            Some(audio.path.clone()),
        )),
        None => Err(StageError::missing(page.page_number, "narration audio", None)),
    }
}

/// Duration of the narration, using the cached value when present.
fn narration_secs(transcoder: &dyn MediaTranscoder, audio: &MediaAsset) -> StageResult<f64> {
    match audio.duration_secs() {
        Some(secs) => Ok(secs),
        None => Ok(DurationProbe::new(transcoder).probe(audio.path())?),
    }
}

/// Still image held for the narration's duration.
pub struct StillImageSynthesizer<'a> {
    transcoder: &'a dyn MediaTranscoder,
}

impl<'a> StillImageSynthesizer<'a> {
    pub fn new(transcoder: &'a dyn MediaTranscoder) -> Self {
        Self { transcoder }
    }
}

impl PageSynthesizer for StillImageSynthesizer<'_> {
    fn mode(&self) -> SynthesisMode {
        SynthesisMode::Still
    }

    fn synthesize(&self, page: &PageUnit, scratch: &Path) -> StageResult<MediaAsset> {
        let image = match page.image.as_ref() {
            Some(image) if image.exists() => image,
            other => {
                return Err(StageError::missing(
                    page.page_number,
                    "slide image",
                    other.map(|i| i.path.clone()),
                ))
            }
        };
        let audio = require_audio(page)?;
        let secs = narration_secs(self.transcoder, audio)?;

        let output = scratch.join(format!("synth_page_{}.mp4", page.page_number));
        self.transcoder
            .compose_image_audio(image.path(), audio.path(), secs, &output)
            .map_err(|e| StageError::encode("compose_image_audio", e))?;

        tracing::debug!(page = page.page_number.get(), "composed {:.3}s still clip", secs);
        Ok(MediaAsset::video(output))
    }
}

/// Visual track from an animation clip or cumulative reveal frames.
pub struct RevealSynthesizer<'a> {
    transcoder: &'a dyn MediaTranscoder,
    step_secs: f64,
}

impl<'a> RevealSynthesizer<'a> {
    pub fn new(transcoder: &'a dyn MediaTranscoder, step_secs: f64) -> Self {
        Self {
            transcoder,
            step_secs,
        }
    }

    /// Frames shown in order: reveal frames, then the complete slide.
    pub fn frame_order(page: &PageUnit) -> Vec<PathBuf> {
        page.reveal_frames
            .iter()
            .chain(page.image.iter())
            .filter(|f| f.exists())
            .map(|f| f.path.clone())
            .collect()
    }
}

impl PageSynthesizer for RevealSynthesizer<'_> {
    fn mode(&self) -> SynthesisMode {
        SynthesisMode::Reveal
    }

    fn synthesize(&self, page: &PageUnit, scratch: &Path) -> StageResult<MediaAsset> {
        require_audio(page)?;

        // A pre-rendered animation takes precedence over reveal frames
        if let Some(animation) = page.animation.as_ref().filter(|a| a.exists()) {
            tracing::debug!(
                page = page.page_number.get(),
                "using animation {}",
                animation.display_name()
            );
            return Ok(MediaAsset::video(animation.path()));
        }

        let frames = Self::frame_order(page);
        if frames.is_empty() {
            return Err(StageError::missing(page.page_number, "visual source", None));
        }

        let output = scratch.join(format!("reveal_page_{}.mp4", page.page_number));
        self.transcoder
            .render_reveal(&frames, self.step_secs, &output)
            .map_err(|e| StageError::encode("render_reveal", e))?;

        tracing::debug!(
            page = page.page_number.get(),
            "rendered {} reveal frames",
            frames.len()
        );
        Ok(MediaAsset::video(output))
    }
}
