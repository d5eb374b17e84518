//! Duration reconciliation between a page's visual track and its narration.
//!
//! With `v` the visual length and `a` the narration length:
//! - `a <= v`: mux with shortest-stream semantics, result `min(v, a)`.
//! - `a > v`: hold the last frame for `a - v` seconds, result `a`.
//!
//! Overhangs up to the configured threshold count as container rounding
//! and take the first path.

use std::path::Path;

use super::error::{StageError, StageResult};
use super::probe::DurationProbe;
use crate::config::AssemblySettings;
use crate::models::{ExtensionMode, MediaAsset, Reconciliation};
use crate::transcode::MediaTranscoder;

/// Inputs for one frame-hold extension.
#[derive(Debug, Clone, Copy)]
pub struct ExtensionJob<'a> {
    /// Visual clip to extend.
    pub visual: &'a Path,
    /// Narration attached to the result.
    pub audio: &'a Path,
    pub visual_secs: f64,
    pub extend_secs: f64,
    /// Page scratch directory for intermediates.
    pub scratch: &'a Path,
    pub output: &'a Path,
}

/// A way of holding the last frame of a clip.
pub trait ExtensionStrategy: Send + Sync {
    fn mode(&self) -> ExtensionMode;

    fn extend(&self, transcoder: &dyn MediaTranscoder, job: &ExtensionJob<'_>) -> StageResult<()>;
}

/// Hold filter on the video plus silence padding on the audio, one encode.
pub struct SinglePassHold;

impl ExtensionStrategy for SinglePassHold {
    fn mode(&self) -> ExtensionMode {
        ExtensionMode::SinglePass
    }

    fn extend(&self, transcoder: &dyn MediaTranscoder, job: &ExtensionJob<'_>) -> StageResult<()> {
        transcoder
            .extend_with_frame_hold(job.visual, job.audio, job.extend_secs, job.output)
            .map_err(|e| StageError::encode("extend_with_frame_hold", e))
    }
}

/// Extract the last frame, render it as a still clip, stream-copy it onto
/// the original and mux the untouched narration.
pub struct MultiPassHold;

impl ExtensionStrategy for MultiPassHold {
    fn mode(&self) -> ExtensionMode {
        ExtensionMode::MultiPass
    }

    fn extend(&self, transcoder: &dyn MediaTranscoder, job: &ExtensionJob<'_>) -> StageResult<()> {
        let last_frame = job.scratch.join("last_frame.jpg");
        let hold_clip = job.scratch.join("hold_extension.mp4");
        let held_visual = job.scratch.join("held_visual.mp4");
        let list_file = job.scratch.join("hold_concat.txt");

        transcoder
            .extract_last_frame(job.visual, &last_frame)
            .map_err(|e| StageError::encode("extract_last_frame", e))?;
        transcoder
            .render_still(&last_frame, job.extend_secs, &hold_clip)
            .map_err(|e| StageError::encode("render_still", e))?;
        transcoder
            .concatenate_stream_copy(
                &[job.visual.to_path_buf(), hold_clip.clone()],
                &list_file,
                &held_visual,
                true,
            )
            .map_err(|e| StageError::encode("concatenate_stream_copy", e))?;
        transcoder
            .mux_shortest(&held_visual, job.audio, job.output)
            .map_err(|e| StageError::encode("mux_shortest", e))
    }
}

/// Strategy implementing `mode`.
pub fn strategy_for(mode: ExtensionMode) -> Box<dyn ExtensionStrategy> {
    match mode {
        ExtensionMode::SinglePass => Box::new(SinglePassHold),
        ExtensionMode::MultiPass => Box::new(MultiPassHold),
    }
}

pub struct DurationReconciler<'a> {
    transcoder: &'a dyn MediaTranscoder,
    primary: Box<dyn ExtensionStrategy>,
    fallback: Option<Box<dyn ExtensionStrategy>>,
    threshold_secs: f64,
    tolerance_secs: f64,
}

impl<'a> DurationReconciler<'a> {
    /// Reconciler using the configured primary strategy, with the other
    /// one as fallback when enabled.
    pub fn new(transcoder: &'a dyn MediaTranscoder, settings: &AssemblySettings) -> Self {
        let fallback = settings
            .extension_fallback
            .then(|| strategy_for(settings.extension.alternate()));
        Self::with_strategies(
            transcoder,
            strategy_for(settings.extension),
            fallback,
            settings.extension_threshold_secs,
            settings.duration_tolerance_secs,
        )
    }

    pub fn with_strategies(
        transcoder: &'a dyn MediaTranscoder,
        primary: Box<dyn ExtensionStrategy>,
        fallback: Option<Box<dyn ExtensionStrategy>>,
        threshold_secs: f64,
        tolerance_secs: f64,
    ) -> Self {
        Self {
            transcoder,
            primary,
            fallback,
            threshold_secs: threshold_secs.max(0.0),
            tolerance_secs,
        }
    }

    /// Produce `output` from `visual` and the narration, matched in length.
    pub fn reconcile(
        &self,
        visual: &Path,
        audio: &MediaAsset,
        scratch: &Path,
        output: &Path,
    ) -> StageResult<(MediaAsset, Reconciliation)> {
        let probe = DurationProbe::new(self.transcoder);
        let v = probe
            .visual_duration(visual)
            .map_err(|e| StageError::measure("visual clip", e))?;
        let a = match audio.duration_secs() {
            Some(secs) => secs,
            None => probe
                .probe(audio.path())
                .map_err(|e| StageError::measure("narration", e))?,
        };
        let extend = a - v;

        if extend <= self.threshold_secs {
            self.transcoder
                .mux_shortest(visual, audio.path(), output)
                .map_err(|e| StageError::encode("mux_shortest", e))?;
            let result = probe
                .probe(output)
                .map_err(|e| StageError::measure("trimmed clip", e))?;
            self.check("mux_shortest", v.min(a), result)?;

            tracing::debug!(visual = v, audio = a, result, "trimmed to shortest stream");
            return Ok((
                MediaAsset::probed_video(output, result),
                Reconciliation::Trimmed {
                    visual_secs: v,
                    audio_secs: a,
                    result_secs: result,
                },
            ));
        }

        let job = ExtensionJob {
            visual,
            audio: audio.path(),
            visual_secs: v,
            extend_secs: extend,
            scratch,
            output,
        };

        let (strategy, result, used_fallback) = match self.attempt(self.primary.as_ref(), &job, a) {
            Ok(result) => (self.primary.mode(), result, false),
            Err(primary_err) => {
                let Some(fallback) = self.fallback.as_deref() else {
                    return Err(primary_err);
                };
                tracing::warn!(
                    "{} hold failed ({}), retrying with {}",
                    self.primary.mode(),
                    primary_err,
                    fallback.mode()
                );
                match self.attempt(fallback, &job, a) {
                    Ok(result) => (fallback.mode(), result, true),
                    Err(fallback_err) => {
                        return Err(StageError::ExtensionFailed(format!(
                            "{}: {}; {}: {}",
                            self.primary.mode(),
                            primary_err,
                            fallback.mode(),
                            fallback_err
                        )))
                    }
                }
            }
        };

        tracing::debug!(visual = v, audio = a, extend, result, "held last frame");
        Ok((
            MediaAsset::probed_video(output, result),
            Reconciliation::Extended {
                visual_secs: v,
                audio_secs: a,
                extend_secs: extend,
                result_secs: result,
                strategy,
                used_fallback,
            },
        ))
    }

    fn attempt(
        &self,
        strategy: &dyn ExtensionStrategy,
        job: &ExtensionJob<'_>,
        expected: f64,
    ) -> StageResult<f64> {
        strategy.extend(self.transcoder, job)?;
        let result = DurationProbe::new(self.transcoder)
            .probe(job.output)
            .map_err(|e| StageError::measure("extended clip", e))?;
        self.check("frame hold", expected, result)?;
        Ok(result)
    }

    fn check(&self, operation: &'static str, expected: f64, actual: f64) -> StageResult<()> {
        if (actual - expected).abs() > self.tolerance_secs {
            return Err(StageError::DurationMismatch {
                operation,
                expected,
                actual,
                tolerance: self.tolerance_secs,
            });
        }
        Ok(())
    }
}
