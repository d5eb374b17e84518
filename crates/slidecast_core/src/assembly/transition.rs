//! Fade-in/fade-out transitions on reconciled clips.

use std::path::Path;

use super::error::{StageError, StageResult};
use super::probe::DurationProbe;
use crate::models::{FadePlan, MediaAsset};
use crate::transcode::MediaTranscoder;

/// Fade timings for a clip of `clip_secs` with `requested_secs` fades.
///
/// Both fades shrink to a third of the clip when the clip is shorter than
/// two full fades, so they never overlap. The fade-out always ends at the
/// end of the clip.
pub fn plan_fade(clip_secs: f64, requested_secs: f64) -> FadePlan {
    if requested_secs <= 0.0 || clip_secs <= 0.0 {
        return FadePlan {
            clip_secs: clip_secs.max(0.0),
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
            adapted: false,
        };
    }

    let (fade, adapted) = if clip_secs < 2.0 * requested_secs {
        (clip_secs / 3.0, true)
    } else {
        (requested_secs, false)
    };

    FadePlan {
        clip_secs,
        fade_in_secs: fade,
        fade_out_secs: fade,
        adapted,
    }
}

pub struct TransitionEncoder<'a> {
    transcoder: &'a dyn MediaTranscoder,
    requested_secs: f64,
}

impl<'a> TransitionEncoder<'a> {
    pub fn new(transcoder: &'a dyn MediaTranscoder, requested_secs: f64) -> Self {
        Self {
            transcoder,
            requested_secs,
        }
    }

    /// Write a faded copy of `clip` to `output`.
    ///
    /// The copy goes through the same re-encode even when no fade applies,
    /// so every concatenated clip shares one audio profile.
    pub fn apply(&self, clip: &Path, output: &Path) -> StageResult<(MediaAsset, FadePlan)> {
        let probe = DurationProbe::new(self.transcoder);
        let secs = probe.probe(clip)?;
        let plan = plan_fade(secs, self.requested_secs);
        if plan.adapted {
            tracing::debug!(
                "{:.3}s clip too short for {:.3}s fades, using {:.3}s",
                secs,
                self.requested_secs,
                plan.fade_in_secs
            );
        }

        self.transcoder
            .apply_fade(clip, &plan, output)
            .map_err(|e| StageError::encode("apply_fade", e))?;

        let faded = probe.probe(output)?;
        Ok((MediaAsset::probed_video(output, faded), plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use crate::transcode::fake::{read_media, write_clip, FakeTranscoder};
    use tempfile::tempdir;

    #[test]
    fn long_clip_keeps_requested_fade() {
        let plan = plan_fade(10.0, 1.0);
        assert_eq!(plan.fade_in_secs, 1.0);
        assert_eq!(plan.fade_out_secs, 1.0);
        assert_eq!(plan.fade_out_start(), 9.0);
        assert!(!plan.adapted);
    }

    #[test]
    fn short_clip_uses_a_third() {
        let plan = plan_fade(1.5, 1.0);
        assert!(plan.adapted);
        assert!((plan.fade_in_secs - 0.5).abs() < 1e-9);
        assert!((plan.fade_out_start() + plan.fade_out_secs - 1.5).abs() < 1e-9);
        assert!(plan.fade_in_secs + plan.fade_out_secs <= plan.clip_secs);
    }

    #[test]
    fn exactly_two_fades_is_not_adapted() {
        let plan = plan_fade(2.0, 1.0);
        assert!(!plan.adapted);
        assert_eq!(plan.fade_out_start(), 1.0);
    }

    #[test]
    fn zero_fade_is_empty() {
        let plan = plan_fade(5.0, 0.0);
        assert!(plan.is_empty());
        assert_eq!(plan.fade_out_start(), 5.0);
    }

    #[test]
    fn apply_writes_faded_copy() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("page_1.mp4");
        let output = dir.path().join("faded_page_1.mp4");
        write_clip(&clip, 1.2, Some(1.2), "slide-1");

        let fake = FakeTranscoder::new();
        let (faded, plan) = TransitionEncoder::new(&fake, 1.0)
            .apply(&clip, &output)
            .unwrap();

        assert_eq!(faded.path(), output.as_path());
        assert!(plan.adapted);
        let written = read_media(&output).fade.unwrap();
        assert!((written.clip_secs - plan.clip_secs).abs() < 1e-9);
        assert!((written.fade_in_secs - 0.4).abs() < 1e-9);
        assert!((written.fade_out_secs - plan.fade_out_secs).abs() < 1e-9);
        assert_eq!(written.adapted, plan.adapted);
        // Source clip is left as it was
        assert_eq!(read_media(&clip).fade, None);
    }

    #[test]
    fn fade_failure_is_encode_error() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("page_1.mp4");
        write_clip(&clip, 4.0, Some(4.0), "slide-1");

        let fake = FakeTranscoder::new().fail("apply_fade");
        let err = TransitionEncoder::new(&fake, 1.0)
            .apply(&clip, &dir.path().join("faded.mp4"))
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::Encode);
    }
}
