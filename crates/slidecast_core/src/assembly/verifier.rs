//! Audio presence check with remux repair.
//!
//! Some encoder setups silently drop the audio stream. A clip without
//! audio is repaired by re-wrapping its video (no re-encode) together with
//! the original narration, then replacing the clip in place.

use std::path::Path;

use super::error::{StageError, StageResult};
use super::probe::DurationProbe;
use super::scratch::replace_file;
use crate::transcode::MediaTranscoder;

/// Outcome of inspecting a clip's streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCheck {
    HasAudio,
    NeedsRepair,
}

/// What verification did to a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// Result of the first check.
    pub initial: AudioCheck,
    /// Whether a remux repair replaced the clip.
    pub repaired: bool,
}

pub struct AudioEmbedVerifier<'a> {
    transcoder: &'a dyn MediaTranscoder,
}

impl<'a> AudioEmbedVerifier<'a> {
    pub fn new(transcoder: &'a dyn MediaTranscoder) -> Self {
        Self { transcoder }
    }

    /// Inspect the stream list of `clip`.
    pub fn check(&self, clip: &Path) -> StageResult<AudioCheck> {
        let info = DurationProbe::new(self.transcoder).inspect(clip)?;
        Ok(if info.has_audio() {
            AudioCheck::HasAudio
        } else {
            AudioCheck::NeedsRepair
        })
    }

    /// Make sure `clip` carries audio, repairing it from `narration` if not.
    ///
    /// A clip that already has audio is left untouched.
    pub fn verify(
        &self,
        clip: &Path,
        narration: &Path,
        scratch: &Path,
    ) -> StageResult<Verification> {
        let initial = self.check(clip)?;
        if initial == AudioCheck::HasAudio {
            return Ok(Verification {
                initial,
                repaired: false,
            });
        }

        let name = clip
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "clip.mp4".to_string());
        let repaired = scratch.join(format!("repaired_{}", name));

        tracing::info!("{} has no audio stream, remuxing narration", clip.display());
        self.transcoder
            .remux(clip, narration, &repaired)
            .map_err(|e| StageError::encode("remux", e))?;

        if self.check(&repaired)? != AudioCheck::HasAudio {
            let _ = std::fs::remove_file(&repaired);
            return Err(StageError::AudioEmbed {
                clip: clip.to_path_buf(),
            });
        }

        replace_file(&repaired, clip).map_err(|e| StageError::io("replacing repaired clip", e))?;

        Ok(Verification {
            initial,
            repaired: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use crate::transcode::fake::{read_media, write_audio, write_clip, FakeTranscoder};
    use tempfile::tempdir;

    #[test]
    fn clip_with_audio_is_untouched() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("page_1.mp4");
        let audio = dir.path().join("page_1.mp3");
        write_clip(&clip, 5.0, Some(5.0), "slide-1");
        write_audio(&audio, 5.0);
        let before = std::fs::read(&clip).unwrap();

        let fake = FakeTranscoder::new();
        let result = AudioEmbedVerifier::new(&fake)
            .verify(&clip, &audio, dir.path())
            .unwrap();

        assert_eq!(result.initial, AudioCheck::HasAudio);
        assert!(!result.repaired);
        assert_eq!(fake.calls("remux"), 0);
        assert_eq!(std::fs::read(&clip).unwrap(), before);
    }

    #[test]
    fn silent_clip_is_repaired_in_place() {
        let dir = tempdir().unwrap();
        let scratch = dir.path().join("scratch");
        std::fs::create_dir_all(&scratch).unwrap();
        let clip = dir.path().join("page_2.mp4");
        let audio = dir.path().join("page_2.mp3");
        write_clip(&clip, 5.0, None, "slide-2");
        write_audio(&audio, 5.0);

        let fake = FakeTranscoder::new();
        let verifier = AudioEmbedVerifier::new(&fake);
        assert_eq!(verifier.check(&clip).unwrap(), AudioCheck::NeedsRepair);

        let result = verifier.verify(&clip, &audio, &scratch).unwrap();
        assert_eq!(result.initial, AudioCheck::NeedsRepair);
        assert!(result.repaired);

        let media = read_media(&clip);
        assert_eq!(media.audio, Some(5.0));
        assert_eq!(media.video, Some(5.0));
        assert!(!scratch.join("repaired_page_2.mp4").exists());

        // Second pass finds audio and does nothing
        let again = verifier.verify(&clip, &audio, &scratch).unwrap();
        assert!(!again.repaired);
        assert_eq!(fake.calls("remux"), 1);
    }

    #[test]
    fn failed_repair_is_audio_embed_error() {
        let dir = tempdir().unwrap();
        let clip = dir.path().join("page_3.mp4");
        let audio = dir.path().join("page_3.mp3");
        write_clip(&clip, 5.0, None, "slide-3");
        write_audio(&audio, 5.0);

        let fake = FakeTranscoder::new().drop_audio("remux");
        let err = AudioEmbedVerifier::new(&fake)
            .verify(&clip, &audio, dir.path())
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::AudioEmbed);
        assert!(!dir.path().join("repaired_page_3.mp4").exists());
    }
}
