//! Per-page assembly stages.
//!
//! Each stage works on one page and knows nothing about the others:
//! - [`DurationProbe`]: measured durations, cached per asset
//! - [`PageSynthesizer`]: still-image or reveal visual track
//! - [`DurationReconciler`]: trims or holds the last frame so the clip
//!   matches its narration
//! - [`AudioEmbedVerifier`]: confirms the clip carries audio, repairing
//!   it by remux if needed
//! - [`TransitionEncoder`]: fade-in/fade-out copy
//! - [`Concatenator`]: joins finished pages in page order
//!
//! The orchestrator drives these through the page pipeline.

mod concat;
mod error;
mod probe;
mod reconciler;
mod scratch;
mod synthesizer;
mod transition;
mod verifier;

pub use concat::{ordered_clips, ConcatError, Concatenator, CONCAT_LIST_FILE};
pub use error::{StageError, StageResult};
pub use probe::{DurationProbe, ProbeError, ProbeResult};
pub use reconciler::{
    strategy_for, DurationReconciler, ExtensionJob, ExtensionStrategy, MultiPassHold,
    SinglePassHold,
};
pub use scratch::{replace_file, ScratchSpace};
pub use synthesizer::{
    require_audio, synthesizer_for, PageSynthesizer, RevealSynthesizer, StillImageSynthesizer,
};
pub use transition::{plan_fade, TransitionEncoder};
pub use verifier::{AudioCheck, AudioEmbedVerifier, Verification};
