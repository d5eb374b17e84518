//! Slidecast Core - audio-synchronized slide video assembly
//!
//! Turns a deck of numbered slide images and per-slide narration into
//! one video: each page becomes a clip exactly as long as its narration,
//! clips get fade transitions, and finished pages are joined in page
//! order. Pages fail independently; a run only fails when no page
//! produces a clip.
//!
//! This crate contains all engine logic with zero UI dependencies. All
//! media work goes through an external transcoder (ffmpeg/ffprobe).

pub mod assembly;
pub mod config;
pub mod discovery;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod transcode;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
