//! Page numbers and per-page units of work.

use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::{ExtensionMode, FailureKind, PageStatus};
use super::media::MediaAsset;

/// A positive page number parsed from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageNumber(NonZeroU32);

impl PageNumber {
    /// Create a page number. Returns `None` for zero.
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(&self) -> u32 {
        self.0.get()
    }

    /// Stem used for every file belonging to this page (`page_<n>`).
    pub fn file_stem(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.get())
    }
}

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why a file name could not be read as a page file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageNameError {
    #[error("'{name}' does not start with '{prefix}'")]
    MissingPrefix { name: String, prefix: String },

    #[error("'{name}' does not have extension '{extension}'")]
    WrongExtension { name: String, extension: String },

    #[error("'{name}' has no page number ('{digits}' is not a number)")]
    NotANumber { name: String, digits: String },

    #[error("'{name}' uses page number 0; pages start at 1")]
    Zero { name: String },
}

/// Split `<prefix><body>.<extension>` and return `body`.
fn page_body<'a>(
    name: &'a str,
    prefix: &str,
    extension: &str,
) -> Result<&'a str, PageNameError> {
    let rest = name
        .strip_prefix(prefix)
        .ok_or_else(|| PageNameError::MissingPrefix {
            name: name.to_string(),
            prefix: prefix.to_string(),
        })?;

    let wrong_extension = || PageNameError::WrongExtension {
        name: name.to_string(),
        extension: extension.to_string(),
    };
    let (body, ext) = rest.rsplit_once('.').ok_or_else(wrong_extension)?;
    if !ext.eq_ignore_ascii_case(extension) {
        return Err(wrong_extension());
    }
    Ok(body)
}

fn parse_number(name: &str, digits: &str) -> Result<PageNumber, PageNameError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageNameError::NotANumber {
            name: name.to_string(),
            digits: digits.to_string(),
        });
    }
    let value: u32 = digits.parse().map_err(|_| PageNameError::NotANumber {
        name: name.to_string(),
        digits: digits.to_string(),
    })?;
    PageNumber::new(value).ok_or_else(|| PageNameError::Zero {
        name: name.to_string(),
    })
}

/// Parse a page file name such as `page_12.png`.
///
/// Leading zeros are accepted (`page_007.png` is page 7).
pub fn parse_page_number(
    name: &str,
    prefix: &str,
    extension: &str,
) -> Result<PageNumber, PageNameError> {
    let body = page_body(name, prefix, extension)?;
    parse_number(name, body)
}

/// Parse a reveal frame name such as `page_3_2.png` into `(page, step)`.
pub fn parse_reveal_frame(
    name: &str,
    prefix: &str,
    extension: &str,
) -> Result<(PageNumber, u32), PageNameError> {
    let body = page_body(name, prefix, extension)?;
    let (page, step) = body.split_once('_').ok_or_else(|| PageNameError::NotANumber {
        name: name.to_string(),
        digits: body.to_string(),
    })?;
    let page = parse_number(name, page)?;
    if step.is_empty() || !step.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageNameError::NotANumber {
            name: name.to_string(),
            digits: step.to_string(),
        });
    }
    let step = step.parse().map_err(|_| PageNameError::NotANumber {
        name: name.to_string(),
        digits: step.to_string(),
    })?;
    Ok((page, step))
}

/// Parse the page number of a path's file name.
pub fn page_number_of(
    path: &Path,
    prefix: &str,
    extension: &str,
) -> Result<PageNumber, PageNameError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    parse_page_number(&name, prefix, extension)
}

/// A recorded page failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub kind: FailureKind,
    pub reason: String,
    /// Status the page had reached when it failed.
    pub failed_at: PageStatus,
}

/// How the reconciler matched the visual track to the narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case", rename_all = "snake_case")]
pub enum Reconciliation {
    /// Audio was not longer than the visual: trimmed to the shorter stream.
    Trimmed {
        visual_secs: f64,
        audio_secs: f64,
        result_secs: f64,
    },
    /// Audio was longer: the last frame was held for `extend_secs`.
    Extended {
        visual_secs: f64,
        audio_secs: f64,
        extend_secs: f64,
        result_secs: f64,
        strategy: ExtensionMode,
        used_fallback: bool,
    },
}

impl Reconciliation {
    /// Duration of the reconciled clip.
    pub fn result_secs(&self) -> f64 {
        match self {
            Reconciliation::Trimmed { result_secs, .. } => *result_secs,
            Reconciliation::Extended { result_secs, .. } => *result_secs,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Reconciliation::Extended { .. })
    }
}

/// Effective fade timings for one clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadePlan {
    /// Length of the clip the plan was made for.
    pub clip_secs: f64,
    /// Fade-in length, starting at 0.
    pub fade_in_secs: f64,
    /// Fade-out length, ending at `clip_secs`.
    pub fade_out_secs: f64,
    /// Whether the requested fade was shortened to fit the clip.
    pub adapted: bool,
}

impl FadePlan {
    /// Timestamp at which the fade-out begins.
    pub fn fade_out_start(&self) -> f64 {
        (self.clip_secs - self.fade_out_secs).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.fade_in_secs <= 0.0 && self.fade_out_secs <= 0.0
    }
}

/// One slide's worth of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageUnit {
    pub page_number: PageNumber,
    /// Still image for the page.
    pub image: Option<MediaAsset>,
    /// Narration audio for the page.
    pub audio: Option<MediaAsset>,
    /// Cumulative reveal frames, in reveal order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reveal_frames: Vec<MediaAsset>,
    /// Pre-rendered per-page animation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<MediaAsset>,
    /// Clip produced by the engine; after reconciliation this is the
    /// per-page output clip.
    pub clip: Option<MediaAsset>,
    /// Faded copy handed to the concatenator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faded: Option<MediaAsset>,
    pub status: PageStatus,
    pub failure: Option<PageFailure>,
    pub reconciliation: Option<Reconciliation>,
    /// Whether the clip needed a remux repair to carry audio.
    pub audio_repaired: bool,
    pub fade: Option<FadePlan>,
}

impl PageUnit {
    /// Create a pending page with no assets.
    pub fn new(page_number: PageNumber) -> Self {
        Self {
            page_number,
            image: None,
            audio: None,
            reveal_frames: Vec::new(),
            animation: None,
            clip: None,
            faded: None,
            status: PageStatus::Pending,
            failure: None,
            reconciliation: None,
            audio_repaired: false,
            fade: None,
        }
    }

    pub fn with_image(mut self, image: MediaAsset) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_audio(mut self, audio: MediaAsset) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_reveal_frames(mut self, frames: Vec<MediaAsset>) -> Self {
        self.reveal_frames = frames;
        self
    }

    pub fn with_animation(mut self, animation: MediaAsset) -> Self {
        self.animation = Some(animation);
        self
    }

    /// Move to `status`, which must be the next state on the success path.
    ///
    /// Returns `false` (and leaves the page untouched) for any other move.
    pub fn advance(&mut self, status: PageStatus) -> bool {
        if self.status.next() == Some(status) {
            self.status = status;
            true
        } else {
            false
        }
    }

    /// Mark the page failed. The first recorded failure is kept.
    pub fn fail(&mut self, kind: FailureKind, reason: impl Into<String>) {
        if self.status == PageStatus::Failed {
            return;
        }
        self.failure = Some(PageFailure {
            kind,
            reason: reason.into(),
            failed_at: self.status,
        });
        self.status = PageStatus::Failed;
    }

    pub fn is_failed(&self) -> bool {
        self.status == PageStatus::Failed
    }

    pub fn is_transitioned(&self) -> bool {
        self.status == PageStatus::Transitioned
    }

    /// Path of the current clip, if any.
    pub fn clip_path(&self) -> Option<&Path> {
        self.clip.as_ref().map(|c| c.path())
    }

    /// Clip that goes into the final artifact.
    pub fn concat_source(&self) -> Option<&Path> {
        self.faded
            .as_ref()
            .or(self.clip.as_ref())
            .map(|c| c.path())
    }

    /// Label used in logs (`page 3`).
    pub fn label(&self) -> String {
        format!("page {}", self.page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32) -> PageNumber {
        PageNumber::new(n).unwrap()
    }

    #[test]
    fn parses_plain_page_names() {
        assert_eq!(parse_page_number("page_1.png", "page_", "png"), Ok(page(1)));
        assert_eq!(parse_page_number("page_10.mp3", "page_", "mp3"), Ok(page(10)));
        assert_eq!(parse_page_number("page_007.PNG", "page_", "png"), Ok(page(7)));
    }

    #[test]
    fn rejects_malformed_page_names() {
        assert!(matches!(
            parse_page_number("slide_1.png", "page_", "png"),
            Err(PageNameError::MissingPrefix { .. })
        ));
        assert!(matches!(
            parse_page_number("page_1.jpg", "page_", "png"),
            Err(PageNameError::WrongExtension { .. })
        ));
        assert!(matches!(
            parse_page_number("page_one.png", "page_", "png"),
            Err(PageNameError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_page_number("page_-1.png", "page_", "png"),
            Err(PageNameError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_page_number("page_0.png", "page_", "png"),
            Err(PageNameError::Zero { .. })
        ));
        assert!(matches!(
            parse_page_number("page_.png", "page_", "png"),
            Err(PageNameError::NotANumber { .. })
        ));
    }

    #[test]
    fn reveal_frame_names_are_not_page_names() {
        assert!(parse_page_number("page_3_2.png", "page_", "png").is_err());
        assert_eq!(
            parse_reveal_frame("page_3_2.png", "page_", "png"),
            Ok((page(3), 2))
        );
        assert!(parse_reveal_frame("page_3.png", "page_", "png").is_err());
        assert!(parse_reveal_frame("page_3_x.png", "page_", "png").is_err());
    }

    #[test]
    fn page_numbers_order_numerically() {
        let mut pages = vec![page(10), page(2), page(1)];
        pages.sort();
        assert_eq!(pages, vec![page(1), page(2), page(10)]);
    }

    #[test]
    fn advance_only_moves_forward_one_step() {
        let mut unit = PageUnit::new(page(1));
        assert!(!unit.advance(PageStatus::Reconciled));
        assert!(unit.advance(PageStatus::Synthesized));
        assert!(unit.advance(PageStatus::Reconciled));
        assert!(!unit.advance(PageStatus::Synthesized));
        assert_eq!(unit.status, PageStatus::Reconciled);
    }

    #[test]
    fn first_failure_is_kept() {
        let mut unit = PageUnit::new(page(4));
        unit.advance(PageStatus::Synthesized);
        unit.fail(FailureKind::Encode, "ffmpeg exited with 1");
        unit.fail(FailureKind::AudioEmbed, "later");

        let failure = unit.failure.as_ref().unwrap();
        assert_eq!(failure.kind, FailureKind::Encode);
        assert_eq!(failure.failed_at, PageStatus::Synthesized);
        assert!(unit.is_failed());
        assert!(!unit.advance(PageStatus::Reconciled));
    }

    #[test]
    fn fade_plan_ends_at_clip_end() {
        let plan = FadePlan {
            clip_secs: 10.0,
            fade_in_secs: 1.0,
            fade_out_secs: 1.0,
            adapted: false,
        };
        assert_eq!(plan.fade_out_start(), 9.0);
        assert!(!plan.is_empty());
    }
}
