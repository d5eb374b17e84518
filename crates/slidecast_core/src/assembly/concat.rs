//! Joining finished page clips into the final artifact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::scratch::ScratchSpace;
use crate::models::{PageNumber, PageUnit};
use crate::transcode::{MediaTranscoder, TranscodeError};

/// Name of the concat list written into the run scratch directory.
pub const CONCAT_LIST_FILE: &str = "concat_list.txt";

#[derive(Error, Debug)]
pub enum ConcatError {
    /// No page reached the end of the pipeline.
    #[error("No page produced a clip; nothing to concatenate")]
    NoClips,

    #[error("Clip for page {page} is missing: {}", .path.display())]
    MissingClip { page: PageNumber, path: PathBuf },

    #[error("Concatenation failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Final artifact {} is missing or empty", .0.display())]
    EmptyOutput(PathBuf),

    #[error("I/O error during concatenation: {0}")]
    Io(#[from] io::Error),
}

/// Clips of transitioned pages, ascending by page number.
///
/// Discovery order never matters; `page_2` always comes before `page_10`.
pub fn ordered_clips(pages: &[PageUnit]) -> Result<Vec<(PageNumber, PathBuf)>, ConcatError> {
    let mut done: Vec<&PageUnit> = pages.iter().filter(|p| p.is_transitioned()).collect();
    done.sort_by_key(|p| p.page_number);

    done.into_iter()
        .map(|page| {
            let path = page
                .concat_source()
                .map(Path::to_path_buf)
                .ok_or_else(|| ConcatError::MissingClip {
                    page: page.page_number,
                    path: PathBuf::new(),
                })?;
            if !path.is_file() {
                return Err(ConcatError::MissingClip {
                    page: page.page_number,
                    path,
                });
            }
            Ok((page.page_number, path))
        })
        .collect()
}

pub struct Concatenator<'a> {
    transcoder: &'a dyn MediaTranscoder,
    scratch: &'a ScratchSpace,
}

impl<'a> Concatenator<'a> {
    pub fn new(transcoder: &'a dyn MediaTranscoder, scratch: &'a ScratchSpace) -> Self {
        Self {
            transcoder,
            scratch,
        }
    }

    /// Join every transitioned page into `output` by stream copy.
    ///
    /// Nothing is written when no page is eligible.
    pub fn concatenate(&self, pages: &[PageUnit], output: &Path) -> Result<PathBuf, ConcatError> {
        let clips = ordered_clips(pages)?;
        if clips.is_empty() {
            return Err(ConcatError::NoClips);
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.scratch.create()?;

        let order: Vec<u32> = clips.iter().map(|(n, _)| n.get()).collect();
        tracing::info!("Concatenating {} clips in page order {:?}", clips.len(), order);

        let paths: Vec<PathBuf> = clips.into_iter().map(|(_, p)| p).collect();
        let list_file = self.scratch.file(CONCAT_LIST_FILE);
        self.transcoder
            .concatenate_stream_copy(&paths, &list_file, output, false)?;

        match fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => Ok(output.to_path_buf()),
            _ => Err(ConcatError::EmptyOutput(output.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaAsset, PageStatus};
    use crate::transcode::fake::{read_media, write_clip, FakeTranscoder};
    use tempfile::tempdir;

    fn finished(dir: &Path, n: u32) -> PageUnit {
        let clip = dir.join(format!("faded_page_{}.mp4", n));
        write_clip(&clip, 2.0, Some(2.0), &format!("slide-{}", n));
        let mut page = PageUnit::new(PageNumber::new(n).unwrap());
        page.faded = Some(MediaAsset::video(&clip));
        page.status = PageStatus::Transitioned;
        page
    }

    #[test]
    fn concatenates_in_numeric_order() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::at(dir.path().join("scratch"));
        let pages = vec![
            finished(dir.path(), 10),
            finished(dir.path(), 2),
            finished(dir.path(), 1),
        ];
        let output = dir.path().join("out").join("final.mp4");

        let fake = FakeTranscoder::new();
        let written = Concatenator::new(&fake, &scratch)
            .concatenate(&pages, &output)
            .unwrap();
        assert_eq!(written, output);

        let media = read_media(&output);
        assert_eq!(media.frame_sequence(), vec!["slide-1", "slide-2", "slide-10"]);
        assert_eq!(media.duration, 6.0);
        assert_eq!(media.audio, Some(6.0));

        let list = fs::read_to_string(scratch.file(CONCAT_LIST_FILE)).unwrap();
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("faded_page_1.mp4'"));
        assert!(lines[2].ends_with("faded_page_10.mp4'"));
    }

    #[test]
    fn failed_pages_are_left_out() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::at(dir.path().join("scratch"));
        let mut pages = vec![finished(dir.path(), 1), finished(dir.path(), 2)];
        pages[1].fail(crate::models::FailureKind::Encode, "boom");

        let fake = FakeTranscoder::new();
        let output = dir.path().join("final.mp4");
        Concatenator::new(&fake, &scratch)
            .concatenate(&pages, &output)
            .unwrap();
        assert_eq!(read_media(&output).frame_sequence(), vec!["slide-1"]);
    }

    #[test]
    fn no_clips_writes_nothing() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::at(dir.path().join("scratch"));
        let mut page = finished(dir.path(), 1);
        page.fail(crate::models::FailureKind::MissingAsset, "no audio");

        let fake = FakeTranscoder::new();
        let output = dir.path().join("out").join("final.mp4");
        let err = Concatenator::new(&fake, &scratch)
            .concatenate(&[page], &output)
            .unwrap_err();
        assert!(matches!(err, ConcatError::NoClips));
        assert!(!output.exists());
        assert!(!output.parent().unwrap().exists());
        assert_eq!(fake.total_calls(), 0);
    }

    #[test]
    fn missing_clip_is_reported() {
        let dir = tempdir().unwrap();
        let scratch = ScratchSpace::at(dir.path().join("scratch"));
        let page = finished(dir.path(), 4);
        fs::remove_file(page.concat_source().unwrap()).unwrap();

        let fake = FakeTranscoder::new();
        let err = Concatenator::new(&fake, &scratch)
            .concatenate(&[page], &dir.path().join("final.mp4"))
            .unwrap_err();
        assert!(matches!(err, ConcatError::MissingClip { .. }));
    }
}
