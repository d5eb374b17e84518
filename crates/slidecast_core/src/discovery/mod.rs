//! Page discovery from the configured input folders.
//!
//! Files are matched by name only (`page_<n>.<ext>`, reveal frames
//! `page_<n>_<k>.<ext>`); anything else in the folders is ignored. Every
//! page with a visual source or narration becomes a [`PageUnit`], so a page
//! with audio but no image is reported as a missing asset later instead
//! of vanishing.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Settings;
use crate::models::{
    parse_page_number, parse_reveal_frame, MediaAsset, PageNumber, PageUnit, SynthesisMode,
};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot read folder {}: {source}", .dir.display())]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two files in one folder resolve to the same page.
    #[error("Page {page} has two {what} files: {first} and {second}")]
    Duplicate {
        what: &'static str,
        page: PageNumber,
        first: String,
        second: String,
    },
}

/// File names in `dir`, sorted. A missing folder yields nothing.
fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, DiscoveryError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("{} does not exist, skipping", dir.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(DiscoveryError::ReadDir {
                dir: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::ReadDir {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        files.push((entry.file_name().to_string_lossy().to_string(), path));
    }
    files.sort();
    Ok(files)
}

/// Page files of one kind, keyed by page number.
fn scan_pages(
    dir: &Path,
    prefix: &str,
    extension: &str,
    what: &'static str,
) -> Result<BTreeMap<PageNumber, (String, PathBuf)>, DiscoveryError> {
    let mut found: BTreeMap<PageNumber, (String, PathBuf)> = BTreeMap::new();
    for (name, path) in list_files(dir)? {
        let page = match parse_page_number(&name, prefix, extension) {
            Ok(page) => page,
            Err(e) => {
                tracing::trace!("Ignoring {}: {}", name, e);
                continue;
            }
        };
        if let Some((first, _)) = found.get(&page) {
            return Err(DiscoveryError::Duplicate {
                what,
                page,
                first: first.clone(),
                second: name,
            });
        }
        found.insert(page, (name, path));
    }
    Ok(found)
}

/// Reveal frames per page, in step order.
fn scan_reveal_frames(
    dir: &Path,
    prefix: &str,
    extension: &str,
) -> Result<BTreeMap<PageNumber, Vec<MediaAsset>>, DiscoveryError> {
    let mut frames: BTreeMap<PageNumber, Vec<(u32, PathBuf)>> = BTreeMap::new();
    for (name, path) in list_files(dir)? {
        if let Ok((page, step)) = parse_reveal_frame(&name, prefix, extension) {
            frames.entry(page).or_default().push((step, path));
        }
    }

    Ok(frames
        .into_iter()
        .map(|(page, mut steps)| {
            steps.sort_by_key(|(step, _)| *step);
            let assets = steps.into_iter().map(|(_, p)| MediaAsset::image(p)).collect();
            (page, assets)
        })
        .collect())
}

/// Build page units from the configured folders, ascending by page number.
pub fn discover_pages(settings: &Settings) -> Result<Vec<PageUnit>, DiscoveryError> {
    let paths = &settings.paths;
    let prefix = paths.file_prefix.as_str();
    let reveal = settings.assembly.synthesis == SynthesisMode::Reveal;

    let images = scan_pages(&paths.image_dir(), prefix, &paths.image_extension, "image")?;
    let audio = scan_pages(&paths.audio_dir(), prefix, &paths.audio_extension, "audio")?;

    let mut pages: BTreeMap<PageNumber, PageUnit> = BTreeMap::new();
    for (page, (_, path)) in images {
        pages
            .entry(page)
            .or_insert_with(|| PageUnit::new(page))
            .image = Some(MediaAsset::image(path));
    }

    if reveal {
        let frames = scan_reveal_frames(&paths.image_dir(), prefix, &paths.image_extension)?;
        for (page, frames) in frames {
            pages
                .entry(page)
                .or_insert_with(|| PageUnit::new(page))
                .reveal_frames = frames;
        }

        let animations = scan_pages(
            &paths.animation_dir(),
            prefix,
            &paths.clip_extension,
            "animation",
        )?;
        for (page, (_, path)) in animations {
            pages
                .entry(page)
                .or_insert_with(|| PageUnit::new(page))
                .animation = Some(MediaAsset::video(path));
        }
    }

    for (page, (_, path)) in audio {
        pages
            .entry(page)
            .or_insert_with(|| PageUnit::new(page))
            .audio = Some(MediaAsset::audio(path));
    }

    let missing_audio: Vec<u32> = pages
        .values()
        .filter(|p| p.audio.is_none())
        .map(|p| p.page_number.get())
        .collect();
    if !missing_audio.is_empty() {
        tracing::warn!("Pages without narration: {:?}", missing_audio);
    }
    tracing::info!("Discovered {} pages", pages.len());

    Ok(pages.into_values().collect())
}
