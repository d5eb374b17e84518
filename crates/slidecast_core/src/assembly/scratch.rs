//! Per-run scratch directory with one isolated subdirectory per page.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::models::PageNumber;

/// Scratch space for one run.
///
/// Lives under the configured scratch folder so it never collides with
/// other files kept there (such as animation clips).
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// Use `root` as the run directory.
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Fresh run directory under `base` (`<base>/run_<timestamp>`).
    pub fn for_run(base: &Path) -> Self {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%3f");
        Self::at(base.join(format!("run_{}_{}", stamp, std::process::id())))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn create(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    /// Isolated directory for one page (`page_<n>`).
    pub fn page_dir(&self, page: PageNumber) -> PathBuf {
        self.root.join(format!("page_{}", page))
    }

    pub fn create_page(&self, page: PageNumber) -> io::Result<PathBuf> {
        let dir = self.page_dir(page);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Remove a page's directory. Missing directories are fine.
    pub fn remove_page(&self, page: PageNumber) -> io::Result<()> {
        remove_dir_if_exists(&self.page_dir(page))
    }

    /// Path of a run-level file such as the concat list.
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Remove the whole run directory.
    pub fn remove(&self) -> io::Result<()> {
        remove_dir_if_exists(&self.root)
    }
}

fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Move `from` over `to`, copying when a rename cannot cross filesystems.
pub fn replace_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
