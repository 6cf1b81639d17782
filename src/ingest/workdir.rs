//! Disposable per-job working directories

use crate::error::CleanupError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const WORKDIR_PREFIX: &str = "git-ingest-";

/// A uniquely named directory owned by one ingestion job
///
/// Removed by [`WorkingDirectory::cleanup`] on the normal path and by `Drop`
/// on every other path (errors, panics, cancelled futures).
#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
    removed: bool,
}

impl WorkingDirectory {
    /// Create a fresh directory under the system temp dir
    pub fn create() -> io::Result<Self> {
        Self::create_in(std::env::temp_dir())
    }

    /// Create a fresh directory under `base`
    pub fn create_in(base: impl AsRef<Path>) -> io::Result<Self> {
        let base = base.as_ref();
        fs::create_dir_all(base)?;

        let path = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir_in(base)?
            .keep();

        tracing::debug!("Created working directory {}", path.display());
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory tree, deepest entries first
    ///
    /// Individual failures do not stop the sweep; they are counted in the
    /// returned error.
    pub fn cleanup(mut self) -> Result<(), CleanupError> {
        self.removed = true;
        remove_tree(&self.path)
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = remove_tree(&self.path) {
            tracing::warn!("{}", e);
        }
    }
}

/// Order in which [`remove_tree`] visits entries: every child before its parent,
/// root last.
pub(crate) fn removal_order(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .contents_first(true)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .collect()
}

pub(crate) fn remove_tree(root: &Path) -> Result<(), CleanupError> {
    if fs::symlink_metadata(root).is_err() {
        return Ok(());
    }

    let mut failures = 0;

    for entry in WalkDir::new(root).contents_first(true).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Cannot visit entry during cleanup: {}", e);
                failures += 1;
                continue;
            }
        };

        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            remove_file_forcing(path)
        };

        if let Err(e) = result {
            tracing::debug!("Failed to delete {}: {}", path.display(), e);
            failures += 1;
        }
    }

    if failures == 0 {
        tracing::debug!("Removed working directory {}", root.display());
        Ok(())
    } else {
        Err(CleanupError {
            path: root.to_path_buf(),
            failures,
        })
    }
}

/// Git marks pack files read-only, which blocks deletion on Windows
fn remove_file_forcing(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            let mut permissions = fs::symlink_metadata(path)?.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
            fs::remove_file(path)
        }
        other => other,
    }
}
