//! Lazy traversal of a cloned repository

use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Enumerates regular files under a root directory
///
/// Symlinks are not followed, so a link cycle cannot make the walk loop.
/// Directories named in `skip_dirs` are pruned rather than filtered
/// file-by-file, which keeps `.git` object stores out of the walk entirely.
pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) skip_dirs: Vec<String>,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
            skip_dirs: vec![".git".to_string()],
        }
    }

    pub fn with_skip_dirs(mut self, skip_dirs: Vec<String>) -> Self {
        self.skip_dirs = skip_dirs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute paths of every regular file under the root
    ///
    /// The iterator is lazy; calling `files` again restarts the walk.
    /// Unreadable entries are logged and skipped.
    pub fn files(&self) -> io::Result<impl Iterator<Item = PathBuf> + '_> {
        let metadata = std::fs::metadata(&self.root)?;
        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("Root path is not a directory: {}", self.root.display()),
            ));
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_pruned(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path);

        Ok(walker)
    }

    fn is_pruned(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self
                .skip_dirs
                .iter()
                .any(|skip| entry.file_name() == skip.as_str())
    }
}
