//! Extension-based admission of files into the pipeline

use std::path::{Path, PathBuf};

/// How an admitted file is turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Pdf,
}

/// A file the filter admitted, tagged with its loader
#[derive(Debug, Clone)]
pub struct IngestibleFile {
    pub path: PathBuf,
    pub kind: FileKind,
}

/// Admits files whose name ends in one of a fixed set of extensions
///
/// Matching is a case-insensitive suffix test on the file name, so
/// `NOTES.MD` and `archive.tar.json` are both admitted.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    suffixes: Vec<String>,
}

impl ContentFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut suffixes: Vec<String> = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{ext}"))
            .collect();
        suffixes.sort();
        suffixes.dedup();
        Self { suffixes }
    }

    /// Classify a path, or `None` when it is not ingestible
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        let suffix = self.suffixes.iter().find(|s| name.ends_with(s.as_str()))?;

        Some(if suffix == ".pdf" {
            FileKind::Pdf
        } else {
            FileKind::Text
        })
    }

    pub fn is_ingestible(&self, path: &Path) -> bool {
        self.classify(path).is_some()
    }

    /// Admit `path`, logging the skip at debug level when it is not ingestible
    pub fn admit(&self, path: PathBuf) -> Option<IngestibleFile> {
        match self.classify(&path) {
            Some(kind) => Some(IngestibleFile { path, kind }),
            None => {
                tracing::debug!("Skipping non-ingestible file: {}", path.display());
                None
            }
        }
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(crate::config::default_extensions())
    }
}
