//! Repository ingestion: clone, walk, filter, chunk, and hand chunks to a sink
//!
//! ```text
//! MultiRepoCoordinator ─▶ IngestionPipeline ─▶ RepositoryFetcher (git2)
//!                                  │
//!                                  ├─▶ FileWalker ─▶ ContentFilter
//!                                  ├─▶ pdf_extractor / UTF-8 read ─▶ TokenChunker
//!                                  └─▶ ChunkSink (embeddings + vector store)
//! ```
//!
//! Each job owns a [`WorkingDirectory`] that is removed on every exit path.

mod chunker;
mod coordinator;
mod fetcher;
mod file_walker;
mod filter;
mod pdf_extractor;
mod pipeline;
mod workdir;

#[cfg(test)]
pub(crate) mod test_support;

pub use chunker::{MIN_CHUNK_TOKENS, TokenChunker, TokenCounter};
pub use coordinator::{MAX_CONCURRENT_REPOS, MultiRepoCoordinator};
pub use fetcher::{GitFetcher, RepositoryFetcher};
pub use file_walker::FileWalker;
pub use filter::{ContentFilter, FileKind, IngestibleFile};
pub use pdf_extractor::{PdfPage, extract_pdf_pages};
pub use pipeline::{IngestionPipeline, PipelineOptions};
pub use workdir::WorkingDirectory;

use crate::error::{FetchError, SinkWriteError};
use crate::types::ChunkMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// URL or path of a repository to ingest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositorySource(String);

impl RepositorySource {
    /// Trim and validate a repository identifier
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, FetchError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(FetchError::InvalidUrl {
                url: raw.as_ref().to_string(),
                reason: "repository URL is empty".to_string(),
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(FetchError::InvalidUrl {
                url: trimmed.to_string(),
                reason: "repository URL contains control characters".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment without a trailing `.git`, e.g. `rust` for
    /// `https://github.com/rust-lang/rust.git`
    pub fn display_name(&self) -> &str {
        let tail = self
            .0
            .trim_end_matches('/')
            .rsplit(['/', ':', '\\'])
            .next()
            .unwrap_or(&self.0);
        tail.strip_suffix(".git").unwrap_or(tail)
    }
}

impl fmt::Display for RepositorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RepositorySource {
    type Error = FetchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RepositorySource> for String {
    fn from(source: RepositorySource) -> Self {
        source.0
    }
}

/// Text extracted from one file (or one PDF page) before chunking
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    /// Repository the file came from
    pub repository: String,
    /// Path relative to the repository root
    pub source_file: String,
    /// 1-based page number for PDF pages
    pub page: Option<u32>,
}

/// A token-bounded span of a document, ready for embedding
#[derive(Debug, Clone)]
pub struct Chunk {
    pub content: String,
    pub metadata: ChunkMetadata,
}

/// Destination for chunks produced by the pipeline
///
/// Implementations must tolerate concurrent writers: the batch coordinator
/// drives several pipelines against one sink.
#[async_trait::async_trait]
pub trait ChunkSink: Send + Sync {
    /// Write a batch of chunks, returning how many were stored
    async fn write(&self, chunks: Vec<Chunk>) -> Result<usize, SinkWriteError>;
}
