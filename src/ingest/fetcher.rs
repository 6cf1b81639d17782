//! Cloning repositories into a working directory

use super::RepositorySource;
use crate::config::IngestionConfig;
use crate::error::FetchError;
use git2::build::RepoBuilder;
use git2::{ErrorClass, ErrorCode, FetchOptions};
use std::path::Path;

/// Fetches a repository snapshot into a local directory
///
/// Blocking; the pipeline calls it from `spawn_blocking`.
pub trait RepositoryFetcher: Send + Sync {
    fn fetch(&self, source: &RepositorySource, dest: &Path) -> Result<(), FetchError>;
}

/// libgit2-backed fetcher
#[derive(Debug, Clone, Default)]
pub struct GitFetcher {
    branch: Option<String>,
    depth: u32,
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            branch: config.branch.clone(),
            depth: config.clone_depth,
        }
    }

    /// Check out `branch` instead of the remote HEAD
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Limit history to `depth` commits (0 = full history)
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

impl RepositoryFetcher for GitFetcher {
    fn fetch(&self, source: &RepositorySource, dest: &Path) -> Result<(), FetchError> {
        tracing::info!("Cloning {} into {}", source, dest.display());

        let mut fetch_options = FetchOptions::new();
        if self.depth > 0 {
            fetch_options.depth(i32::try_from(self.depth).unwrap_or(i32::MAX));
        }

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let Some(branch) = &self.branch {
            builder.branch(branch);
        }

        builder
            .clone(source.as_str(), dest)
            .map(|_| ())
            .map_err(|e| classify_git_error(source, e))
    }
}

/// Map a libgit2 failure onto the fetch taxonomy
pub(crate) fn classify_git_error(source: &RepositorySource, err: git2::Error) -> FetchError {
    let url = source.to_string();
    let reason = err.message().to_string();
    let lowered = reason.to_lowercase();

    if err.code() == ErrorCode::Auth || lowered.contains("authentication") {
        return FetchError::Authentication { url, reason };
    }

    if lowered.contains("unsupported url protocol")
        || lowered.contains("malformed url")
        || lowered.contains("failed to resolve path")
        || err.code() == ErrorCode::NotFound
        || err.class() == ErrorClass::Invalid
    {
        return FetchError::InvalidUrl { url, reason };
    }

    match err.class() {
        ErrorClass::Net | ErrorClass::Ssl | ErrorClass::Ssh => FetchError::Network { url, reason },
        _ => FetchError::CloneFailed { url, reason },
    }
}
