//! Fixtures shared by ingestion tests

use super::{Chunk, ChunkSink, RepositoryFetcher, RepositorySource};
use crate::error::{FetchError, SinkWriteError, VectorDbError};
use git2::{Repository, Signature};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

/// Create a git repository with one commit containing `files`
pub(crate) fn init_repo(files: &[(&str, &[u8])]) -> TempDir {
    let dir = TempDir::new().unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let mut index = repo.index().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        index.add_path(Path::new(name)).unwrap();
    }
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("Test", "test@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
        .unwrap();

    dir
}

pub(crate) fn source_for(dir: &TempDir) -> RepositorySource {
    RepositorySource::parse(dir.path().to_string_lossy()).unwrap()
}

/// Keeps every chunk it is given
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub(crate) chunks: Mutex<Vec<Chunk>>,
    pub(crate) writes: AtomicUsize,
}

impl RecordingSink {
    pub(crate) fn chunks(&self) -> Vec<Chunk> {
        self.chunks.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ChunkSink for RecordingSink {
    async fn write(&self, chunks: Vec<Chunk>) -> Result<usize, SinkWriteError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let n = chunks.len();
        self.chunks.lock().unwrap().extend(chunks);
        Ok(n)
    }
}

/// Rejects every write
#[derive(Default)]
pub(crate) struct FailingSink {
    pub(crate) attempts: AtomicUsize,
}

#[async_trait::async_trait]
impl ChunkSink for FailingSink {
    async fn write(&self, _chunks: Vec<Chunk>) -> Result<usize, SinkWriteError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(VectorDbError::StoreFailed("store unavailable".to_string()).into())
    }
}

/// Writes `files` into the destination instead of cloning, recording peak
/// concurrency. Sources containing `fail` are rejected.
pub(crate) struct FakeFetcher {
    files: Vec<(String, Vec<u8>)>,
    delay: Duration,
    active: AtomicUsize,
    pub(crate) peak: AtomicUsize,
    pub(crate) calls: AtomicUsize,
}

impl FakeFetcher {
    pub(crate) fn new(files: &[(&str, &[u8])], delay: Duration) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, content)| (name.to_string(), content.to_vec()))
                .collect(),
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

impl RepositoryFetcher for FakeFetcher {
    fn fetch(&self, source: &RepositorySource, dest: &Path) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        std::thread::sleep(self.delay);

        let result = if source.as_str().contains("fail") {
            Err(FetchError::CloneFailed {
                url: source.to_string(),
                reason: "simulated failure".to_string(),
            })
        } else {
            for (name, content) in &self.files {
                let path = dest.join(name);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(path, content).unwrap();
            }
            Ok(())
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
