//! Stub collaborators for client and server tests

use super::RagClient;
use crate::chat::ChatModel;
use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{ChatError, EmbeddingError};
use crate::ingest::test_support::init_repo;
use crate::vector_db::LanceVectorDB;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub(crate) const DIM: usize = 16;

/// Hashes words into a small normalized bag-of-words vector
#[derive(Default)]
pub(crate) struct HashingEmbedder {
    pub(crate) calls: AtomicUsize,
    pub(crate) delay: Option<Duration>,
}

impl EmbeddingProvider for HashingEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(texts.iter().map(|t| embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for word in text.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if word.is_empty() {
            continue;
        }
        let bucket = word.bytes().fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
        v[bucket % DIM] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

#[derive(Default)]
pub(crate) struct RecordingChatModel {
    pub(crate) prompts: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl ChatModel for RecordingChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, ChatError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("stub answer".to_string())
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

pub(crate) struct TestClient {
    pub(crate) client: RagClient,
    pub(crate) chat_model: Arc<RecordingChatModel>,
    pub(crate) work_dir: TempDir,
    _db_dir: TempDir,
}

pub(crate) async fn create_test_client() -> TestClient {
    let db_dir = TempDir::new().unwrap();
    let work_dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.vector_db.lancedb_path = db_dir.path().to_path_buf();
    config.ingestion.work_dir = Some(work_dir.path().to_path_buf());
    config.ingestion.chunk_tokens = 64;
    config.embedding.batch_size = 4;

    let vector_db = Arc::new(
        LanceVectorDB::with_path(&db_dir.path().to_string_lossy())
            .await
            .unwrap(),
    );
    let chat_model = Arc::new(RecordingChatModel::default());
    let client = RagClient::from_parts(
        config,
        Arc::new(HashingEmbedder::default()),
        vector_db,
        chat_model.clone(),
    )
    .await
    .unwrap();

    TestClient {
        client,
        chat_model,
        work_dir,
        _db_dir: db_dir,
    }
}

pub(crate) fn sample_repo() -> TempDir {
    init_repo(&[
        (
            "README.md",
            b"The author is an experienced compiler engineer who writes parsers.",
        ),
        ("notes/cooking.txt", b"Bread needs flour water salt and yeast."),
        ("image.png", &[0x89, 0x50, 0x4e, 0x47]),
    ])
}

