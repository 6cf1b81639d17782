/// End-to-end ingestion and chat through the public API
use anyhow::Result;
use git2::{Repository, Signature};
use repo_rag::RagClient;
use repo_rag::chat::ChatModel;
use repo_rag::config::Config;
use repo_rag::embedding::EmbeddingProvider;
use repo_rag::error::{ChatError, EmbeddingError, SinkWriteError};
use repo_rag::ingest::{
    Chunk, ChunkSink, ContentFilter, GitFetcher, IngestionPipeline, MultiRepoCoordinator,
    PipelineOptions, RepositorySource, TokenChunker,
};
use repo_rag::vector_db::LanceVectorDB;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a git repository with one commit
fn git_repo(files: &[(&str, &str)]) -> Result<TempDir> {
    let dir = TempDir::new()?;
    let repo = Repository::init(dir.path())?;
    let mut index = repo.index()?;
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        index.add_path(Path::new(name))?;
    }
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let sig = Signature::now("Test", "test@example.com")?;
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])?;
    Ok(dir)
}

#[derive(Default)]
struct CollectingSink {
    chunks: Mutex<Vec<Chunk>>,
}

#[async_trait::async_trait]
impl ChunkSink for CollectingSink {
    async fn write(&self, chunks: Vec<Chunk>) -> Result<usize, SinkWriteError> {
        let n = chunks.len();
        self.chunks.lock().unwrap().extend(chunks);
        Ok(n)
    }
}

/// One dimension per letter frequency; enough to separate unrelated texts
struct LetterEmbedder;

impl EmbeddingProvider for LetterEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; 26];
                for c in text.chars().filter(char::is_ascii_alphabetic) {
                    v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                }
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1.0);
                v.into_iter().map(|x| x / norm).collect()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        26
    }

    fn model_name(&self) -> &str {
        "letters"
    }
}

struct CannedModel;

#[async_trait::async_trait]
impl ChatModel for CannedModel {
    async fn complete(&self, prompt: &str) -> Result<String, ChatError> {
        Ok(format!("prompt had {} bytes", prompt.len()))
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

fn pipeline(sink: Arc<CollectingSink>, work_dir: &TempDir) -> Result<IngestionPipeline> {
    let options = PipelineOptions {
        work_dir: Some(work_dir.path().to_path_buf()),
        ..PipelineOptions::default()
    };
    Ok(IngestionPipeline::new(
        Arc::new(GitFetcher::new()),
        sink,
        Arc::new(TokenChunker::new(64)?),
        Arc::new(ContentFilter::default()),
    )
    .with_options(options))
}

#[tokio::test]
async fn test_pipeline_ingests_local_repository() -> Result<()> {
    let origin = git_repo(&[
        ("README.md", "# Demo\n\nA small demo repository."),
        ("src/app.py", "print('hello')"),
        ("assets/logo.svg", "<svg/>"),
    ])?;
    let work_dir = TempDir::new()?;
    let sink = Arc::new(CollectingSink::default());

    let source = RepositorySource::parse(origin.path().to_string_lossy())?;
    let report = pipeline(sink.clone(), &work_dir)?.ingest(&source).await?;

    assert_eq!(report.files_seen, 3);
    assert_eq!(report.files_ingested, 2);
    assert_eq!(report.chunks_written, sink.chunks.lock().unwrap().len());

    let mut files: Vec<String> = sink
        .chunks
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.metadata.source_file.clone())
        .collect();
    files.sort();
    files.dedup();
    assert_eq!(files, vec!["README.md", "src/app.py"]);

    // Working directories never outlive their job
    assert_eq!(std::fs::read_dir(work_dir.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_coordinator_isolates_failures() -> Result<()> {
    let good = git_repo(&[("notes.txt", "some notes")])?;
    let work_dir = TempDir::new()?;
    let sink = Arc::new(CollectingSink::default());
    let coordinator =
        MultiRepoCoordinator::new(Arc::new(pipeline(sink.clone(), &work_dir)?)).with_max_concurrency(2);

    let report = coordinator
        .ingest_all(vec![
            RepositorySource::parse(good.path().to_string_lossy())?,
            RepositorySource::parse(work_dir.path().join("absent").to_string_lossy())?,
        ])
        .await;

    assert_eq!(report.submitted, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert!(!sink.chunks.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_client_ingest_then_chat() -> Result<()> {
    let db_dir = TempDir::new()?;
    let work_dir = TempDir::new()?;
    let origin = git_repo(&[("README.md", "zzz zzz zzz quiz jazz")])?;

    let mut config = Config::default();
    config.vector_db.lancedb_path = db_dir.path().to_path_buf();
    config.ingestion.work_dir = Some(work_dir.path().to_path_buf());

    let vector_db = Arc::new(LanceVectorDB::with_path(&db_dir.path().to_string_lossy()).await?);
    let client = RagClient::from_parts(
        config,
        Arc::new(LetterEmbedder),
        vector_db,
        Arc::new(CannedModel),
    )
    .await?;

    let before = client.chat("jazz quiz").await?;
    assert!(before.sources.is_empty());

    let report = client
        .ingest_repository(&origin.path().to_string_lossy())
        .await?;
    assert_eq!(report.files_ingested, 1);
    assert_eq!(client.chunk_count().await?, report.chunks_written);

    let after = client.chat("jazz quiz").await?;
    assert_eq!(after.model, "canned");
    assert_eq!(after.sources.len(), 1);
    assert_eq!(after.sources[0].source_file, "README.md");
    assert!(after.sources[0].content.contains("jazz"));
    Ok(())
}
