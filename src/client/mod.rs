//! Core library client for repo-rag
//!
//! Wires repository ingestion, the embedding model, the vector store and
//! the chat model together. The MCP server and the CLI are thin wrappers
//! around [`RagClient`].

mod sink;

pub use sink::{EmbeddingSink, VectorRetriever};

use crate::chat::{ChatModel, ChatService, OllamaChatModel};
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedManager};
use crate::error::{IngestionError, RagError};
use crate::ingest::{
    ContentFilter, GitFetcher, IngestionPipeline, MultiRepoCoordinator, PipelineOptions,
    RepositorySource, TokenChunker,
};
use crate::types::{BatchReport, ChatResponse, IngestReport};
use crate::vector_db::{LanceVectorDB, VectorDatabase};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Main client for interacting with the RAG system
///
/// # Example
///
/// ```no_run
/// use repo_rag::RagClient;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = RagClient::new().await?;
///
///     let report = client
///         .ingest_repository("https://github.com/rust-lang/rustlings.git")
///         .await?;
///     println!("Wrote {} chunks", report.chunks_written);
///
///     let response = client.chat("What does this repository teach?").await?;
///     println!("{}", response.answer);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RagClient {
    pub(crate) config: Arc<Config>,
    pub(crate) embedding_provider: Arc<dyn EmbeddingProvider>,
    pub(crate) vector_db: Arc<dyn VectorDatabase>,
    pub(crate) pipeline: Arc<IngestionPipeline>,
    pub(crate) coordinator: Arc<MultiRepoCoordinator>,
    pub(crate) chat: Arc<ChatService>,
}

impl RagClient {
    /// Create a new RAG client from the default config file (or defaults)
    pub async fn new() -> Result<Self> {
        let config = Config::new().context("Failed to load configuration")?;
        Self::with_config(config).await
    }

    /// Create a new RAG client with custom configuration
    ///
    /// Loads the embedding model, opens the LanceDB table and prepares the
    /// Ollama client. No network request is made until the first chat.
    pub async fn with_config(config: Config) -> Result<Self> {
        tracing::info!("Initializing RAG client");
        tracing::debug!("Embedding model: {}", config.embedding.model_name);
        tracing::debug!("Chunk tokens: {}", config.ingestion.chunk_tokens);

        let embedding_provider: Arc<dyn EmbeddingProvider> = Arc::new(
            FastEmbedManager::from_model_name(&config.embedding.model_name)
                .context("Failed to initialize embedding provider")?,
        );

        tracing::info!(
            "Using LanceDB vector database at {}",
            config.vector_db.lancedb_path.display()
        );
        let vector_db: Arc<dyn VectorDatabase> = Arc::new(
            LanceVectorDB::with_path(&config.vector_db.lancedb_path.to_string_lossy())
                .await
                .context("Failed to initialize LanceDB vector database")?
                .with_table_name(config.vector_db.table_name.clone()),
        );

        let chat_model: Arc<dyn ChatModel> = Arc::new(
            OllamaChatModel::new(&config.chat).context("Failed to initialize chat model")?,
        );

        Self::from_parts(config, embedding_provider, vector_db, chat_model).await
    }

    /// Assemble a client from already constructed collaborators
    ///
    /// Initializes the vector store for the provider's dimension.
    pub async fn from_parts(
        config: Config,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorDatabase>,
        chat_model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        vector_db
            .initialize(embedding_provider.dimension())
            .await
            .context("Failed to initialize vector database table")?;

        let sink = Arc::new(EmbeddingSink::new(
            embedding_provider.clone(),
            vector_db.clone(),
            config.embedding.batch_size,
            Duration::from_secs(config.embedding.timeout_secs),
        ));
        let chunker =
            Arc::new(TokenChunker::from_config(&config.ingestion).context("Failed to create chunker")?);
        let filter = Arc::new(ContentFilter::new(&config.ingestion.extensions));

        let pipeline = Arc::new(
            IngestionPipeline::new(
                Arc::new(GitFetcher::from_config(&config.ingestion)),
                sink,
                chunker,
                filter,
            )
            .with_options(PipelineOptions::from_config(&config.ingestion)),
        );
        let coordinator = Arc::new(MultiRepoCoordinator::from_config(
            pipeline.clone(),
            &config.ingestion,
        ));

        let retriever = Arc::new(VectorRetriever::new(
            embedding_provider.clone(),
            vector_db.clone(),
        ));
        let chat = Arc::new(ChatService::new(retriever, chat_model, &config.chat));

        Ok(Self {
            config: Arc::new(config),
            embedding_provider,
            vector_db,
            pipeline,
            coordinator,
            chat,
        })
    }

    /// Clone one repository and load its chunks into the vector store
    pub async fn ingest_repository(&self, url: &str) -> crate::error::Result<IngestReport> {
        let source = RepositorySource::parse(url).map_err(IngestionError::from)?;
        Ok(self.pipeline.ingest(&source).await?)
    }

    /// Ingest several repositories with bounded parallelism
    ///
    /// Invalid URLs count as failed jobs; they never reach the coordinator.
    pub async fn ingest_repositories(&self, urls: Vec<String>) -> BatchReport {
        let (sources, rejected) = parse_sources(urls);
        let report = self.coordinator.ingest_all(sources).await;
        merge_rejected(report, rejected)
    }

    /// Like [`ingest_repositories`](Self::ingest_repositories), but stops
    /// waiting when `cancel` fires
    pub async fn ingest_repositories_with_cancel(
        &self,
        urls: Vec<String>,
        cancel: CancellationToken,
    ) -> crate::error::Result<BatchReport> {
        let (sources, rejected) = parse_sources(urls);
        let report = self
            .coordinator
            .ingest_all_with_cancel(sources, cancel)
            .await?;
        Ok(merge_rejected(report, rejected))
    }

    /// Start a batch in the background and return immediately
    pub fn spawn_batch_ingestion(&self, urls: Vec<String>) -> tokio::task::JoinHandle<BatchReport> {
        let client = self.clone();
        tokio::spawn(async move { client.ingest_repositories(urls).await })
    }

    /// Answer a question using the ingested repositories as context
    pub async fn chat(&self, question: &str) -> crate::error::Result<ChatResponse> {
        self.chat.answer(question).await
    }

    /// Ask the configured preset question
    pub async fn info(&self) -> crate::error::Result<ChatResponse> {
        self.chat.answer(&self.config.chat.info_question).await
    }

    /// Number of chunks currently stored
    pub async fn chunk_count(&self) -> crate::error::Result<usize> {
        Ok(self.vector_db.count().await?)
    }

    /// Remove every stored chunk
    pub async fn clear(&self) -> crate::error::Result<()> {
        self.vector_db.clear().await.map_err(RagError::from)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the embedding dimension
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_provider.dimension()
    }
}

fn parse_sources(urls: Vec<String>) -> (Vec<RepositorySource>, usize) {
    let mut sources = Vec::with_capacity(urls.len());
    let mut rejected = 0;
    for url in urls {
        match RepositorySource::parse(&url) {
            Ok(source) => sources.push(source),
            Err(e) => {
                tracing::error!("Skipping repository: {}", e);
                rejected += 1;
            }
        }
    }
    (sources, rejected)
}

fn merge_rejected(mut report: BatchReport, rejected: usize) -> BatchReport {
    report.submitted += rejected;
    report.failed += rejected;
    report
}

#[cfg(test)]
pub(crate) mod test_support;
