/// Centralized error types for repo-rag using thiserror
///
/// Ingestion errors follow the job taxonomy: fetch failures abort a job,
/// read and sink failures are scoped to one file, cleanup failures are
/// only ever logged.
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the RAG system
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A repository could not be cloned. Fatal to the job that raised it.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid repository URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Authentication failed for '{url}': {reason}")]
    Authentication { url: String, reason: String },

    #[error("Network failure while cloning '{url}': {reason}")]
    Network { url: String, reason: String },

    #[error("Failed to clone '{url}': {reason}")]
    CloneFailed { url: String, reason: String },
}

impl FetchError {
    /// The repository URL the failure belongs to
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Authentication { url, .. }
            | FetchError::Network { url, .. }
            | FetchError::CloneFailed { url, .. } => url,
        }
    }
}

/// A single file could not be read. The file is skipped.
#[derive(Error, Debug)]
pub enum FileReadError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not valid UTF-8: {}", .0.display())]
    InvalidUtf8(PathBuf),

    #[error("Failed to extract PDF '{}': {reason}", .path.display())]
    Pdf { path: PathBuf, reason: String },

    #[error("File size exceeds maximum: {size} > {max}")]
    TooLarge { size: u64, max: u64 },
}

/// Writing chunks to the vector store failed. Not retried.
#[derive(Error, Debug)]
pub enum SinkWriteError {
    #[error("Failed to embed chunks: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Failed to store chunks: {0}")]
    Store(#[from] VectorDbError),

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Sink task failed: {0}")]
    TaskFailed(String),
}

/// Some entries of a working directory could not be removed
#[derive(Error, Debug)]
#[error("Failed to remove {failures} entries under '{}'", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    pub failures: usize,
}

/// Errors that end an ingestion job
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to create working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("Failed to walk repository files: {0}")]
    Walk(#[source] std::io::Error),

    #[error("Failed to write chunks for '{file}': {source}")]
    Sink {
        file: String,
        #[source]
        source: SinkWriteError,
    },

    #[error("Ingestion was cancelled")]
    Cancelled,

    #[error("Ingestion task failed: {0}")]
    TaskFailed(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to connect to vector database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create table '{table}': {reason}")]
    TableCreationFailed { table: String, reason: String },

    #[error("Failed to store embeddings: {0}")]
    StoreFailed(String),

    #[error("Failed to search embeddings: {0}")]
    SearchFailed(String),

    #[error("Failed to clear database: {0}")]
    ClearFailed(String),

    #[error("Embedding count {embeddings} does not match chunk count {chunks}")]
    LengthMismatch { embeddings: usize, chunks: usize },
}

/// Errors related to chunking
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Failed to load tokenizer: {0}")]
    TokenizerUnavailable(String),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),
}

/// Errors from the chat model collaborator
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat request failed: {0}")]
    RequestFailed(String),

    #[error("Chat model returned HTTP {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("Failed to parse chat response: {0}")]
    InvalidResponse(String),

    #[error("Failed to retrieve context: {0}")]
    Retrieval(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Empty {0}")]
    Empty(String),
}

impl RagError {
    /// Check if this is a user error (bad input) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RagError::Validation(_)
                | RagError::Config(ConfigError::InvalidValue { .. })
                | RagError::Ingestion(IngestionError::Fetch(FetchError::InvalidUrl { .. }))
        )
    }
}

/// Result type alias using RagError
pub type Result<T> = std::result::Result<T, RagError>;
