use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request to ingest a single repository
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestRepositoryRequest {
    /// Git URL (https, ssh, file) or local path of the repository
    pub repo_url: String,
}

/// Request to ingest several repositories in parallel
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestRepositoriesRequest {
    /// Git URLs or local paths of the repositories
    pub repo_urls: Vec<String>,
    /// Wait for the batch to finish instead of returning immediately (default: false)
    #[serde(default)]
    pub wait: bool,
}

impl IngestRepositoryRequest {
    /// Validate the request
    pub fn validate(&self) -> Result<(), String> {
        if self.repo_url.trim().is_empty() {
            return Err("repo_url cannot be empty".to_string());
        }
        Ok(())
    }
}

impl IngestRepositoriesRequest {
    /// Validate the request
    pub fn validate(&self) -> Result<(), String> {
        if self.repo_urls.is_empty() {
            return Err("repo_urls cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Outcome of ingesting one repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IngestReport {
    /// Repository URL or path
    pub repository: String,
    /// Regular files found by the walk
    pub files_seen: usize,
    /// Files whose chunks reached the vector store
    pub files_ingested: usize,
    /// Files rejected by the extension filter or yielding no text
    pub files_skipped: usize,
    /// Files that could not be read or extracted
    pub read_failures: usize,
    /// Files whose chunks could not be written
    pub sink_failures: usize,
    /// Chunks stored in the vector database
    pub chunks_written: usize,
    /// Time taken in milliseconds
    pub duration_ms: u64,
    /// Non-fatal errors, one line per affected file
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Counts for one batch run. Per-repository errors are only logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    /// Repositories handed to the batch
    pub submitted: usize,
    /// Jobs that finished successfully
    pub succeeded: usize,
    /// Jobs that failed (including rejected URLs)
    pub failed: usize,
    /// Jobs still running or cancelled when the wait ended
    pub unfinished: usize,
    /// Whether the wait bound elapsed before all jobs finished
    pub timed_out: bool,
}

impl BatchReport {
    /// True when every submitted job finished, successfully or not
    pub fn is_complete(&self) -> bool {
        self.unfinished == 0 && self.succeeded + self.failed == self.submitted
    }
}

/// Response from the batch ingestion tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchIngestResponse {
    /// Number of repositories accepted for ingestion
    pub submitted: usize,
    /// True when ingestion continues in the background
    pub background: bool,
    /// Final counts, present when the caller waited
    #[serde(default)]
    pub report: Option<BatchReport>,
}

/// Request to ask a question about the ingested repositories
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatRequest {
    /// The question to answer
    pub question: String,
}

impl ChatRequest {
    /// Validate the request
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Request for the preset info question
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct InfoRequest {}

/// A chunk retrieved as context for an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RetrievedChunk {
    /// Repository the chunk came from
    pub repository: String,
    /// File path relative to the repository root
    pub source_file: String,
    /// 1-based page number for PDF content
    pub page: Option<u32>,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// The chunk text
    pub content: String,
    /// Similarity score (0.0 to 1.0)
    pub score: f32,
}

/// Answer to a chat question
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatResponse {
    /// The model's answer
    pub answer: String,
    /// Chunks supplied to the model as context, ordered by relevance
    pub sources: Vec<RetrievedChunk>,
    /// Model that produced the answer
    pub model: String,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Metadata stored with each chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Repository URL or path
    pub repository: String,
    /// File path relative to the repository root
    pub source_file: String,
    /// 1-based page number for PDF content
    pub page: Option<u32>,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// Tokens in the chunk (cl100k_base)
    pub token_count: usize,
    /// SHA256 hash of the chunk content
    pub content_hash: String,
    /// Timestamp when ingested
    pub ingested_at: i64,
}
