/// Configuration system for repo-rag
///
/// Supports loading from multiple sources with priority:
/// explicit `--config` file > Environment variables > default config file > Defaults
///
/// An explicit file is taken as is; environment overrides only apply on top
/// of the default config file or the built-in defaults.
use crate::error::{ConfigError, RagError};
use crate::ingest::{MAX_CONCURRENT_REPOS, MIN_CHUNK_TOKENS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Vector database configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    /// Embedding model configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Repository ingestion configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Chat model configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Table holding chunk embeddings
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model name (e.g., "all-MiniLM-L6-v2", "BAAI/bge-small-en-v1.5")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

/// What the batch coordinator does with jobs still running when it stops waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BatchTimeoutPolicy {
    /// Leave jobs running untracked
    #[default]
    Detach,
    /// Cancel jobs; their working directories are removed on drop
    Abort,
}

/// Repository ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// File extensions (without the dot) that are ingested
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names that are never descended into
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,

    /// Maximum tokens per chunk
    #[serde(default = "default_chunk_tokens")]
    pub chunk_tokens: usize,

    /// Upper bound on chunks produced from one document
    #[serde(default = "default_max_chunks_per_document")]
    pub max_chunks_per_document: usize,

    /// Maximum file size to ingest (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum repositories ingested at the same time in a batch
    #[serde(default = "default_max_concurrent_repos")]
    pub max_concurrent_repos: usize,

    /// How long a batch caller waits for its jobs
    #[serde(default = "default_batch_wait_secs")]
    pub batch_wait_secs: u64,

    /// Policy applied to unfinished jobs when the wait ends early
    #[serde(default)]
    pub on_batch_timeout: BatchTimeoutPolicy,

    /// Abort a job on the first failed vector store write instead of skipping the file
    #[serde(default)]
    pub abort_on_sink_error: bool,

    /// Shallow clone depth, 0 clones full history
    #[serde(default)]
    pub clone_depth: u32,

    /// Branch to check out instead of the remote HEAD
    #[serde(default)]
    pub branch: Option<String>,

    /// Parent directory for working directories (system temp dir if unset)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

/// Chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,

    /// Model used for answers
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity score for retrieved chunks (0.0 to 1.0)
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Question asked by the `info` entry point
    #[serde(default = "default_info_question")]
    pub info_question: String,
}

// Default value functions
fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_table_name() -> String {
    "repo_chunks".to_string()
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_embedding_timeout() -> u64 {
    30
}

pub(crate) fn default_extensions() -> Vec<String> {
    [
        "md", "txt", "java", "py", "csv", "json", "xml", "html", "js", "ts", "pdf",
    ]
    .iter()
    .map(|e| e.to_string())
    .collect()
}

fn default_skip_dirs() -> Vec<String> {
    vec![".git".to_string()]
}

fn default_chunk_tokens() -> usize {
    800
}

fn default_max_chunks_per_document() -> usize {
    10_000
}

fn default_max_file_size() -> u64 {
    10_485_760 // 10 MB
}

fn default_max_concurrent_repos() -> usize {
    16
}

fn default_batch_wait_secs() -> u64 {
    3600
}

fn default_chat_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_chat_model() -> String {
    "llama3.2".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_chat_timeout() -> u64 {
    120
}

fn default_top_k() -> usize {
    4
}

fn default_min_score() -> f32 {
    0.0
}

fn default_info_question() -> String {
    "What is the primary skill of the author of the ingested repositories?".to_string()
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            lancedb_path: default_lancedb_path(),
            table_name: default_table_name(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            skip_dirs: default_skip_dirs(),
            chunk_tokens: default_chunk_tokens(),
            max_chunks_per_document: default_max_chunks_per_document(),
            max_file_size: default_max_file_size(),
            max_concurrent_repos: default_max_concurrent_repos(),
            batch_wait_secs: default_batch_wait_secs(),
            on_batch_timeout: BatchTimeoutPolicy::default(),
            abort_on_sink_error: false,
            clone_depth: 0,
            branch: None,
            work_dir: None,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_chat_base_url(),
            model: default_chat_model(),
            temperature: default_temperature(),
            timeout_secs: default_chat_timeout(),
            top_k: default_top_k(),
            min_score: default_min_score(),
            info_question: default_info_question(),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> RagError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, RagError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, RagError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), RagError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RagError> {
        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.ingestion.extensions.is_empty() {
            return Err(invalid(
                "ingestion.extensions",
                "must list at least one extension",
            ));
        }

        if self.ingestion.chunk_tokens < MIN_CHUNK_TOKENS {
            return Err(invalid(
                "ingestion.chunk_tokens",
                format!("must be at least {}", MIN_CHUNK_TOKENS),
            ));
        }

        if self.ingestion.max_chunks_per_document == 0 {
            return Err(invalid(
                "ingestion.max_chunks_per_document",
                "must be greater than 0",
            ));
        }

        if self.ingestion.max_file_size == 0 {
            return Err(invalid("ingestion.max_file_size", "must be greater than 0"));
        }

        if self.ingestion.max_concurrent_repos == 0 {
            return Err(invalid(
                "ingestion.max_concurrent_repos",
                "must be greater than 0",
            ));
        }

        if self.ingestion.max_concurrent_repos > MAX_CONCURRENT_REPOS {
            return Err(invalid(
                "ingestion.max_concurrent_repos",
                format!("must be at most {}", MAX_CONCURRENT_REPOS),
            ));
        }

        if self.chat.top_k == 0 {
            return Err(invalid("chat.top_k", "must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.chat.min_score) {
            return Err(invalid(
                "chat.min_score",
                format!("must be between 0.0 and 1.0, got {}", self.chat.min_score),
            ));
        }

        if self.vector_db.table_name.trim().is_empty() {
            return Err(invalid("vector_db.table_name", "must not be empty"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("REPO_RAG_LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Ok(model) = std::env::var("REPO_RAG_MODEL") {
            self.embedding.model_name = model;
        }

        if let Ok(batch_size) = std::env::var("REPO_RAG_BATCH_SIZE")
            && let Ok(size) = batch_size.parse()
        {
            self.embedding.batch_size = size;
        }

        if let Ok(tokens) = std::env::var("REPO_RAG_CHUNK_TOKENS")
            && let Ok(tokens) = tokens.parse()
        {
            self.ingestion.chunk_tokens = tokens;
        }

        if let Ok(repos) = std::env::var("REPO_RAG_MAX_CONCURRENT_REPOS")
            && let Ok(repos) = repos.parse()
        {
            self.ingestion.max_concurrent_repos = repos;
        }

        if let Ok(secs) = std::env::var("REPO_RAG_BATCH_WAIT_SECS")
            && let Ok(secs) = secs.parse()
        {
            self.ingestion.batch_wait_secs = secs;
        }

        if let Ok(dir) = std::env::var("REPO_RAG_WORK_DIR") {
            self.ingestion.work_dir = Some(PathBuf::from(dir));
        }

        if let Ok(url) = std::env::var("REPO_RAG_CHAT_URL") {
            self.chat.base_url = url;
        }

        if let Ok(model) = std::env::var("REPO_RAG_CHAT_MODEL") {
            self.chat.model = model;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, RagError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit file when given, otherwise like [`Config::new`]
    ///
    /// Environment overrides are not applied to an explicit file.
    pub fn load(path: Option<&Path>) -> Result<Self, RagError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::new(),
        }
    }
}

#[cfg(test)]
mod tests;
