//! Token-bounded chunking of documents

use super::{Chunk, Document};
use crate::config::IngestionConfig;
use crate::error::ChunkingError;
use crate::types::ChunkMetadata;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use text_splitter::{ChunkConfig, ChunkSizer, TextSplitter};
use tiktoken_rs::CoreBPE;

/// Counts tokens with the `cl100k_base` BPE
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish()
    }
}

impl TokenCounter {
    pub fn cl100k() -> Result<Self, ChunkingError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| ChunkingError::TokenizerUnavailable(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl ChunkSizer for TokenCounter {
    fn size(&self, chunk: &str) -> usize {
        self.count(chunk)
    }
}

/// Smallest accepted chunk size in tokens
pub const MIN_CHUNK_TOKENS: usize = 16;

/// Splits documents into chunks of at most `max_tokens` tokens
///
/// Boundaries prefer paragraphs, then sentences, then words. Chunks that
/// are only whitespace are dropped. A single grapheme cluster is never
/// split, so one that encodes to more than `max_tokens` tokens is emitted
/// whole as its own chunk.
pub struct TokenChunker {
    splitter: TextSplitter<TokenCounter>,
    counter: TokenCounter,
    max_tokens: usize,
    max_chunks: usize,
}

impl TokenChunker {
    pub fn new(max_tokens: usize) -> Result<Self, ChunkingError> {
        if max_tokens < MIN_CHUNK_TOKENS {
            return Err(ChunkingError::InvalidChunkSize(format!(
                "max_tokens must be at least {}, got {}",
                MIN_CHUNK_TOKENS, max_tokens
            )));
        }

        let counter = TokenCounter::cl100k()?;
        let splitter = TextSplitter::new(ChunkConfig::new(max_tokens).with_sizer(counter.clone()));

        Ok(Self {
            splitter,
            counter,
            max_tokens,
            max_chunks: usize::MAX,
        })
    }

    pub fn from_config(config: &IngestionConfig) -> Result<Self, ChunkingError> {
        Ok(Self::new(config.chunk_tokens)?.with_max_chunks(config.max_chunks_per_document))
    }

    /// Cap the number of chunks kept from a single document
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks.max(1);
        self
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Chunk one document. Chunk indexes are dense and start at 0.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let ingested_at = chrono::Utc::now().timestamp();
        let mut chunks = Vec::new();

        for text in self
            .splitter
            .chunks(&document.text)
            .filter(|c| !c.trim().is_empty())
        {
            if chunks.len() >= self.max_chunks {
                tracing::warn!(
                    "Truncating {} after {} chunks",
                    document.source_file,
                    self.max_chunks
                );
                break;
            }

            let metadata = ChunkMetadata {
                repository: document.repository.clone(),
                source_file: document.source_file.clone(),
                page: document.page,
                chunk_index: chunks.len(),
                token_count: self.counter.count(text),
                content_hash: content_hash(text),
                ingested_at,
            };
            chunks.push(Chunk {
                content: text.to_string(),
                metadata,
            });
        }

        chunks
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
