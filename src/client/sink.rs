//! Adapters between the ingestion/chat seams and the embedding + vector store stack

use crate::chat::ContextRetriever;
use crate::embedding::EmbeddingProvider;
use crate::error::{ChatError, EmbeddingError, SinkWriteError};
use crate::ingest::{Chunk, ChunkSink};
use crate::types::RetrievedChunk;
use crate::vector_db::VectorDatabase;
use std::sync::Arc;
use std::time::Duration;

/// Embeds chunks and stores them in the vector database
pub struct EmbeddingSink {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_db: Arc<dyn VectorDatabase>,
    batch_size: usize,
    timeout: Duration,
}

impl EmbeddingSink {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorDatabase>,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            embedding_provider,
            vector_db,
            batch_size: batch_size.max(1),
            timeout,
        }
    }
}

/// Run a blocking embedding call, bounded by `timeout`
async fn embed_with_timeout(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>, SinkWriteError> {
    let embed_future = tokio::task::spawn_blocking(move || provider.embed_batch(texts));

    match tokio::time::timeout(timeout, embed_future).await {
        Ok(Ok(Ok(embeddings))) => Ok(embeddings),
        Ok(Ok(Err(e))) => Err(e.into()),
        Ok(Err(e)) => Err(SinkWriteError::TaskFailed(e.to_string())),
        Err(_) => Err(SinkWriteError::Timeout(timeout.as_secs())),
    }
}

#[async_trait::async_trait]
impl ChunkSink for EmbeddingSink {
    async fn write(&self, chunks: Vec<Chunk>) -> Result<usize, SinkWriteError> {
        let mut stored = 0;
        let mut remaining = chunks;

        while !remaining.is_empty() {
            let rest = remaining.split_off(self.batch_size.min(remaining.len()));
            let batch = std::mem::replace(&mut remaining, rest);

            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings =
                embed_with_timeout(self.embedding_provider.clone(), texts, self.timeout).await?;
            stored += self.vector_db.store_embeddings(embeddings, batch).await?;
        }

        Ok(stored)
    }
}

/// Retrieves context by embedding the question and searching the store
pub struct VectorRetriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_db: Arc<dyn VectorDatabase>,
}

impl VectorRetriever {
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_db: Arc<dyn VectorDatabase>,
    ) -> Self {
        Self {
            embedding_provider,
            vector_db,
        }
    }
}

#[async_trait::async_trait]
impl ContextRetriever for VectorRetriever {
    async fn retrieve(
        &self,
        question: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, ChatError> {
        let provider = self.embedding_provider.clone();
        let texts = vec![question.to_string()];
        let query_embedding = tokio::task::spawn_blocking(move || provider.embed_batch(texts))
            .await
            .map_err(|e| ChatError::Retrieval(format!("Embedding task panicked: {}", e)))?
            .map_err(|e: EmbeddingError| ChatError::Retrieval(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| ChatError::Retrieval("No embedding generated".to_string()))?;

        self.vector_db
            .search(query_embedding, limit, min_score)
            .await
            .map_err(|e| ChatError::Retrieval(e.to_string()))
    }
}
