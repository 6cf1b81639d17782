//! Question answering over the ingested repositories
//!
//! Retrieval and generation are separate seams: [`ContextRetriever`] finds
//! chunks, [`ChatModel`] turns a prompt into an answer.

mod ollama;
mod prompt;

pub use ollama::OllamaChatModel;
pub use prompt::{build_context, build_prompt};

use crate::config::ChatConfig;
use crate::error::{ChatError, RagError, ValidationError};
use crate::types::{ChatResponse, RetrievedChunk};
use std::sync::Arc;
use std::time::Instant;

/// A text-generation model
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete `prompt`, returning the model's answer
    async fn complete(&self, prompt: &str) -> Result<String, ChatError>;

    fn model_name(&self) -> &str;
}

/// Finds chunks relevant to a question
#[async_trait::async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(
        &self,
        question: &str,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, ChatError>;
}

/// Retrieval-augmented chat
pub struct ChatService {
    retriever: Arc<dyn ContextRetriever>,
    model: Arc<dyn ChatModel>,
    top_k: usize,
    min_score: f32,
}

impl ChatService {
    pub fn new(
        retriever: Arc<dyn ContextRetriever>,
        model: Arc<dyn ChatModel>,
        config: &ChatConfig,
    ) -> Self {
        Self {
            retriever,
            model,
            top_k: config.top_k,
            min_score: config.min_score,
        }
    }

    /// Answer `question` using the most relevant stored chunks as context
    ///
    /// An empty store is not an error: the model is asked without context.
    #[tracing::instrument(skip(self))]
    pub async fn answer(&self, question: &str) -> Result<ChatResponse, RagError> {
        let start = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::Empty("question".to_string()).into());
        }

        let sources = self
            .retriever
            .retrieve(question, self.top_k, self.min_score)
            .await?;
        if sources.is_empty() {
            tracing::info!("No relevant context found; asking without context");
        } else {
            tracing::debug!("Retrieved {} context chunks", sources.len());
        }

        let prompt = build_prompt(question, &build_context(&sources));
        let answer = self.model.complete(&prompt).await?;

        Ok(ChatResponse {
            answer: answer.trim().to_string(),
            sources,
            model: self.model.model_name().to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
