use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Models selectable by name in `embedding.model_name`: (name, model, dimension)
const SUPPORTED_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    ("all-MiniLM-L6-v2", EmbeddingModel::AllMiniLML6V2, 384),
    ("all-MiniLM-L12-v2", EmbeddingModel::AllMiniLML12V2, 384),
    ("BAAI/bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("BAAI/bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
];

/// FastEmbed-based embedding provider
///
/// `TextEmbedding::embed` needs `&mut self`, so the model sits behind a mutex
/// and concurrent callers take turns.
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a manager for one of the supported model names
    pub fn from_model_name(name: &str) -> Result<Self, EmbeddingError> {
        let (name, model, dimension) = resolve_model(name)?;
        tracing::info!("Initializing FastEmbed model: {}", name);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = false;

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            model_name: name.to_string(),
        })
    }
}

fn resolve_model(name: &str) -> Result<(&'static str, EmbeddingModel, usize), EmbeddingError> {
    SUPPORTED_MODELS
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(name))
        .map(|(known, model, dimension)| (*known, model.clone(), *dimension))
        .ok_or_else(|| EmbeddingError::UnknownModel(name.to_string()))
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
        let embeddings = model
            .embed(texts, None)
            .map_err(|e| EmbeddingError::GenerationFailed(e.to_string()))?;

        if let Some(actual) = embeddings.iter().map(Vec::len).find(|&d| d != self.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
