// LanceDB is the embedded vector database (no server required)
pub mod lance_client;
pub use lance_client::LanceVectorDB;

use crate::error::VectorDbError;
use crate::ingest::Chunk;
use crate::types::RetrievedChunk;

/// Trait for vector database operations
///
/// Implementations must accept concurrent `store_embeddings` calls; batch
/// ingestion writes from several repositories at once.
#[async_trait::async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Initialize the database and create collections if needed
    async fn initialize(&self, dimension: usize) -> Result<(), VectorDbError>;

    /// Store one embedding per chunk, returning the number of rows written
    async fn store_embeddings(
        &self,
        embeddings: Vec<Vec<f32>>,
        chunks: Vec<Chunk>,
    ) -> Result<usize, VectorDbError>;

    /// Nearest chunks to `query_vector` scoring at least `min_score`, best first
    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, VectorDbError>;

    /// Number of stored chunks
    async fn count(&self) -> Result<usize, VectorDbError>;

    /// Remove every stored chunk
    async fn clear(&self) -> Result<(), VectorDbError>;
}
