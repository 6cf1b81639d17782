//! LanceDB vector database client

use crate::error::VectorDbError;
use crate::ingest::Chunk;
use crate::types::RetrievedChunk;
use crate::vector_db::VectorDatabase;
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::sync::Arc;

/// LanceDB vector database implementation (embedded, no server required)
pub struct LanceVectorDB {
    connection: Connection,
    table_name: String,
    db_path: String,
    // merge_insert commits conflict when run concurrently on one table
    write_lock: tokio::sync::Mutex<()>,
}

impl LanceVectorDB {
    /// Create a new LanceDB instance with default path
    pub async fn new() -> Result<Self, VectorDbError> {
        let db_path = Self::default_lancedb_path();
        Self::with_path(&db_path).await
    }

    /// Create a new LanceDB instance with custom path
    pub async fn with_path(db_path: &str) -> Result<Self, VectorDbError> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            connection,
            table_name: "repo_chunks".to_string(),
            db_path: db_path.to_string(),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Use a different table than the default `repo_chunks`
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Get default database path
    pub fn default_lancedb_path() -> String {
        crate::paths::PlatformPaths::default_lancedb_path()
            .to_string_lossy()
            .to_string()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create schema for the chunks table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("repository", DataType::Utf8, false),
            Field::new("source_file", DataType::Utf8, false),
            Field::new("page", DataType::UInt32, true),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("token_count", DataType::UInt32, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new("ingested_at", DataType::Int64, false),
            Field::new("content", DataType::Utf8, false),
        ]))
    }

    async fn get_table(&self) -> Result<Table, VectorDbError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(format!("Failed to open table: {}", e)))
    }

    /// Row id: repository, file, page and position identify a chunk
    fn chunk_id(chunk: &Chunk) -> String {
        let m = &chunk.metadata;
        match m.page {
            Some(page) => format!(
                "{}:{}#p{}:{}",
                m.repository, m.source_file, page, m.chunk_index
            ),
            None => format!("{}:{}:{}", m.repository, m.source_file, m.chunk_index),
        }
    }

    /// Convert embeddings and chunks to a RecordBatch
    fn create_record_batch(
        embeddings: Vec<Vec<f32>>,
        chunks: &[Chunk],
        schema: Arc<Schema>,
        dimension: usize,
    ) -> Result<RecordBatch, VectorDbError> {
        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            embeddings
                .into_iter()
                .map(|v| Some(v.into_iter().map(Some))),
            dimension as i32,
        );

        let id_array = StringArray::from(chunks.iter().map(Self::chunk_id).collect::<Vec<_>>());
        let repository_array = StringArray::from(
            chunks
                .iter()
                .map(|c| c.metadata.repository.as_str())
                .collect::<Vec<_>>(),
        );
        let source_file_array = StringArray::from(
            chunks
                .iter()
                .map(|c| c.metadata.source_file.as_str())
                .collect::<Vec<_>>(),
        );
        let page_array =
            UInt32Array::from(chunks.iter().map(|c| c.metadata.page).collect::<Vec<_>>());
        let chunk_index_array = UInt32Array::from(
            chunks
                .iter()
                .map(|c| c.metadata.chunk_index as u32)
                .collect::<Vec<_>>(),
        );
        let token_count_array = UInt32Array::from(
            chunks
                .iter()
                .map(|c| c.metadata.token_count as u32)
                .collect::<Vec<_>>(),
        );
        let content_hash_array = StringArray::from(
            chunks
                .iter()
                .map(|c| c.metadata.content_hash.as_str())
                .collect::<Vec<_>>(),
        );
        let ingested_at_array = Int64Array::from(
            chunks
                .iter()
                .map(|c| c.metadata.ingested_at)
                .collect::<Vec<_>>(),
        );
        let content_array =
            StringArray::from(chunks.iter().map(|c| c.content.as_str()).collect::<Vec<_>>());

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(id_array),
                Arc::new(repository_array),
                Arc::new(source_file_array),
                Arc::new(page_array),
                Arc::new(chunk_index_array),
                Arc::new(token_count_array),
                Arc::new(content_hash_array),
                Arc::new(ingested_at_array),
                Arc::new(content_array),
            ],
        )
        .map_err(|e| VectorDbError::StoreFailed(format!("Failed to create RecordBatch: {}", e)))
    }

    /// Turn search result batches into retrieved chunks
    fn parse_results(
        batches: &[RecordBatch],
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, VectorDbError> {
        fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, VectorDbError> {
            batch
                .column_by_name(name)
                .ok_or_else(|| VectorDbError::SearchFailed(format!("Missing {} column", name)))?
                .as_any()
                .downcast_ref::<T>()
                .ok_or_else(|| VectorDbError::SearchFailed(format!("Invalid {} type", name)))
        }

        let mut results = Vec::new();

        for batch in batches {
            let distance_array = column::<Float32Array>(batch, "_distance")?;
            let repository_array = column::<StringArray>(batch, "repository")?;
            let source_file_array = column::<StringArray>(batch, "source_file")?;
            let page_array = column::<UInt32Array>(batch, "page")?;
            let chunk_index_array = column::<UInt32Array>(batch, "chunk_index")?;
            let content_array = column::<StringArray>(batch, "content")?;

            for i in 0..batch.num_rows() {
                let distance = distance_array.value(i);
                let score = 1.0 / (1.0 + distance);
                if score < min_score {
                    continue;
                }

                results.push(RetrievedChunk {
                    repository: repository_array.value(i).to_string(),
                    source_file: source_file_array.value(i).to_string(),
                    page: if page_array.is_null(i) {
                        None
                    } else {
                        Some(page_array.value(i))
                    },
                    chunk_index: chunk_index_array.value(i) as usize,
                    content: content_array.value(i).to_string(),
                    score,
                });
            }
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }
}

#[async_trait::async_trait]
impl VectorDatabase for LanceVectorDB {
    async fn initialize(&self, dimension: usize) -> Result<(), VectorDbError> {
        tracing::info!(
            "Initializing LanceDB with dimension {} at {}",
            dimension,
            self.db_path
        );

        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            tracing::info!("Table '{}' already exists", self.table_name);
            return Ok(());
        }

        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches =
            RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema.clone());

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| VectorDbError::TableCreationFailed {
                table: self.table_name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!("Created table '{}'", self.table_name);
        Ok(())
    }

    async fn store_embeddings(
        &self,
        embeddings: Vec<Vec<f32>>,
        chunks: Vec<Chunk>,
    ) -> Result<usize, VectorDbError> {
        if embeddings.len() != chunks.len() {
            return Err(VectorDbError::LengthMismatch {
                embeddings: embeddings.len(),
                chunks: chunks.len(),
            });
        }
        if embeddings.is_empty() {
            return Ok(0);
        }

        let dimension = embeddings[0].len();
        let schema = Self::create_schema(dimension);
        let batch = Self::create_record_batch(embeddings, &chunks, schema.clone(), dimension)?;
        let count = batch.num_rows();

        let table = self.get_table().await?;
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);

        // Upsert on id so re-ingesting a repository replaces its rows
        let _guard = self.write_lock.lock().await;
        let mut merge_insert = table.merge_insert(&["id"]);
        merge_insert
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge_insert
            .execute(Box::new(batches))
            .await
            .map_err(|e| VectorDbError::StoreFailed(e.to_string()))?;

        tracing::debug!("Stored {} embeddings", count);
        Ok(count)
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, VectorDbError> {
        let table = self.get_table().await?;

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let stream = table
            .vector_search(query_vector)
            .map_err(|e| {
                VectorDbError::SearchFailed(format!("Failed to create vector search: {}", e))
            })?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .map_err(|e| VectorDbError::SearchFailed(e.to_string()))?;

        Self::parse_results(&batches, min_score)
    }

    async fn count(&self) -> Result<usize, VectorDbError> {
        let table = self.get_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| VectorDbError::SearchFailed(format!("Failed to count rows: {}", e)))
    }

    async fn clear(&self) -> Result<(), VectorDbError> {
        let table = self.get_table().await?;
        table
            .delete("true")
            .await
            .map_err(|e| VectorDbError::ClearFailed(e.to_string()))?;

        tracing::info!("Cleared all chunks from '{}'", self.table_name);
        Ok(())
    }
}
