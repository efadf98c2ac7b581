//! Vector index adapter.
//!
//! `VectorIndex` is the seam over an external nearest-neighbour service:
//! idempotent upsert, approximate top-K query with typed metadata, and
//! batched delete. `SqliteVectorIndex` is the provided implementation,
//! brute-force cosine similarity over embeddings stored as little-endian
//! f32 blobs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::core::errors::RagError;

/// Keys per delete call issued to the underlying service.
pub const DELETE_BATCH_SIZE: usize = 1000;

/// Typed vector metadata carried alongside each embedding.
///
/// Validated at the adapter boundary; malformed stored metadata is
/// defaulted rather than propagated untyped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRef {
    pub document_id: i64,
    pub ordinal: usize,
}

/// One query hit: key, similarity in [0,1], metadata.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub vector_key: String,
    pub score: f32,
    pub metadata: ChunkRef,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the vector and metadata stored under `key`.
    async fn upsert(&self, key: &str, vector: &[f32], metadata: &ChunkRef)
        -> Result<(), RagError>;

    /// Top-K most similar vectors, non-increasing by score, at most `top_k`.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>, RagError>;

    /// Delete vectors by key, partitioned into `DELETE_BATCH_SIZE` batches.
    async fn delete_by_ids(&self, keys: &[String]) -> Result<(), RagError>;
}

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn new(pool: SqlitePool) -> Result<Self, RagError> {
        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vectors (
                vector_key TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}'
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::vector_index)?;

        Ok(())
    }

    /// Serialize embedding to bytes (little-endian f32).
    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn parse_metadata(key: &str, raw: &str) -> ChunkRef {
        match serde_json::from_str::<ChunkRef>(raw) {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!("Malformed metadata for vector {}: {}; defaulting", key, err);
                ChunkRef::default()
            }
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(
        &self,
        key: &str,
        vector: &[f32],
        metadata: &ChunkRef,
    ) -> Result<(), RagError> {
        let blob = Self::serialize_embedding(vector);
        let metadata_str = serde_json::to_string(metadata).map_err(RagError::vector_index)?;

        sqlx::query(
            "INSERT OR REPLACE INTO vectors (vector_key, embedding, metadata)
             VALUES (?1, ?2, ?3)",
        )
        .bind(key)
        .bind(&blob)
        .bind(&metadata_str)
        .execute(&self.pool)
        .await
        .map_err(RagError::vector_index)?;

        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchMatch>, RagError> {
        let rows = sqlx::query("SELECT vector_key, embedding, metadata FROM vectors")
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::vector_index)?;

        let mut matches: Vec<SearchMatch> = rows
            .iter()
            .map(|row| {
                let key: String = row.get("vector_key");
                let embedding_bytes: Vec<u8> = row.get("embedding");
                let stored = Self::deserialize_embedding(&embedding_bytes);
                // negative cosine means "unrelated" for retrieval purposes
                let score = Self::cosine_similarity(vector, &stored).max(0.0);

                let metadata_str: String = row.get("metadata");
                let metadata = Self::parse_metadata(&key, &metadata_str);

                SearchMatch {
                    vector_key: key,
                    score,
                    metadata,
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn delete_by_ids(&self, keys: &[String]) -> Result<(), RagError> {
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let placeholders = vec!["?"; batch.len()].join(",");
            let sql = format!(
                "DELETE FROM vectors WHERE vector_key IN ({})",
                placeholders
            );

            let mut query = sqlx::query(&sql);
            for key in batch {
                query = query.bind(key);
            }
            query
                .execute(&self.pool)
                .await
                .map_err(RagError::vector_index)?;
        }

        Ok(())
    }
}
