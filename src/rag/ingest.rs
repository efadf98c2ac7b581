//! Ingestion pipeline: chunk, embed, index, persist.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;

use super::chunk_store::ChunkStore;
use super::chunker;
use super::embedder::Embedder;
use super::index::{ChunkRef, VectorIndex};
use super::vector_key;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Serialize)]
pub struct IngestedChunk {
    pub ordinal: usize,
    pub text: String,
    pub vector_key: String,
}

#[derive(Clone)]
pub struct IngestPipeline {
    embedder: Embedder,
    index: Arc<dyn VectorIndex>,
    chunks: Arc<dyn ChunkStore>,
    max_chunk_size: usize,
}

impl IngestPipeline {
    pub fn new(
        embedder: Embedder,
        index: Arc<dyn VectorIndex>,
        chunks: Arc<dyn ChunkStore>,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            chunks,
            max_chunk_size,
        }
    }

    /// Ingest one document's extracted text.
    ///
    /// Chunks the text, embeds all chunks in one batched call, then writes
    /// vectors and chunk texts under `doc-{id}-chunk-{i}` keys. Writes for
    /// distinct keys are issued concurrently and awaited together.
    ///
    /// There is no rollback: if a write fails partway, earlier writes stay
    /// in place and the caller compensates with a full-document delete.
    pub async fn ingest(
        &self,
        document_id: i64,
        text: &str,
    ) -> Result<Vec<IngestedChunk>, RagError> {
        let texts = chunker::chunk(text, self.max_chunk_size);
        if texts.is_empty() {
            return Err(RagError::EmptyDocument);
        }

        let vectors = self.embedder.embed(&texts).await?;

        let records: Vec<IngestedChunk> = texts
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| IngestedChunk {
                ordinal,
                text,
                vector_key: vector_key(document_id, ordinal),
            })
            .collect();

        let upserts = records.iter().zip(vectors.iter()).map(|(record, vector)| {
            let meta = ChunkRef {
                document_id,
                ordinal: record.ordinal,
            };
            async move { self.index.upsert(&record.vector_key, vector, &meta).await }
        });
        try_join_all(upserts).await?;

        let writes = records.iter().map(|record| {
            self.chunks.put(
                &record.vector_key,
                document_id,
                record.ordinal as i64,
                &record.text,
            )
        });
        try_join_all(writes).await?;

        tracing::info!(
            "Ingested document {} as {} chunks",
            document_id,
            records.len()
        );

        Ok(records)
    }
}
