//! Retrieval pipeline: embed the query, search the index, filter by
//! threshold, join against the chunk store, assemble sources.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::chunk_store::{ChunkStore, StoredChunk};
use super::embedder::Embedder;
use super::index::{SearchMatch, VectorIndex};
use crate::core::errors::RagError;

/// One retrieved unit of context, ready for prompt assembly.
#[derive(Debug, Clone, Serialize)]
pub struct Source {
    pub content: String,
    pub document_id: i64,
    pub filename: String,
    pub chunk_ordinal: usize,
    pub similarity: f32,
}

#[derive(Clone)]
pub struct RetrievePipeline {
    embedder: Embedder,
    index: Arc<dyn VectorIndex>,
    chunks: Arc<dyn ChunkStore>,
}

impl RetrievePipeline {
    pub fn new(
        embedder: Embedder,
        index: Arc<dyn VectorIndex>,
        chunks: Arc<dyn ChunkStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            chunks,
        }
    }

    /// Retrieve up to `top_k` sources scoring at least
    /// `threshold_percent / 100`.
    ///
    /// An empty result is a valid "no relevant context" outcome, not an
    /// error. Matches whose chunk text is missing from the store degrade
    /// to empty content instead of failing the request.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        threshold_percent: f32,
    ) -> Result<Vec<Source>, RagError> {
        // validation happens before any external call
        if query.trim().is_empty() {
            return Err(RagError::EmptyQuery);
        }
        if !(0.0..=100.0).contains(&threshold_percent) {
            return Err(RagError::InvalidThreshold(threshold_percent));
        }

        let query_vector = self.embedder.embed_query(query).await?;
        let matches = self.index.query(&query_vector, top_k).await?;

        let cutoff = threshold_percent / 100.0;
        let filtered: Vec<SearchMatch> = matches
            .into_iter()
            .filter(|m| m.score >= cutoff)
            .collect();

        if filtered.is_empty() {
            tracing::debug!("No matches above threshold {:.2}", cutoff);
            return Ok(Vec::new());
        }

        let keys: Vec<String> = filtered.iter().map(|m| m.vector_key.clone()).collect();
        let found = self.chunks.get_many(&keys).await?;
        let by_key: HashMap<&str, &StoredChunk> = found
            .iter()
            .map(|chunk| (chunk.vector_key.as_str(), chunk))
            .collect();

        let sources = filtered
            .iter()
            .map(|m| match by_key.get(m.vector_key.as_str()) {
                Some(chunk) => Source {
                    content: chunk.content.clone(),
                    document_id: m.metadata.document_id,
                    filename: chunk.filename.clone(),
                    chunk_ordinal: m.metadata.ordinal,
                    similarity: m.score,
                },
                None => {
                    // index/store inconsistency: degrade instead of failing
                    tracing::warn!(
                        "Match {} has no chunk store entry; substituting empty content",
                        m.vector_key
                    );
                    Source {
                        content: String::new(),
                        document_id: m.metadata.document_id,
                        filename: "Unknown".to_string(),
                        chunk_ordinal: m.metadata.ordinal,
                        similarity: m.score,
                    }
                }
            })
            .collect();

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::documents::DocumentStore;
    use crate::llm::testing::MockProvider;
    use crate::rag::chunk_store::SqliteChunkStore;
    use crate::rag::index::{ChunkRef, SqliteVectorIndex};

    struct Fixture {
        pipeline: RetrievePipeline,
        index: Arc<SqliteVectorIndex>,
        chunks: Arc<SqliteChunkStore>,
    }

    async fn fixture(provider: MockProvider) -> Fixture {
        let tmp = std::env::temp_dir()
            .join(format!("docrag-retrieve-test-{}.db", uuid::Uuid::new_v4()));
        let pool = db::connect(&tmp).await.unwrap();
        // chunk lookups join the documents table for filenames
        DocumentStore::new(pool.clone()).await.unwrap();
        let index = Arc::new(SqliteVectorIndex::new(pool.clone()).await.unwrap());
        let chunks = Arc::new(SqliteChunkStore::new(pool).await.unwrap());
        let embedder = Embedder::new(Arc::new(provider), "test-model".to_string(), 2);
        Fixture {
            pipeline: RetrievePipeline::new(embedder, index.clone(), chunks.clone()),
            index,
            chunks,
        }
    }

    /// Unit vector at the angle whose cosine against [1, 0] is `cos`.
    fn unit_at(cos: f32) -> Vec<f32> {
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    async fn seed(fx: &Fixture, key: &str, document_id: i64, ordinal: usize, cos: f32, text: &str) {
        fx.index
            .upsert(
                key,
                &unit_at(cos),
                &ChunkRef {
                    document_id,
                    ordinal,
                },
            )
            .await
            .unwrap();
        fx.chunks
            .put(key, document_id, ordinal as i64, text)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn threshold_filters_low_scores() {
        let fx = fixture(MockProvider::new().with_vector("question", vec![1.0, 0.0])).await;
        seed(&fx, "doc-1-chunk-0", 1, 0, 0.55, "relevant text").await;
        seed(&fx, "doc-1-chunk-1", 1, 1, 0.30, "unrelated text").await;

        let sources = fx.pipeline.retrieve("question", 3, 40.0).await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].content, "relevant text");
        assert!(sources[0].similarity >= 0.4);
    }

    #[tokio::test]
    async fn raising_threshold_never_grows_result() {
        let fx = fixture(MockProvider::new().with_vector("q", vec![1.0, 0.0])).await;
        for (i, cos) in [0.9f32, 0.6, 0.45, 0.2].iter().enumerate() {
            let key = format!("doc-1-chunk-{}", i);
            seed(&fx, &key, 1, i, *cos, "text").await;
        }

        let mut previous = usize::MAX;
        for threshold in [0.0f32, 30.0, 50.0, 70.0, 100.0] {
            let sources = fx.pipeline.retrieve("q", 10, threshold).await.unwrap();
            for s in &sources {
                assert!(s.similarity >= threshold / 100.0 - 1e-6);
            }
            assert!(sources.len() <= previous);
            previous = sources.len();
        }
    }

    #[tokio::test]
    async fn no_match_above_threshold_is_empty_not_error() {
        let fx = fixture(MockProvider::new().with_vector("q", vec![1.0, 0.0])).await;
        seed(&fx, "doc-1-chunk-0", 1, 0, 0.2, "text").await;

        let sources = fx.pipeline.retrieve("q", 3, 80.0).await.unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn empty_query_rejected_before_external_calls() {
        // a failing embedder proves validation short-circuits
        let fx = fixture(MockProvider::new().failing_embed()).await;

        let err = fx.pipeline.retrieve("   ", 3, 40.0).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyQuery));
    }

    #[tokio::test]
    async fn out_of_range_threshold_rejected() {
        let fx = fixture(MockProvider::new().failing_embed()).await;

        let err = fx.pipeline.retrieve("q", 3, 150.0).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidThreshold(t) if t == 150.0));

        let err = fx.pipeline.retrieve("q", 3, -1.0).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidThreshold(_)));
    }

    #[tokio::test]
    async fn missing_chunk_degrades_to_empty_content() {
        let fx = fixture(MockProvider::new().with_vector("q", vec![1.0, 0.0])).await;

        // vector present, chunk store entry deliberately absent
        fx.index
            .upsert(
                "doc-9-chunk-0",
                &unit_at(0.9),
                &ChunkRef {
                    document_id: 9,
                    ordinal: 0,
                },
            )
            .await
            .unwrap();

        let sources = fx.pipeline.retrieve("q", 3, 40.0).await.unwrap();

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].content, "");
        assert_eq!(sources[0].filename, "Unknown");
        assert_eq!(sources[0].document_id, 9);
    }

    #[tokio::test]
    async fn sources_preserve_descending_index_order() {
        let fx = fixture(MockProvider::new().with_vector("q", vec![1.0, 0.0])).await;
        seed(&fx, "doc-1-chunk-1", 1, 1, 0.5, "middle").await;
        seed(&fx, "doc-1-chunk-0", 1, 0, 0.9, "best").await;
        seed(&fx, "doc-2-chunk-0", 2, 0, 0.7, "second").await;

        let sources = fx.pipeline.retrieve("q", 10, 0.0).await.unwrap();

        let contents: Vec<&str> = sources.iter().map(|s| s.content.as_str()).collect();
        assert_eq!(contents, vec!["best", "second", "middle"]);
    }
}
