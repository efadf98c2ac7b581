//! Retrieval-augmented generation core.
//!
//! - `chunker`: splits text into bounded retrieval units
//! - `embedder`: batched embedding over the LLM provider
//! - `index`: vector index adapter (trait + SQLite implementation)
//! - `chunk_store`: chunk text storage keyed by vector key
//! - `ingest`: per-document ingestion pipeline
//! - `retrieve`: per-query retrieval pipeline
//! - `compose`: prompt assembly and the completion call

pub mod chunk_store;
pub mod chunker;
pub mod compose;
pub mod embedder;
pub mod index;
pub mod ingest;
pub mod retrieve;

pub use compose::{AnswerComposer, ComposedAnswer};
pub use embedder::Embedder;
pub use ingest::{IngestPipeline, IngestedChunk};
pub use retrieve::{RetrievePipeline, Source};

/// Vector-index key for a chunk: stable, deterministic and
/// reconstructible from the document id and ordinal alone.
pub fn vector_key(document_id: i64, ordinal: usize) -> String {
    format!("doc-{}-chunk-{}", document_id, ordinal)
}

#[cfg(test)]
mod tests {
    use super::vector_key;

    #[test]
    fn vector_key_is_reconstructible() {
        assert_eq!(vector_key(12, 0), "doc-12-chunk-0");
        assert_eq!(vector_key(12, 34), "doc-12-chunk-34");
    }
}
