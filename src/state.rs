use std::sync::Arc;

use crate::core::config::{AppPaths, Settings};
use crate::db;
use crate::documents::DocumentStore;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::rag::chunk_store::{ChunkStore, SqliteChunkStore};
use crate::rag::index::{SqliteVectorIndex, VectorIndex};
use crate::rag::{AnswerComposer, Embedder, IngestPipeline, RetrievePipeline};

/// Shared application state: explicit client handles constructed once at
/// startup and passed by reference into the pipelines. No ambient globals.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub documents: DocumentStore,
    pub index: Arc<dyn VectorIndex>,
    pub chunks: Arc<dyn ChunkStore>,
    pub ingest: IngestPipeline,
    pub retrieve: RetrievePipeline,
    pub composer: AnswerComposer,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths);

        let pool = db::connect(&paths.db_path).await?;
        let documents = DocumentStore::new(pool.clone()).await?;
        let index: Arc<dyn VectorIndex> = Arc::new(SqliteVectorIndex::new(pool.clone()).await?);
        let chunks: Arc<dyn ChunkStore> = Arc::new(SqliteChunkStore::new(pool).await?);

        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiProvider::new(
            settings.openai_base_url.clone(),
            &settings.openai_api_key,
        )?);

        let embedder = Embedder::new(
            provider.clone(),
            settings.embedding_model.clone(),
            settings.embedding_dimensions,
        );
        let ingest = IngestPipeline::new(
            embedder.clone(),
            index.clone(),
            chunks.clone(),
            settings.max_chunk_size,
        );
        let retrieve = RetrievePipeline::new(embedder, index.clone(), chunks.clone());
        let composer = AnswerComposer::new(provider, settings.chat_model.clone());

        Ok(Arc::new(AppState {
            paths,
            settings,
            documents,
            index,
            chunks,
            ingest,
            retrieve,
            composer,
        }))
    }
}
