//! Chunk text storage.
//!
//! Persists chunk content keyed by the vector key shared with the vector
//! index. `get_many` joins the documents table so retrieval can report
//! filenames without a second lookup.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::core::errors::RagError;

#[derive(Debug, Clone, Serialize)]
pub struct StoredChunk {
    pub vector_key: String,
    pub document_id: i64,
    pub ordinal: i64,
    pub content: String,
    pub filename: String,
}

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Persist one chunk's text under its vector key (replace on conflict).
    async fn put(
        &self,
        vector_key: &str,
        document_id: i64,
        ordinal: i64,
        content: &str,
    ) -> Result<(), RagError>;

    /// Point lookup by vector key.
    async fn get(&self, vector_key: &str) -> Result<Option<StoredChunk>, RagError>;

    /// Bulk lookup; missing keys are simply absent from the result.
    async fn get_many(&self, vector_keys: &[String]) -> Result<Vec<StoredChunk>, RagError>;

    /// Vector keys belonging to a document, in ordinal order.
    async fn keys_for_document(&self, document_id: i64) -> Result<Vec<String>, RagError>;

    /// All vector keys in the store.
    async fn all_keys(&self) -> Result<Vec<String>, RagError>;

    /// Delete all chunks of a document; returns the number removed.
    async fn delete_document(&self, document_id: i64) -> Result<usize, RagError>;

    /// Delete every chunk.
    async fn delete_all(&self) -> Result<usize, RagError>;
}

pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, RagError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                vector_key TEXT PRIMARY KEY,
                document_id INTEGER NOT NULL,
                ordinal INTEGER NOT NULL,
                content TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::chunk_store)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)")
            .execute(&self.pool)
            .await
            .map_err(RagError::chunk_store)?;

        Ok(())
    }
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
    StoredChunk {
        vector_key: row.get("vector_key"),
        document_id: row.get("document_id"),
        ordinal: row.get("ordinal"),
        content: row.get("content"),
        filename: row
            .try_get("filename")
            .unwrap_or_else(|_| "Unknown".to_string()),
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn put(
        &self,
        vector_key: &str,
        document_id: i64,
        ordinal: i64,
        content: &str,
    ) -> Result<(), RagError> {
        sqlx::query(
            "INSERT OR REPLACE INTO chunks (vector_key, document_id, ordinal, content)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(vector_key)
        .bind(document_id)
        .bind(ordinal)
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(RagError::chunk_store)?;

        Ok(())
    }

    async fn get(&self, vector_key: &str) -> Result<Option<StoredChunk>, RagError> {
        let row = sqlx::query(
            "SELECT c.vector_key, c.document_id, c.ordinal, c.content,
                    COALESCE(d.filename, 'Unknown') AS filename
             FROM chunks c
             LEFT JOIN documents d ON c.document_id = d.id
             WHERE c.vector_key = ?1",
        )
        .bind(vector_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(RagError::chunk_store)?;

        Ok(row.as_ref().map(chunk_from_row))
    }

    async fn get_many(&self, vector_keys: &[String]) -> Result<Vec<StoredChunk>, RagError> {
        if vector_keys.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; vector_keys.len()].join(",");
        let sql = format!(
            "SELECT c.vector_key, c.document_id, c.ordinal, c.content,
                    COALESCE(d.filename, 'Unknown') AS filename
             FROM chunks c
             LEFT JOIN documents d ON c.document_id = d.id
             WHERE c.vector_key IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for key in vector_keys {
            query = query.bind(key);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::chunk_store)?;

        Ok(rows.iter().map(chunk_from_row).collect())
    }

    async fn keys_for_document(&self, document_id: i64) -> Result<Vec<String>, RagError> {
        let rows = sqlx::query(
            "SELECT vector_key FROM chunks WHERE document_id = ?1 ORDER BY ordinal",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::chunk_store)?;

        Ok(rows.iter().map(|row| row.get("vector_key")).collect())
    }

    async fn all_keys(&self) -> Result<Vec<String>, RagError> {
        let rows = sqlx::query("SELECT vector_key FROM chunks")
            .fetch_all(&self.pool)
            .await
            .map_err(RagError::chunk_store)?;

        Ok(rows.iter().map(|row| row.get("vector_key")).collect())
    }

    async fn delete_document(&self, document_id: i64) -> Result<usize, RagError> {
        let result = sqlx::query("DELETE FROM chunks WHERE document_id = ?1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(RagError::chunk_store)?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete_all(&self) -> Result<usize, RagError> {
        let result = sqlx::query("DELETE FROM chunks")
            .execute(&self.pool)
            .await
            .map_err(RagError::chunk_store)?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::documents::DocumentStore;

    async fn test_store() -> (SqliteChunkStore, DocumentStore) {
        let tmp =
            std::env::temp_dir().join(format!("docrag-chunks-test-{}.db", uuid::Uuid::new_v4()));
        let pool = db::connect(&tmp).await.unwrap();
        let docs = DocumentStore::new(pool.clone()).await.unwrap();
        let chunks = SqliteChunkStore::new(pool).await.unwrap();
        (chunks, docs)
    }

    #[tokio::test]
    async fn put_get_roundtrip_with_filename() {
        let (store, docs) = test_store().await;
        let doc = docs.insert("notes.md", "md", 100).await.unwrap();

        store
            .put("doc-1-chunk-0", doc.id, 0, "first chunk")
            .await
            .unwrap();

        let chunk = store.get("doc-1-chunk-0").await.unwrap().unwrap();
        assert_eq!(chunk.content, "first chunk");
        assert_eq!(chunk.filename, "notes.md");
        assert_eq!(chunk.document_id, doc.id);
    }

    #[tokio::test]
    async fn missing_document_degrades_filename_to_unknown() {
        let (store, _docs) = test_store().await;

        // chunk row whose document metadata is gone
        store.put("orphan", 99, 0, "dangling text").await.unwrap();

        let chunk = store.get("orphan").await.unwrap().unwrap();
        assert_eq!(chunk.filename, "Unknown");
        assert_eq!(chunk.content, "dangling text");
    }

    #[tokio::test]
    async fn get_many_skips_missing_keys() {
        let (store, docs) = test_store().await;
        let doc = docs.insert("a.md", "md", 10).await.unwrap();

        store.put("k0", doc.id, 0, "zero").await.unwrap();
        store.put("k1", doc.id, 1, "one").await.unwrap();

        let found = store
            .get_many(&["k0".to_string(), "missing".to_string(), "k1".to_string()])
            .await
            .unwrap();

        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let (store, _docs) = test_store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn keys_follow_ordinal_order() {
        let (store, docs) = test_store().await;
        let doc = docs.insert("a.md", "md", 10).await.unwrap();

        store.put("k2", doc.id, 2, "two").await.unwrap();
        store.put("k0", doc.id, 0, "zero").await.unwrap();
        store.put("k1", doc.id, 1, "one").await.unwrap();

        let keys = store.keys_for_document(doc.id).await.unwrap();
        assert_eq!(keys, vec!["k0", "k1", "k2"]);
    }

    #[tokio::test]
    async fn delete_document_removes_only_its_chunks() {
        let (store, docs) = test_store().await;
        let a = docs.insert("a.md", "md", 10).await.unwrap();
        let b = docs.insert("b.md", "md", 10).await.unwrap();

        store.put("a0", a.id, 0, "x").await.unwrap();
        store.put("a1", a.id, 1, "y").await.unwrap();
        store.put("b0", b.id, 0, "z").await.unwrap();

        assert_eq!(store.delete_document(a.id).await.unwrap(), 2);
        assert_eq!(store.all_keys().await.unwrap(), vec!["b0"]);
    }
}
