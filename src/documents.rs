//! Document metadata store.
//!
//! Bookkeeping for uploaded documents: filename, type, size, chunk count
//! and upload time. Chunk rows and vectors are owned by the RAG stores;
//! this table is the listing authority, so deletion here happens last.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub file_size: i64,
    pub chunk_count: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Aggregate stats over all documents.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub total_size: i64,
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, ApiError> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                file_type TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                uploaded_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn insert(
        &self,
        filename: &str,
        file_type: &str,
        file_size: i64,
    ) -> Result<Document, ApiError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO documents (filename, file_type, file_size, chunk_count)
             VALUES (?1, ?2, ?3, 0) RETURNING id",
        )
        .bind(filename)
        .bind(file_type)
        .bind(file_size)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        self.get(id)
            .await?
            .ok_or_else(|| ApiError::Internal("inserted document not found".to_string()))
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>, ApiError> {
        let row = sqlx::query(
            "SELECT id, filename, file_type, file_size, chunk_count, uploaded_at
             FROM documents WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.map(|row| document_from_row(&row)))
    }

    /// All documents, newest first.
    pub async fn list(&self) -> Result<Vec<Document>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, filename, file_type, file_size, chunk_count, uploaded_at
             FROM documents ORDER BY uploaded_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows.iter().map(document_from_row).collect())
    }

    pub async fn stats(&self) -> Result<DocumentStats, ApiError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_documents,
                    COALESCE(SUM(chunk_count), 0) AS total_chunks,
                    COALESCE(SUM(file_size), 0) AS total_size
             FROM documents",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(DocumentStats {
            total_documents: row.get("total_documents"),
            total_chunks: row.get("total_chunks"),
            total_size: row.get("total_size"),
        })
    }

    /// Finalize the chunk count after ingestion.
    pub async fn set_chunk_count(&self, id: i64, chunk_count: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE documents SET chunk_count = ?1 WHERE id = ?2")
            .bind(chunk_count)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all(&self) -> Result<usize, ApiError> {
        let result = sqlx::query("DELETE FROM documents")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.rows_affected() as usize)
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Document {
    let uploaded_at: String = row.get("uploaded_at");
    Document {
        id: row.get("id"),
        filename: row.get("filename"),
        file_type: row.get("file_type"),
        file_size: row.get("file_size"),
        chunk_count: row.get("chunk_count"),
        uploaded_at: uploaded_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_store() -> DocumentStore {
        let tmp = std::env::temp_dir().join(format!("docrag-docs-test-{}.db", uuid::Uuid::new_v4()));
        let pool = db::connect(&tmp).await.unwrap();
        DocumentStore::new(pool).await.unwrap()
    }

    #[tokio::test]
    async fn insert_and_list() {
        let store = test_store().await;

        let doc = store.insert("notes.md", "md", 1234).await.unwrap();
        assert_eq!(doc.filename, "notes.md");
        assert_eq!(doc.chunk_count, 0);

        store.set_chunk_count(doc.id, 7).await.unwrap();

        let docs = store.list().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].chunk_count, 7);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 7);
        assert_eq!(stats.total_size, 1234);
    }

    #[tokio::test]
    async fn delete_document() {
        let store = test_store().await;

        let doc = store.insert("a.md", "md", 10).await.unwrap();
        assert!(store.delete(doc.id).await.unwrap());
        assert!(!store.delete(doc.id).await.unwrap());
        assert!(store.get(doc.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_all_reports_count() {
        let store = test_store().await;

        store.insert("a.md", "md", 1).await.unwrap();
        store.insert("b.md", "md", 2).await.unwrap();

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert_eq!(store.stats().await.unwrap().total_documents, 0);
    }
}
