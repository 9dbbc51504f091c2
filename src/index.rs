//! Similarity Index
//!
//! Nearest-neighbor index over skill descriptions. The skill store only talks
//! to the [`SimilarityIndex`] trait; [`SqliteVectorIndex`] is the persisted
//! implementation, parameterized by whichever [`Embedder`] the configuration
//! selects.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::embeddings::{cosine_similarity, embedding_from_bytes, embedding_to_bytes, Embedder};

/// File name of the index database inside its directory
pub const INDEX_DB_FILE: &str = "index.db";

/// A ranked query hit
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: String,
    /// Cosine similarity, higher is closer
    pub score: f32,
    pub metadata: serde_json::Value,
}

impl IndexHit {
    /// Name recorded in metadata at insert time, falling back to the id
    pub fn name(&self) -> &str {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.id)
    }
}

/// Nearest-neighbor capability consumed by the skill store
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Insert or replace the entry for `id`, embedding `text`
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()>;

    /// Remove entries; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Number of entries
    async fn count(&self) -> Result<usize>;

    /// Top-`k` entries by descending similarity to `text`
    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;
}

/// SQLite-backed vector index.
///
/// Rows keep their insertion sequence across upserts, which is the tiebreak
/// for equal scores.
pub struct SqliteVectorIndex {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorIndex {
    /// Open or create the index under `dir`
    pub fn open(dir: &Path, embedder: Arc<dyn Embedder>) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create index directory {}", dir.display()))?;

        let path = dir.join(INDEX_DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open index at {}", path.display()))?;
        let index = Self::with_connection(conn, embedder)?;

        info!(path = %path.display(), backend = index.embedder.name(), "Similarity index opened");
        Ok(index)
    }

    /// Non-persistent index (tests, scratch runs)
    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, embedder)
    }

    fn with_connection(conn: Connection, embedder: Arc<dyn Embedder>) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL
            );
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
        })
    }

    /// Dimension of stored vectors, if any entry exists
    fn stored_dimension(conn: &Connection) -> Result<Option<usize>> {
        let len: Option<i64> = conn
            .query_row("SELECT length(embedding) FROM entries LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(len.map(|bytes| bytes as usize / 4))
    }
}

#[async_trait]
impl SimilarityIndex for SqliteVectorIndex {
    async fn upsert(&self, id: &str, text: &str, metadata: serde_json::Value) -> Result<()> {
        // Embed before taking the lock; the connection is never held across an await.
        let embedding = self
            .embedder
            .embed(text)
            .await
            .with_context(|| format!("Failed to embed text for {}", id))?;

        let conn = self.conn.lock();
        if let Some(dim) = Self::stored_dimension(&conn)? {
            if dim != embedding.len() {
                anyhow::bail!(
                    "Embedding dimension mismatch: index holds {}, got {}",
                    dim,
                    embedding.len()
                );
            }
        }

        conn.execute(
            r#"
            INSERT INTO entries (id, text, metadata, embedding)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                metadata = excluded.metadata,
                embedding = excluded.embedding
            "#,
            params![id, text, metadata.to_string(), embedding_to_bytes(&embedding)],
        )?;

        debug!(id = %id, dim = embedding.len(), "Index upsert");
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let conn = self.conn.lock();
        for id in ids {
            conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        }
        debug!(count = ids.len(), "Index delete");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<IndexHit>> {
        if k == 0 {
            return Ok(vec![]);
        }

        let query_vec = self
            .embedder
            .embed(text)
            .await
            .context("Failed to embed query")?;

        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, metadata, embedding FROM entries ORDER BY seq ASC")?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let metadata: String = row.get(1)?;
            let bytes: Vec<u8> = row.get(2)?;
            Ok((id, metadata, bytes))
        })?;

        let mut hits = Vec::new();
        for row in rows {
            let (id, metadata, bytes) = row?;
            let embedding = embedding_from_bytes(&bytes);
            hits.push(IndexHit {
                score: cosine_similarity(&query_vec, &embedding),
                metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
                id,
            });
        }

        // Stable sort: equal scores keep insertion order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM entries", [])?;
        info!("Similarity index cleared");
        Ok(())
    }
}
