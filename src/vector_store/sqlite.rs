//! SQLite-based vector store implementation.
//!
//! Embeddings are stored as little-endian `f32` blobs. Search is a full scan
//! with cosine similarity computed in Rust.

use super::{rank_matches, score_match, SegmentEmbedding, VectorMatch, VectorStore};
use crate::error::{KildeError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS segment_embeddings (
        segment_id TEXT PRIMARY KEY,
        source TEXT NOT NULL,
        embedding BLOB NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_segment_embeddings_source ON segment_embeddings(source);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    /// Open (or create) a store at the given path.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| KildeError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    /// Serialize embedding to bytes.
    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize embedding from bytes.
    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn upsert_batch(&self, entries: &[SegmentEmbedding]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for entry in entries {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO segment_embeddings (segment_id, source, embedding, indexed_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    entry.segment_id,
                    entry.source,
                    Self::embedding_to_bytes(&entry.embedding),
                    entry.indexed_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        debug!("Batch upserted {} embeddings", entries.len());
        Ok(entries.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT segment_id, embedding FROM segment_embeddings")?;

        let rows = stmt.query_map([], |row| {
            let segment_id: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(1)?;
            Ok((segment_id, embedding_bytes))
        })?;

        let mut matches = Vec::new();
        for row in rows {
            let (segment_id, bytes) = row?;
            matches.push(score_match(
                query_embedding,
                &segment_id,
                &Self::bytes_to_embedding(&bytes),
            )?);
        }

        let results = rank_matches(matches, limit);
        debug!("Found {} matching segments", results.len());
        Ok(results)
    }

    async fn indexed_ids(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT segment_id FROM segment_embeddings")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    async fn clear(&self) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM segment_embeddings", [])?;
        info!("Cleared {} embeddings", deleted);
        Ok(deleted)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM segment_embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
