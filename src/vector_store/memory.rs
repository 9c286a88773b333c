//! In-memory vector store implementation.
//!
//! Useful for testing and small courses.

use super::{rank_matches, score_match, SegmentEmbedding, VectorMatch, VectorStore};
use crate::error::{KildeError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory vector store.
pub struct MemoryVectorStore {
    entries: RwLock<HashMap<String, SegmentEmbedding>>,
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, SegmentEmbedding>>> {
        self.entries
            .read()
            .map_err(|e| KildeError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, SegmentEmbedding>>> {
        self.entries
            .write()
            .map_err(|e| KildeError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_batch(&self, entries: &[SegmentEmbedding]) -> Result<usize> {
        let mut store = self.write()?;
        for entry in entries {
            store.insert(entry.segment_id.clone(), entry.clone());
        }
        Ok(entries.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>> {
        let entries = self.read()?;

        let matches = entries
            .values()
            .map(|entry| score_match(query_embedding, &entry.segment_id, &entry.embedding))
            .collect::<Result<Vec<_>>>()?;

        Ok(rank_matches(matches, limit))
    }

    async fn indexed_ids(&self) -> Result<HashSet<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<usize> {
        let mut entries = self.write()?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}
