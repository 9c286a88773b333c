//! Vector store abstraction for Kilde.
//!
//! Stores one embedding per corpus segment, keyed by the segment id, so that
//! semantic search results share the id space of the corpus index.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::config::Settings;
use crate::error::{KildeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// The embedding of one corpus segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEmbedding {
    /// Corpus segment id.
    pub segment_id: String,
    /// Source video of the segment.
    pub source: String,
    /// Embedding vector.
    pub embedding: Vec<f32>,
    /// When this embedding was stored.
    pub indexed_at: DateTime<Utc>,
}

impl SegmentEmbedding {
    pub fn new(segment_id: String, source: String, embedding: Vec<f32>) -> Self {
        Self {
            segment_id,
            source,
            embedding,
            indexed_at: Utc::now(),
        }
    }
}

/// A search hit with score.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    /// Matched segment id.
    pub segment_id: String,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Bulk insert or replace embeddings.
    async fn upsert_batch(&self, entries: &[SegmentEmbedding]) -> Result<usize>;

    /// Most similar segments, best first.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorMatch>>;

    /// Ids of every stored segment.
    async fn indexed_ids(&self) -> Result<HashSet<String>>;

    /// Delete everything.
    async fn clear(&self) -> Result<usize>;

    /// Total stored embeddings.
    async fn count(&self) -> Result<usize>;
}

/// Create the vector store named in the settings.
pub fn create_vector_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.to_lowercase().as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(KildeError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score one stored embedding against the query.
///
/// A stored vector of a different dimension means the store was built with
/// another embedding model; it cannot be ranked.
pub(crate) fn score_match(
    query_embedding: &[f32],
    segment_id: &str,
    embedding: &[f32],
) -> Result<VectorMatch> {
    if embedding.len() != query_embedding.len() {
        return Err(KildeError::VectorStore(format!(
            "Embedding for {} has {} dimensions, query has {}; re-index with --force",
            segment_id,
            embedding.len(),
            query_embedding.len()
        )));
    }

    Ok(VectorMatch {
        segment_id: segment_id.to_string(),
        score: cosine_similarity(query_embedding, embedding),
    })
}

/// Sort matches best first, equal scores by id, and keep `limit`.
pub(crate) fn rank_matches(mut matches: Vec<VectorMatch>, limit: usize) -> Vec<VectorMatch> {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.segment_id.cmp(&b.segment_id))
    });
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_score_match_rejects_dimension_mismatch() {
        let err = score_match(&[1.0, 0.0, 0.0], "v1_0", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, KildeError::VectorStore(msg) if msg.contains("v1_0")));

        let ok = score_match(&[1.0, 0.0], "v1_0", &[1.0, 0.0]).unwrap();
        assert!((ok.score - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_rank_matches_breaks_ties_by_id() {
        let matches = vec![
            VectorMatch { segment_id: "b".to_string(), score: 0.5 },
            VectorMatch { segment_id: "c".to_string(), score: 0.9 },
            VectorMatch { segment_id: "a".to_string(), score: 0.5 },
        ];

        let ranked = rank_matches(matches, 2);
        let ids: Vec<&str> = ranked.iter().map(|m| m.segment_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }
}
