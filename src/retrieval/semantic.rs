//! Dense semantic scoring.

use super::RankedList;
use crate::embedding::Embedder;
use crate::error::{KildeError, Result};
use crate::vector_store::VectorStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A ranked-list provider over the corpus id space.
///
/// Results are sorted best first. Only the order is used downstream.
#[async_trait]
pub trait SemanticScorer: Send + Sync {
    async fn query(&self, text: &str, k: usize) -> Result<RankedList>;
}

/// Semantic scorer that embeds the query and searches a vector store.
pub struct EmbeddingScorer {
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
}

impl EmbeddingScorer {
    pub fn new(embedder: Arc<dyn Embedder>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            vector_store,
        }
    }
}

#[async_trait]
impl SemanticScorer for EmbeddingScorer {
    #[instrument(skip(self))]
    async fn query(&self, text: &str, k: usize) -> Result<RankedList> {
        let query_embedding = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| KildeError::ScorerUnavailable(format!("query embedding: {}", e)))?;

        let matches = self
            .vector_store
            .search(&query_embedding, k)
            .await
            .map_err(|e| KildeError::ScorerUnavailable(format!("vector search: {}", e)))?;

        debug!("Semantic search returned {} matches", matches.len());
        Ok(matches
            .into_iter()
            .map(|m| (m.segment_id, m.score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{MemoryVectorStore, SegmentEmbedding};

    /// Maps known words to fixed axes.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(match text {
                "keys" => vec![1.0, 0.0],
                "joins" => vec![0.0, 1.0],
                _ => vec![0.5, 0.5],
            })
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    /// A model with a different dimension than the stored vectors.
    struct WideEmbedder;

    #[async_trait]
    impl Embedder for WideEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(KildeError::Embedding("connection refused".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(KildeError::Embedding("connection refused".to_string()))
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    async fn store() -> Arc<dyn VectorStore> {
        let store = MemoryVectorStore::new();
        store
            .upsert_batch(&[
                SegmentEmbedding::new("v1_0".to_string(), "v1.mp4".to_string(), vec![1.0, 0.1]),
                SegmentEmbedding::new("v2_0".to_string(), "v2.mp4".to_string(), vec![0.1, 1.0]),
            ])
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_embedding_scorer_ranks_by_similarity() {
        let scorer = EmbeddingScorer::new(Arc::new(AxisEmbedder), store().await);

        let ranked = scorer.query("joins", 2).await.unwrap();
        assert_eq!(ranked[0].0, "v2_0");
        assert_eq!(ranked[1].0, "v1_0");

        assert_eq!(scorer.query("keys", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_scorer_unavailable() {
        let scorer = EmbeddingScorer::new(Arc::new(DownEmbedder), store().await);
        let err = scorer.query("keys", 2).await.unwrap_err();
        assert!(matches!(err, KildeError::ScorerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_scorer_unavailable() {
        let scorer = EmbeddingScorer::new(Arc::new(WideEmbedder), store().await);
        let err = scorer.query("keys", 2).await.unwrap_err();
        assert!(matches!(err, KildeError::ScorerUnavailable(msg) if msg.contains("dimensions")));
    }
}
