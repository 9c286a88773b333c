//! Wiring for Kilde.
//!
//! Loads the corpus, builds the scorers, and keeps the semantic index in sync
//! with the transcripts on disk.

use crate::answer::{create_generator, AnswerEngine};
use crate::config::{Prompts, Settings};
use crate::corpus::{load_dir, CorpusIndex, Segment, SourceSummary};
use crate::embedding::{create_embedder, Embedder};
use crate::error::Result;
use crate::retrieval::{EmbeddingScorer, KeywordScorer, Retriever};
use crate::vector_store::{create_vector_store, SegmentEmbedding, VectorStore};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The main orchestrator for Kilde.
pub struct Orchestrator {
    settings: Settings,
    prompts: Prompts,
    index: Arc<CorpusIndex>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    retriever: Arc<Retriever>,
}

impl Orchestrator {
    /// Create an orchestrator from settings, loading the corpus from disk.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let segments = load_dir(&settings.corpus_dir())?;
        let index = CorpusIndex::build(segments)?;
        info!(
            "Loaded {} segments from {}",
            index.len(),
            settings.corpus_dir().display()
        );

        let embedder = create_embedder(&settings.embedding)?;
        let vector_store = create_vector_store(&settings)?;

        Ok(Self::with_components(
            settings,
            prompts,
            index,
            embedder,
            vector_store,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        prompts: Prompts,
        index: CorpusIndex,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        let index = Arc::new(index);
        let keyword = Arc::new(KeywordScorer::with_params(
            &index,
            settings.retrieval.bm25_k1,
            settings.retrieval.bm25_b,
        ));
        let semantic = Arc::new(EmbeddingScorer::new(
            embedder.clone(),
            vector_store.clone(),
        ));
        let retriever = Arc::new(Retriever::new(
            index.clone(),
            keyword,
            semantic,
            settings.retrieval.to_config(),
        ));

        Self {
            settings,
            prompts,
            index,
            embedder,
            vector_store,
            retriever,
        }
    }

    pub fn corpus(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn vector_store(&self) -> Arc<dyn VectorStore> {
        self.vector_store.clone()
    }

    /// Shared retriever over the loaded corpus.
    pub fn retriever(&self) -> Arc<Retriever> {
        self.retriever.clone()
    }

    /// Build an answer engine. `model` overrides the configured generation model.
    pub fn answer_engine(&self, model: Option<&str>) -> Result<AnswerEngine> {
        let generator = create_generator(&self.settings.generation, model)?;
        Ok(AnswerEngine::new(self.retriever.clone(), generator)
            .with_prompts(self.prompts.clone())
            .with_course_name(&self.settings.corpus.course_name))
    }

    /// Sources in the corpus, in load order.
    pub fn sources(&self) -> Vec<SourceSummary> {
        self.index.sources()
    }

    /// Embed every corpus segment missing from the vector store.
    ///
    /// With `force`, the store is cleared first and everything is re-embedded.
    /// Fails on the first batch that cannot be embedded or stored.
    #[instrument(skip(self, progress))]
    pub async fn index_embeddings(&self, force: bool, progress: &ProgressBar) -> Result<IndexResult> {
        if force {
            let removed = self.vector_store.clear().await?;
            info!("Cleared {} stored embeddings", removed);
        }

        let indexed = self.vector_store.indexed_ids().await?;

        let mut orphaned: Vec<String> = indexed
            .iter()
            .filter(|id| !self.index.contains(id))
            .cloned()
            .collect();
        orphaned.sort();
        if !orphaned.is_empty() {
            warn!(
                "{} stored embeddings have no matching segment; run with --force to rebuild",
                orphaned.len()
            );
        }

        let pending: Vec<&Segment> = self
            .index
            .iter()
            .filter(|s| !indexed.contains(s.id()))
            .collect();
        let skipped = self.index.len() - pending.len();

        progress.set_length(pending.len() as u64);

        let batch_size = self.settings.embedding.batch_size.max(1);
        let max_concurrent = self.settings.embedding.max_concurrent.max(1);

        let mut stream = stream::iter(pending.chunks(batch_size))
            .map(|batch| self.embed_batch(batch))
            .buffer_unordered(max_concurrent);

        let mut embedded = 0;
        while let Some(result) = stream.next().await {
            let count = result?;
            embedded += count;
            progress.inc(count as u64);
        }

        info!("Embedded {} segments, {} already indexed", embedded, skipped);

        Ok(IndexResult {
            embedded,
            skipped,
            total: self.index.len(),
            orphaned,
        })
    }

    async fn embed_batch(&self, batch: &[&Segment]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|s| s.text().to_string()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let entries: Vec<SegmentEmbedding> = batch
            .iter()
            .zip(embeddings)
            .map(|(segment, embedding)| {
                SegmentEmbedding::new(
                    segment.id().to_string(),
                    segment.source().to_string(),
                    embedding,
                )
            })
            .collect();

        self.vector_store.upsert_batch(&entries).await
    }
}

/// Result of syncing the semantic index.
#[derive(Debug)]
pub struct IndexResult {
    /// Segments embedded in this run.
    pub embedded: usize,
    /// Segments that were already indexed.
    pub skipped: usize,
    /// Segments in the corpus.
    pub total: usize,
    /// Stored ids with no matching corpus segment.
    pub orphaned: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KildeError;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds by keyword presence and counts requests.
    #[derive(Default)]
    struct KeywordEmbedder {
        requests: AtomicUsize,
    }

    impl KeywordEmbedder {
        fn vector(text: &str) -> Vec<f32> {
            vec![
                if text.contains("key") { 1.0 } else { 0.0 },
                if text.contains("join") { 1.0 } else { 0.0 },
                0.1,
            ]
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(Self::vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| Self::vector(t)).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(KildeError::Embedding("offline".to_string()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(KildeError::Embedding("offline".to_string()))
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    fn corpus() -> CorpusIndex {
        CorpusIndex::build(vec![
            Segment::new("v1_0", "v1.mp4", "a primary key uniquely identifies a row", 10.0, 15.0)
                .unwrap(),
            Segment::new("v1_1", "v1.mp4", "foreign keys reference other tables", 18.0, 22.0)
                .unwrap(),
            Segment::new("v2_0", "v2.mp4", "an inner join matches rows", 0.0, 6.0).unwrap(),
        ])
        .unwrap()
    }

    fn settings(batch_size: usize) -> Settings {
        let mut settings = Settings::default();
        settings.embedding.batch_size = batch_size;
        settings.vector_store.provider = "memory".to_string();
        settings
    }

    fn orchestrator(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Orchestrator {
        Orchestrator::with_components(settings(2), Prompts::default(), corpus(), embedder, store)
    }

    #[tokio::test]
    async fn test_index_embeddings_is_incremental() {
        let embedder = Arc::new(KeywordEmbedder::default());
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let orchestrator = orchestrator(embedder.clone(), store.clone());

        let first = orchestrator
            .index_embeddings(false, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(first.embedded, 3);
        assert_eq!(first.skipped, 0);
        assert_eq!(first.total, 3);
        // Three segments in batches of two.
        assert_eq!(embedder.requests.load(Ordering::SeqCst), 2);
        assert_eq!(store.count().await.unwrap(), 3);

        let second = orchestrator
            .index_embeddings(false, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(second.embedded, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(embedder.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_orphaned_ids_reported_and_cleared_by_force() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        store
            .upsert_batch(&[SegmentEmbedding::new(
                "old_7".to_string(),
                "old.mp4".to_string(),
                vec![0.0, 0.0, 1.0],
            )])
            .await
            .unwrap();
        let orchestrator = orchestrator(Arc::new(KeywordEmbedder::default()), store.clone());

        let result = orchestrator
            .index_embeddings(false, &ProgressBar::hidden())
            .await
            .unwrap();
        assert_eq!(result.orphaned, vec!["old_7".to_string()]);

        let forced = orchestrator
            .index_embeddings(true, &ProgressBar::hidden())
            .await
            .unwrap();
        assert!(forced.orphaned.is_empty());
        assert_eq!(forced.embedded, 3);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts_indexing() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let orchestrator = orchestrator(Arc::new(FailingEmbedder), store.clone());

        let err = orchestrator
            .index_embeddings(false, &ProgressBar::hidden())
            .await
            .unwrap_err();
        assert!(matches!(err, KildeError::Embedding(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_retriever_uses_indexed_embeddings() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        let orchestrator = orchestrator(Arc::new(KeywordEmbedder::default()), store);
        orchestrator
            .index_embeddings(false, &ProgressBar::hidden())
            .await
            .unwrap();

        let retrieval = orchestrator.retriever().retrieve("primary key").await.unwrap();
        assert!(retrieval.context.starts_with("Source: v1.mp4\nContent: a primary key"));
        assert!(retrieval.citations.iter().any(|c| c.source == "v1.mp4"));
    }

    #[tokio::test]
    async fn test_stale_embedding_dimensions_fail_retrieval() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryVectorStore::new());
        store
            .upsert_batch(&[SegmentEmbedding::new(
                "v1_0".to_string(),
                "v1.mp4".to_string(),
                vec![1.0, 0.0],
            )])
            .await
            .unwrap();
        let orchestrator = orchestrator(Arc::new(KeywordEmbedder::default()), store);

        let err = orchestrator
            .retriever()
            .retrieve("primary key")
            .await
            .unwrap_err();
        assert!(matches!(err, KildeError::RetrievalUnavailable(_)));
    }

    #[test]
    fn test_new_loads_corpus_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("01 - Intro.json"),
            r#"{"text": "", "chunks": [
                {"number": 0, "title": "", "start": 0.0, "end": 4.0, "text": " Welcome "},
                {"number": 1, "title": "", "start": 4.0, "end": 9.0, "text": "SELECT basics"}
            ]}"#,
        )
        .unwrap();

        let mut settings = settings(32);
        settings.corpus.dir = dir.path().to_string_lossy().to_string();

        let orchestrator = Orchestrator::new(settings).unwrap();
        assert_eq!(orchestrator.corpus().len(), 2);

        let sources = orchestrator.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "01 - Intro");
        assert_eq!(sources[0].segment_count, 2);
    }
}
