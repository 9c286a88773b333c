//! The retrieval entry point: `retrieve(query) -> (context, citations)`.

use super::fusion::{reciprocal_rank_fusion, FusionConfig};
use super::keyword::KeywordScorer;
use super::merger::{merge_segments, Citation, DEFAULT_MERGE_THRESHOLD_SECONDS};
use super::semantic::SemanticScorer;
use super::RankedList;
use crate::corpus::{CorpusIndex, Segment};
use crate::error::{KildeError, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Separator between context blocks.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Retrieval tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalConfig {
    /// Candidates requested from each scorer before fusion.
    pub candidates: usize,
    pub fusion: FusionConfig,
    pub merge_threshold_seconds: f64,
    /// Upper bound on waiting for both scorers. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidates: 20,
            fusion: FusionConfig::default(),
            merge_threshold_seconds: DEFAULT_MERGE_THRESHOLD_SECONDS,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Grounding context and citations for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Retrieval {
    /// `Source: ...\nContent: ...` blocks in fused order.
    pub context: String,
    pub citations: Vec<Citation>,
}

impl Retrieval {
    /// True when nothing relevant was found.
    pub fn is_empty(&self) -> bool {
        self.citations.is_empty()
    }
}

/// Hybrid retriever over an immutable corpus.
///
/// Cheap to share: every field is read-only after construction.
pub struct Retriever {
    index: Arc<CorpusIndex>,
    keyword: Arc<KeywordScorer>,
    semantic: Arc<dyn SemanticScorer>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<CorpusIndex>,
        keyword: Arc<KeywordScorer>,
        semantic: Arc<dyn SemanticScorer>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            index,
            keyword,
            semantic,
            config,
        }
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    /// Retrieve grounding context and citations for a question.
    ///
    /// Blank queries fail with `EmptyQuery` before any scorer runs. An empty
    /// corpus yields an empty `Retrieval`. A failing or slow semantic scorer
    /// fails the whole call with `RetrievalUnavailable`.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        let query = query.trim();
        if query.is_empty() {
            return Err(KildeError::EmptyQuery);
        }

        if self.index.is_empty() {
            info!("Corpus is empty, nothing to retrieve");
            return Ok(Retrieval::default());
        }

        let (semantic, keyword) = self.rank(query).await?;
        debug!(
            "Scorers returned {} semantic and {} keyword candidates",
            semantic.len(),
            keyword.len()
        );

        let fused = reciprocal_rank_fusion(&semantic, &keyword, &self.config.fusion);
        let segments = self.resolve(&fused)?;

        let context = build_context(&segments);
        let citations = merge_segments(&segments, self.config.merge_threshold_seconds);

        info!(
            "Retrieved {} segments as {} citations",
            segments.len(),
            citations.len()
        );
        Ok(Retrieval { context, citations })
    }

    /// Run both scorers concurrently under the configured timeout.
    async fn rank(&self, query: &str) -> Result<(RankedList, RankedList)> {
        let k = self.config.candidates;

        // BM25 scans every document, so it runs on the blocking pool.
        let keyword = self.keyword.clone();
        let keyword_query = query.to_string();
        let keyword_task = tokio::task::spawn_blocking(move || keyword.top_k(&keyword_query, k));

        let joined = async {
            let (semantic, keyword) = tokio::join!(self.semantic.query(query, k), keyword_task);
            let keyword = keyword.map_err(|e| {
                KildeError::RetrievalUnavailable(format!("keyword scorer: {}", e))
            })?;
            semantic.map(|semantic| (semantic, keyword))
        };

        // Dropping `joined` on timeout cancels the in-flight semantic call.
        let result = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, joined).await.map_err(|_| {
                KildeError::RetrievalUnavailable(format!(
                    "scorers did not answer within {:?}",
                    limit
                ))
            })?,
            None => joined.await,
        };

        result.map_err(|e| match e {
            KildeError::RetrievalUnavailable(_) => e,
            other => KildeError::RetrievalUnavailable(format!("semantic scorer: {}", other)),
        })
    }

    fn resolve(&self, fused: &RankedList) -> Result<Vec<&Segment>> {
        fused
            .iter()
            .map(|(id, _)| {
                self.index
                    .lookup(id)
                    .map_err(|_| KildeError::IdConsistencyFault(id.clone()))
            })
            .collect()
    }
}

/// Concatenate segments into prompt context.
pub fn build_context(segments: &[&Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("Source: {}\nContent: {}", s.source(), s.text()))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
