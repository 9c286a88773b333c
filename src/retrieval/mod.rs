//! Hybrid retrieval: BM25 keyword search and semantic search, fused with
//! Reciprocal Rank Fusion and merged into timestamped citations.
//!
//! ```text
//! query ─┬─> KeywordScorer ──┐
//!        └─> SemanticScorer ─┴─> RRF ─> top-N segments ─┬─> context text
//!                                                        └─> SegmentMerger ─> citations
//! ```

pub mod fusion;
pub mod keyword;
pub mod merger;
mod retriever;
pub mod semantic;

pub use fusion::{reciprocal_rank_fusion, FusionConfig};
pub use keyword::KeywordScorer;
pub use merger::{merge_segments, Citation};
pub use retriever::{Retrieval, RetrievalConfig, Retriever};
pub use semantic::{EmbeddingScorer, SemanticScorer};

/// `(segment id, score)` pairs, best first.
pub type RankedList = Vec<(String, f32)>;
