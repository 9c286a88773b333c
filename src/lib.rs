//! Kilde - Hybrid search over a transcribed video course
//!
//! Answers natural-language questions with timestamped citations into the
//! course videos. The name "Kilde" is Norwegian for "source."
//!
//! # Overview
//!
//! A question runs through BM25 keyword search and embedding search at the
//! same time. The two rankings are fused with Reciprocal Rank Fusion, the top
//! segments become prompt context, and segments close in time are merged into
//! citations like `v1.mp4 @ 0:00:10-0:00:22`.
//!
//! # Architecture
//!
//! - `corpus` - Transcript segments, loading, and the id index
//! - `retrieval` - Keyword and semantic scorers, fusion, merging, the retriever
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `answer` - Grounded answer generation
//! - `orchestrator` - Wiring from settings and semantic index sync
//! - `config` - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use kilde::config::Settings;
//! use kilde::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let retrieval = orchestrator.retriever().retrieve("what is a foreign key").await?;
//!     for citation in &retrieval.citations {
//!         println!("{} @ {}-{}", citation.source, citation.start_label, citation.end_label);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod answer;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod retrieval;
pub mod vector_store;

pub use error::{KildeError, Result};
