//! Error types for Kilde.

use thiserror::Error;

/// Library-level error type for Kilde operations.
#[derive(Error, Debug)]
pub enum KildeError {
    #[error("Query is empty")]
    EmptyQuery,

    #[error("Scorer unavailable: {0}")]
    ScorerUnavailable(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Ranked id has no matching segment: {0}")]
    IdConsistencyFault(String),

    #[error("Duplicate segment id: {0}")]
    DuplicateSegmentId(String),

    #[error("Segment not found: {0}")]
    SegmentNotFound(String),

    #[error("Invalid segment: {0}")]
    InvalidSegment(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl KildeError {
    /// Whether the error means a backend could not serve the request,
    /// as opposed to bad input or corrupt data.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            KildeError::RetrievalUnavailable(_) | KildeError::ScorerUnavailable(_)
        )
    }
}

/// Result type alias for Kilde operations.
pub type Result<T> = std::result::Result<T, KildeError>;
