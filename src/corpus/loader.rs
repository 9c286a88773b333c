//! Loading transcript JSON files into segments.
//!
//! Two file shapes are accepted:
//!
//! - Whisper output written by the transcription step:
//!   `{"chunks": [{"number", "title", "start", "end", "text"}], "text": "..."}`.
//!   The file stem becomes the source and ids are `{source}_{chunk index}`.
//! - A JSON array of ingestion records (see [`SegmentRecord`]).

use super::Segment;
use crate::error::{KildeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// A transcript record as delivered by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Explicit id; defaults to `{source}_{n}`.
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub text: String,
    #[serde(alias = "start")]
    pub start_seconds: f64,
    #[serde(alias = "end")]
    pub end_seconds: f64,
    #[serde(default)]
    pub start_label: Option<String>,
    #[serde(default)]
    pub end_label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperChunk {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Whisper { chunks: Vec<WhisperChunk> },
    Records(Vec<SegmentRecord>),
}

/// Convert ingestion records into segments.
///
/// Records without an id get `{source}_{n}`, with `n` counting per source
/// in record order.
pub fn segments_from_records(records: Vec<SegmentRecord>) -> Result<Vec<Segment>> {
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut segments = Vec::with_capacity(records.len());

    for record in records {
        let n = counters.entry(record.source.clone()).or_insert(0);
        let id = record
            .id
            .unwrap_or_else(|| format!("{}_{}", record.source, n));
        *n += 1;

        let segment = match (record.start_label, record.end_label) {
            (Some(start_label), Some(end_label)) => Segment::with_labels(
                id,
                record.source,
                record.text.trim(),
                record.start_seconds,
                record.end_seconds,
                start_label,
                end_label,
            )?,
            _ => Segment::new(
                id,
                record.source,
                record.text.trim(),
                record.start_seconds,
                record.end_seconds,
            )?,
        };
        segments.push(segment);
    }

    Ok(segments)
}

/// Parse a single transcript file.
pub fn load_file(path: &Path) -> Result<Vec<Segment>> {
    let content = std::fs::read_to_string(path)?;
    let parsed: TranscriptFile = serde_json::from_str(&content)?;

    match parsed {
        TranscriptFile::Whisper { chunks } => {
            let source = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .ok_or_else(|| {
                    KildeError::InvalidSegment(format!("No file name: {}", path.display()))
                })?;

            let mut segments = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.into_iter().enumerate() {
                let text = chunk.text.trim();
                if text.is_empty() {
                    debug!("Skipping empty chunk {} in {}", i, source);
                    continue;
                }
                segments.push(Segment::new(
                    format!("{}_{}", source, i),
                    source.clone(),
                    text,
                    chunk.start,
                    chunk.end,
                )?);
            }
            Ok(segments)
        }
        TranscriptFile::Records(records) => segments_from_records(records),
    }
}

/// Load every `*.json` transcript in a directory, in file name order.
#[instrument]
pub fn load_dir(dir: &Path) -> Result<Vec<Segment>> {
    if !dir.is_dir() {
        return Err(KildeError::Config(format!(
            "Corpus directory not found: {}",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    if paths.is_empty() {
        warn!("No transcript files in {}", dir.display());
    }

    let mut segments = Vec::new();
    for path in &paths {
        let loaded = load_file(path).map_err(|e| {
            KildeError::InvalidSegment(format!("{}: {}", path.display(), e))
        })?;
        debug!("Loaded {} segments from {}", loaded.len(), path.display());
        segments.extend(loaded);
    }

    info!(
        "Loaded {} segments from {} transcript files",
        segments.len(),
        paths.len()
    );
    Ok(segments)
}
