//! Transcript corpus: segments and the immutable index over them.
//!
//! The index is built once at startup and shared read-only by every request.

pub mod loader;

pub use loader::{load_dir, segments_from_records, SegmentRecord};

use crate::error::{KildeError, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Smallest retrievable transcript fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    id: String,
    source: String,
    text: String,
    start_seconds: f64,
    end_seconds: f64,
    start_label: String,
    end_label: String,
}

impl Segment {
    /// Create a segment, deriving the `H:MM:SS` labels from the time bounds.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        text: impl Into<String>,
        start_seconds: f64,
        end_seconds: f64,
    ) -> Result<Self> {
        Self::with_labels(
            id,
            source,
            text,
            start_seconds,
            end_seconds,
            format_label(start_seconds),
            format_label(end_seconds),
        )
    }

    /// Create a segment with labels supplied by ingestion.
    ///
    /// Labels are trusted to match the seconds values.
    pub fn with_labels(
        id: impl Into<String>,
        source: impl Into<String>,
        text: impl Into<String>,
        start_seconds: f64,
        end_seconds: f64,
        start_label: impl Into<String>,
        end_label: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();

        if !start_seconds.is_finite() || !end_seconds.is_finite() || start_seconds < 0.0 {
            return Err(KildeError::InvalidSegment(format!(
                "{}: time bounds must be finite and non-negative",
                id
            )));
        }
        if start_seconds > end_seconds {
            return Err(KildeError::InvalidSegment(format!(
                "{}: start {} is after end {}",
                id, start_seconds, end_seconds
            )));
        }

        Ok(Self {
            id,
            source: source.into(),
            text: text.into(),
            start_seconds,
            end_seconds,
            start_label: start_label.into(),
            end_label: end_label.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Originating video (file name or logical title).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    pub fn start_label(&self) -> &str {
        &self.start_label
    }

    pub fn end_label(&self) -> &str {
        &self.end_label
    }
}

/// Format an offset in seconds as `H:MM:SS`.
pub fn format_label(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    format!("{}:{:02}:{:02}", hours, minutes, secs)
}

/// Summary of one source video in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub segment_count: usize,
    /// Latest segment end, a lower bound on the video duration.
    pub duration_seconds: f64,
}

/// Immutable mapping from segment id to segment, with load order preserved.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    segments: HashMap<String, Segment>,
    order: Vec<String>,
}

impl CorpusIndex {
    /// Build the index. Fails on the first repeated id.
    pub fn build(segments: impl IntoIterator<Item = Segment>) -> Result<Self> {
        let mut index = Self::default();

        for segment in segments {
            if index.segments.contains_key(segment.id()) {
                return Err(KildeError::DuplicateSegmentId(segment.id().to_string()));
            }
            index.order.push(segment.id().to_string());
            index.segments.insert(segment.id().to_string(), segment);
        }

        Ok(index)
    }

    pub fn lookup(&self, id: &str) -> Result<&Segment> {
        self.segments
            .get(id)
            .ok_or_else(|| KildeError::SegmentNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.segments.contains_key(id)
    }

    /// Segment ids in load order, the keyword scorer's tie-break order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    /// Segments in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.order.iter().filter_map(|id| self.segments.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Distinct sources in first-seen load order.
    pub fn sources(&self) -> Vec<SourceSummary> {
        let mut summaries: Vec<SourceSummary> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for segment in self.iter() {
            let pos = *positions.entry(segment.source()).or_insert_with(|| {
                summaries.push(SourceSummary {
                    source: segment.source().to_string(),
                    segment_count: 0,
                    duration_seconds: 0.0,
                });
                summaries.len() - 1
            });

            let summary = &mut summaries[pos];
            summary.segment_count += 1;
            summary.duration_seconds = summary.duration_seconds.max(segment.end_seconds());
        }

        summaries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, source: &str, start: f64, end: f64) -> Segment {
        Segment::new(id, source, "text", start, end).unwrap()
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(0.0), "0:00:00");
        assert_eq!(format_label(125.7), "0:02:05");
        assert_eq!(format_label(3723.0), "1:02:03");
    }

    #[test]
    fn test_segment_rejects_inverted_bounds() {
        let err = Segment::new("x_0", "x", "t", 12.0, 5.0).unwrap_err();
        assert!(matches!(err, KildeError::InvalidSegment(_)));

        let err = Segment::new("x_1", "x", "t", f64::NAN, 5.0).unwrap_err();
        assert!(matches!(err, KildeError::InvalidSegment(_)));
    }

    #[test]
    fn test_segment_labels_derived() {
        let segment = seg("v_0", "v.mp4", 65.0, 130.2);
        assert_eq!(segment.start_label(), "0:01:05");
        assert_eq!(segment.end_label(), "0:02:10");
    }

    #[test]
    fn test_build_and_lookup() {
        let index = CorpusIndex::build(vec![
            seg("b_0", "b.mp4", 0.0, 5.0),
            seg("a_0", "a.mp4", 0.0, 5.0),
        ])
        .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.ids(), &["b_0".to_string(), "a_0".to_string()]);
        assert_eq!(index.lookup("a_0").unwrap().source(), "a.mp4");
        assert!(matches!(
            index.lookup("missing"),
            Err(KildeError::SegmentNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_id_fails_fast() {
        let result = CorpusIndex::build(vec![
            seg("v_0", "v.mp4", 0.0, 5.0),
            seg("v_0", "v.mp4", 5.0, 9.0),
        ]);

        match result {
            Err(KildeError::DuplicateSegmentId(id)) => assert_eq!(id, "v_0"),
            other => panic!("expected duplicate id error, got {:?}", other),
        }
    }

    #[test]
    fn test_sources_first_seen_order() {
        let index = CorpusIndex::build(vec![
            seg("b_0", "b.mp4", 0.0, 5.0),
            seg("a_0", "a.mp4", 0.0, 7.0),
            seg("b_1", "b.mp4", 5.0, 42.0),
        ])
        .unwrap();

        let sources = index.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].source, "b.mp4");
        assert_eq!(sources[0].segment_count, 2);
        assert_eq!(sources[0].duration_seconds, 42.0);
        assert_eq!(sources[1].source, "a.mp4");
    }
}
