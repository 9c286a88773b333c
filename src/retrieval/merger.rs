//! Merging retrieved segments into timestamped citations.

use crate::corpus::Segment;
use serde::Serialize;
use std::collections::HashMap;

/// Default gap, in seconds, under which neighbouring segments merge.
pub const DEFAULT_MERGE_THRESHOLD_SECONDS: f64 = 10.0;

/// A contiguous span of one source video, built from adjacent segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub source: String,
    pub start_label: String,
    pub end_label: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Text of every merged segment, joined by single spaces.
    pub summary: String,
}

impl Citation {
    fn open(segment: &Segment) -> Self {
        Self {
            source: segment.source().to_string(),
            start_label: segment.start_label().to_string(),
            end_label: segment.end_label().to_string(),
            start_seconds: segment.start_seconds(),
            end_seconds: segment.end_seconds(),
            summary: segment.text().to_string(),
        }
    }

    fn extend(&mut self, segment: &Segment) {
        self.end_seconds = segment.end_seconds();
        self.end_label = segment.end_label().to_string();
        if !self.summary.is_empty() {
            self.summary.push(' ');
        }
        self.summary.push_str(segment.text());
    }
}

/// Group segments by source in first-seen order.
fn group_by_source<'a>(segments: &[&'a Segment]) -> Vec<Vec<&'a Segment>> {
    let mut groups: Vec<Vec<&Segment>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for &segment in segments {
        let pos = *positions.entry(segment.source()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[pos].push(segment);
    }

    groups
}

/// Coalesce segments into citations.
///
/// Per source, segments are sorted by start time and a segment joins the open
/// span when it starts no later than `span end + threshold_seconds`. Output is
/// source groups in first-seen order, spans ascending within each source.
pub fn merge_segments(segments: &[&Segment], threshold_seconds: f64) -> Vec<Citation> {
    let mut citations = Vec::new();

    for mut group in group_by_source(segments) {
        group.sort_by(|a, b| a.start_seconds().total_cmp(&b.start_seconds()));

        let mut iter = group.into_iter();
        let Some(first) = iter.next() else {
            continue;
        };
        let mut span = Citation::open(first);

        for segment in iter {
            if segment.start_seconds() <= span.end_seconds + threshold_seconds {
                span.extend(segment);
            } else {
                citations.push(std::mem::replace(&mut span, Citation::open(segment)));
            }
        }
        citations.push(span);
    }

    citations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, source: &str, text: &str, start: f64, end: f64) -> Segment {
        Segment::new(id, source, text, start, end).unwrap()
    }

    #[test]
    fn test_merges_within_threshold() {
        let a = seg("x_0", "X", "one", 0.0, 5.0);
        let b = seg("x_1", "X", "two", 8.0, 12.0);
        let c = seg("x_2", "X", "three", 30.0, 35.0);

        let citations = merge_segments(&[&c, &a, &b], 10.0);

        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].start_seconds, 0.0);
        assert_eq!(citations[0].end_seconds, 12.0);
        assert_eq!(citations[0].start_label, "0:00:00");
        assert_eq!(citations[0].end_label, "0:00:12");
        assert_eq!(citations[0].summary, "one two");
        assert_eq!(citations[1].start_seconds, 30.0);
        assert_eq!(citations[1].end_seconds, 35.0);
        assert_eq!(citations[1].summary, "three");
    }

    #[test]
    fn test_single_segment_keeps_own_bounds() {
        let a = seg("y_0", "Y", "only", 61.0, 75.5);
        let citations = merge_segments(&[&a], 10.0);

        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].start_seconds, 61.0);
        assert_eq!(citations[0].end_seconds, 75.5);
        assert_eq!(citations[0].start_label, a.start_label());
        assert_eq!(citations[0].end_label, a.end_label());
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_segments(&[], 10.0).is_empty());
    }

    #[test]
    fn test_sources_in_first_seen_order() {
        let b0 = seg("b_0", "b.mp4", "b zero", 100.0, 110.0);
        let a0 = seg("a_0", "a.mp4", "a zero", 0.0, 5.0);
        let b1 = seg("b_1", "b.mp4", "b one", 0.0, 5.0);

        let citations = merge_segments(&[&b0, &a0, &b1], 10.0);
        let sources: Vec<&str> = citations.iter().map(|c| c.source.as_str()).collect();

        assert_eq!(sources, vec!["b.mp4", "b.mp4", "a.mp4"]);
        assert_eq!(citations[0].summary, "b one");
        assert_eq!(citations[1].summary, "b zero");
    }

    #[test]
    fn test_boundary_gap_is_inclusive() {
        let a = seg("z_0", "Z", "a", 0.0, 5.0);
        let b = seg("z_1", "Z", "b", 15.0, 20.0);

        assert_eq!(merge_segments(&[&a, &b], 10.0).len(), 1);
        assert_eq!(merge_segments(&[&a, &b], 9.9).len(), 2);
    }

    #[test]
    fn test_contained_segment_moves_end_to_its_own() {
        // A segment nested inside the open span still takes over the span end.
        let a = seg("w_0", "W", "long", 0.0, 20.0);
        let b = seg("w_1", "W", "short", 2.0, 4.0);

        let citations = merge_segments(&[&a, &b], 10.0);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].end_seconds, 4.0);
    }
}
