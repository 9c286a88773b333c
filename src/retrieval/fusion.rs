//! Reciprocal Rank Fusion for combining semantic and keyword rankings.
//!
//! Only rank positions are used, so the two scorers' raw scores never need to be
//! normalized against each other.

use super::RankedList;
use std::collections::{HashMap, HashSet};

/// Default RRF smoothing constant.
pub const DEFAULT_RRF_K: f32 = 60.0;
/// Default number of fused results kept.
pub const DEFAULT_TOP_N: usize = 7;

/// Configuration for fusion.
#[derive(Debug, Clone, PartialEq)]
pub struct FusionConfig {
    /// RRF K constant.
    pub rrf_k: f32,
    /// Number of fused ids to keep.
    pub top_n: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Fuse two ranked lists.
///
/// `score(id) = Σ 1 / (k + rank)` over the lists containing `id`, with 1-based
/// ranks. Equal scores keep the order in which ids were first seen, scanning
/// the semantic list before the keyword list.
pub fn reciprocal_rank_fusion(
    semantic_results: &[(String, f32)],
    keyword_results: &[(String, f32)],
    config: &FusionConfig,
) -> RankedList {
    let mut fused: Vec<(String, f32)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for list in [semantic_results, keyword_results] {
        let mut seen_in_list: HashSet<&str> = HashSet::new();

        for (rank, (id, _original_score)) in list.iter().enumerate() {
            // An id repeated within one list counts once, at its best rank.
            if !seen_in_list.insert(id.as_str()) {
                continue;
            }

            let rrf_score = 1.0 / (config.rrf_k + rank as f32 + 1.0);
            let pos = *positions.entry(id.as_str()).or_insert_with(|| {
                fused.push((id.clone(), 0.0));
                fused.len() - 1
            });
            fused[pos].1 += rrf_score;
        }
    }

    // Stable sort: ties stay in first-seen order.
    fused.sort_by(|a, b| b.1.total_cmp(&a.1));
    fused.truncate(config.top_n);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> RankedList {
        ids.iter()
            .enumerate()
            .map(|(i, id)| (id.to_string(), 1.0 - i as f32 * 0.1))
            .collect()
    }

    fn ids(fused: &RankedList) -> Vec<&str> {
        fused.iter().map(|(id, _)| id.as_str()).collect()
    }

    #[test]
    fn test_shared_ids_rank_above_single_list_ids() {
        let semantic = list(&["a", "b", "c"]);
        let keyword = list(&["b", "c", "d"]);

        let fused = reciprocal_rank_fusion(&semantic, &keyword, &FusionConfig::default());

        assert_eq!(ids(&fused), vec!["b", "c", "a", "d"]);
        let expected_b = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].1 - expected_b).abs() < 1e-6);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        // "x" and "y" both sit at rank 1 of one list.
        let fused =
            reciprocal_rank_fusion(&list(&["x"]), &list(&["y"]), &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["x", "y"]);

        let fused =
            reciprocal_rank_fusion(&list(&["y"]), &list(&["x"]), &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["y", "x"]);
    }

    #[test]
    fn test_truncates_to_top_n() {
        let config = FusionConfig {
            rrf_k: 60.0,
            top_n: 2,
        };
        let fused = reciprocal_rank_fusion(&list(&["a", "b", "c"]), &list(&["d"]), &config);
        assert_eq!(ids(&fused), vec!["a", "d"]);
    }

    #[test]
    fn test_ignores_raw_scores() {
        let semantic = vec![("a".to_string(), 0.01), ("b".to_string(), 0.99)];
        let fused = reciprocal_rank_fusion(&semantic, &[], &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_within_list_counts_once() {
        let semantic = list(&["a", "a", "b"]);
        let fused = reciprocal_rank_fusion(&semantic, &[], &FusionConfig::default());

        assert_eq!(ids(&fused), vec!["a", "b"]);
        assert!((fused[0].1 - 1.0 / 61.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reciprocal_rank_fusion(&[], &[], &FusionConfig::default()).is_empty());
    }
}
