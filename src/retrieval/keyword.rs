//! BM25 keyword scoring over the transcript corpus.
//!
//! For each query term t present in a document:
//!
//! ```text
//! score += IDF(t) * (tf * (k1 + 1)) / (tf + k1 * (1 - b + b * dl / avgdl))
//! IDF(t) = ln(1 + (N - n(t) + 0.5) / (n(t) + 0.5))
//! ```

use super::RankedList;
use crate::corpus::CorpusIndex;
use std::collections::HashMap;

/// Default term frequency saturation.
pub const DEFAULT_K1: f32 = 1.5;
/// Default length normalization.
pub const DEFAULT_B: f32 = 0.75;

/// Lowercase whitespace tokenizer. No stemming, no stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(|t| t.to_lowercase()).collect()
}

/// Sparse lexical ranker, built once over the full corpus.
#[derive(Debug)]
pub struct KeywordScorer {
    k1: f32,
    b: f32,
    /// Segment ids in corpus load order.
    doc_ids: Vec<String>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<f32>,
    avg_doc_len: f32,
    doc_freqs: HashMap<String, usize>,
}

impl KeywordScorer {
    /// Build with the default parameters.
    pub fn build(index: &CorpusIndex) -> Self {
        Self::with_params(index, DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params(index: &CorpusIndex, k1: f32, b: f32) -> Self {
        let doc_ids = index.ids().to_vec();
        let mut term_freqs = Vec::with_capacity(index.len());
        let mut doc_lens = Vec::with_capacity(index.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for segment in index.iter() {
            let tokens = tokenize(segment.text());
            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *tf.entry(token.clone()).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }

            doc_lens.push(tokens.len() as f32);
            term_freqs.push(tf);
        }

        let avg_doc_len = if doc_lens.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<f32>() / doc_lens.len() as f32
        };

        Self {
            k1,
            b,
            doc_ids,
            term_freqs,
            doc_lens,
            avg_doc_len,
            doc_freqs,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        let total = self.doc_ids.len() as f32;
        (1.0 + (total - n + 0.5) / (n + 0.5)).ln()
    }

    /// Scores for every document, in load order.
    fn score_all(&self, query: &str) -> Vec<f32> {
        let mut terms = tokenize(query);
        // Summing in a fixed term order keeps scores independent of query word order.
        terms.sort();

        let idfs: Vec<(String, f32)> = terms
            .into_iter()
            .map(|t| {
                let idf = self.idf(&t);
                (t, idf)
            })
            .collect();
        let avg_len = self.avg_doc_len.max(1.0);

        self.term_freqs
            .iter()
            .zip(&self.doc_lens)
            .map(|(tf_map, &doc_len)| {
                let mut score = 0.0;
                for (term, idf) in &idfs {
                    let tf = tf_map.get(term).copied().unwrap_or(0) as f32;
                    if tf == 0.0 {
                        continue;
                    }
                    let norm = self.k1 * (1.0 - self.b + self.b * doc_len / avg_len);
                    score += idf * (tf * (self.k1 + 1.0)) / (tf + norm);
                }
                score
            })
            .collect()
    }

    /// Score every document against the query. Blank queries score zero everywhere.
    pub fn score(&self, query: &str) -> HashMap<String, f32> {
        self.doc_ids
            .iter()
            .cloned()
            .zip(self.score_all(query))
            .collect()
    }

    /// Rank all documents by score, ties in load order, truncated to `k`.
    pub fn top_k(&self, query: &str, k: usize) -> RankedList {
        let mut ranked: Vec<(usize, f32)> = self.score_all(query).into_iter().enumerate().collect();
        // Stable sort keeps load order among equal scores.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|(i, score)| (self.doc_ids[i].clone(), score))
            .collect()
    }
}
