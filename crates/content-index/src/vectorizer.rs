//! TF-IDF vectorization over a fixed, fitted vocabulary.
//!
//! Fit once over the item corpus, then transform any text — indexed or
//! free-form — into the same vector space. Terms outside the fitted
//! vocabulary are ignored at transform time, which is what lets ad-hoc
//! seed text participate in similarity search.

use crate::sparse::SparseVector;
use data_loader::IdIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vocabulary bounds applied at fit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerParams {
    /// Hard cap on vocabulary size; overflow drops the rarest terms
    pub max_features: usize,
    /// Terms must appear in at least this many documents
    pub min_df: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: 50_000,
            min_df: 2,
        }
    }
}

/// Lowercase alphanumeric tokens of length >= 2.
///
/// Single characters are overwhelmingly noise in movie text (initials,
/// stray punctuation survivors) and are dropped the same way at fit and
/// transform time.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= 2)
        .map(|token| token.to_lowercase())
        .collect()
}

/// A fitted TF-IDF weighting: vocabulary positions plus per-term idf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: IdIndex,
    idf: Vec<f32>,
    params: VectorizerParams,
}

impl TfidfVectorizer {
    /// Fit the vocabulary over a corpus and transform every document.
    ///
    /// Term selection: document frequency must reach `min_df`; if more
    /// terms survive than `max_features`, the most frequent (by corpus
    /// term count, ties alphabetical) are kept. The final vocabulary is
    /// ordered alphabetically, so the fit is deterministic for a given
    /// corpus regardless of document order.
    ///
    /// Idf uses the smoothed form `ln((1 + docs) / (1 + df)) + 1`, which
    /// never divides by zero and keeps unseen-term weights finite.
    pub fn fit_transform(corpus: &[String], params: VectorizerParams) -> (Self, Vec<SparseVector>) {
        let tokenized: Vec<Vec<String>> = corpus.iter().map(|text| tokenize(text)).collect();

        // Document frequency and corpus-wide term count in one pass
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        let mut term_count: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&str> = Vec::new();
            for token in tokens {
                *term_count.entry(token.as_str()).or_insert(0) += 1;
                if !seen.contains(&token.as_str()) {
                    seen.push(token.as_str());
                }
            }
            for term in seen {
                *doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // min_df threshold, then the max_features cap
        let mut candidates: Vec<&str> = doc_freq
            .iter()
            .filter(|&(_, &df)| df >= params.min_df)
            .map(|(&term, _)| term)
            .collect();
        if candidates.len() > params.max_features {
            candidates.sort_unstable_by(|a, b| {
                term_count[b].cmp(&term_count[a]).then_with(|| a.cmp(b))
            });
            candidates.truncate(params.max_features);
        }
        candidates.sort_unstable();

        let mut vocabulary = IdIndex::new();
        for term in &candidates {
            vocabulary.insert_or_get(term);
        }

        let num_docs = corpus.len();
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|term| {
                let df = doc_freq[term];
                ((1.0 + num_docs as f64) / (1.0 + df as f64)).ln() as f32 + 1.0
            })
            .collect();

        let vectorizer = Self {
            vocabulary,
            idf,
            params,
        };
        let rows = tokenized
            .iter()
            .map(|tokens| vectorizer.weigh(tokens))
            .collect();
        (vectorizer, rows)
    }

    /// Transform free text through the fitted vocabulary.
    ///
    /// Out-of-vocabulary terms contribute nothing; text with no known
    /// terms yields the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<u32, f32> = HashMap::new();
        for token in tokens {
            if let Some(position) = self.vocabulary.position(token) {
                *counts.entry(position).or_insert(0.0) += 1.0;
            }
        }
        SparseVector::from_pairs(
            counts
                .into_iter()
                .map(|(position, tf)| (position, tf * self.idf[position as usize]))
                .collect(),
        )
    }

    pub fn vocab_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn params(&self) -> &VectorizerParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "space adventure action space".to_string(),
            "space drama romance".to_string(),
            "action thriller heist".to_string(),
        ]
    }

    fn loose_params() -> VectorizerParams {
        VectorizerParams {
            max_features: 100,
            min_df: 1,
        }
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_short() {
        let tokens = tokenize("The Matrix (1999): sci-fi, A+ classic!");
        assert_eq!(
            tokens,
            vec!["the", "matrix", "1999", "sci", "fi", "classic"]
        );
    }

    #[test]
    fn test_min_df_filters_rare_terms() {
        let params = VectorizerParams {
            max_features: 100,
            min_df: 2,
        };
        let (vectorizer, _) = TfidfVectorizer::fit_transform(&corpus(), params);
        // Only "space" (2 docs) and "action" (2 docs) survive
        assert_eq!(vectorizer.vocab_size(), 2);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let params = VectorizerParams {
            max_features: 1,
            min_df: 1,
        };
        let (vectorizer, _) = TfidfVectorizer::fit_transform(&corpus(), params);
        assert_eq!(vectorizer.vocab_size(), 1);
        // "space" has the highest corpus count (3 occurrences)
        assert!(!vectorizer.transform("space").is_zero());
        assert!(vectorizer.transform("action").is_zero());
    }

    #[test]
    fn test_fit_is_document_order_independent() {
        let forward = corpus();
        let mut reversed = corpus();
        reversed.reverse();

        let (a, _) = TfidfVectorizer::fit_transform(&forward, loose_params());
        let (b, _) = TfidfVectorizer::fit_transform(&reversed, loose_params());

        assert_eq!(a.vocab_size(), b.vocab_size());
        let va = a.transform("space action drama");
        let vb = b.transform("space action drama");
        assert_eq!(va, vb);
    }

    #[test]
    fn test_transform_ignores_unknown_terms() {
        let (vectorizer, _) = TfidfVectorizer::fit_transform(&corpus(), loose_params());
        let known = vectorizer.transform("space drama");
        let padded = vectorizer.transform("space drama xylophone zeppelin");
        assert_eq!(known, padded);
    }

    #[test]
    fn test_empty_document_is_zero_row() {
        let (_, rows) =
            TfidfVectorizer::fit_transform(&["".to_string(), "space space".to_string()], loose_params());
        assert!(rows[0].is_zero());
        assert!(!rows[1].is_zero());
    }

    #[test]
    fn test_repeated_terms_raise_tf() {
        let (vectorizer, _) = TfidfVectorizer::fit_transform(&corpus(), loose_params());
        let once = vectorizer.transform("space");
        let twice = vectorizer.transform("space space");
        assert!(twice.norm() > once.norm());
    }
}
