//! The content similarity index: TF-IDF matrix, taste profiles, and
//! cosine-similarity search.
//!
//! Built once offline from per-item content text; immutable at serving
//! time. Cosine similarity between L2-normalized vectors reduces to a dot
//! product, so the index keeps both the raw matrix (profile construction
//! averages raw rows) and a row-normalized copy (similarity search).

use crate::sparse::SparseVector;
use crate::vectorizer::{TfidfVectorizer, VectorizerParams};
use anyhow::{Context, Result};
use data_loader::{ContentRow, IdIndex, ItemId, Position, top_indices};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// A taste signal: dense unit-norm vector in the content space.
///
/// Ephemeral — built per request from item ids or free text, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile(Vec<f32>);

impl Profile {
    /// Normalize a dense accumulation into a profile.
    ///
    /// Returns `None` for a (near-)zero vector: a signal with no terms
    /// cannot be normalized and carries nothing to rank by.
    pub fn from_unnormalized(dense: Vec<f32>) -> Option<Self> {
        let norm = dense.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            return None;
        }
        Some(Self(dense.into_iter().map(|v| v / norm).collect()))
    }

    /// Merge two profiles by summing and renormalizing.
    pub fn merge(a: &Profile, b: &Profile) -> Option<Profile> {
        let dense = a.0.iter().zip(&b.0).map(|(x, y)| x + y).collect();
        Self::from_unnormalized(dense)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// One similarity result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMatch {
    pub item_id: ItemId,
    /// Cosine similarity to the query profile, in [-1, 1]
    pub score: f32,
}

/// Serialized form of the index; the normalized matrix is derived, not
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentArtifact {
    item_index: IdIndex,
    vectorizer: TfidfVectorizer,
    rows: Vec<SparseVector>,
}

/// The content model: sparse term matrix + vocabulary + parallel id index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ContentArtifact", into = "ContentArtifact")]
pub struct ContentIndex {
    item_index: IdIndex,
    vectorizer: TfidfVectorizer,
    /// Raw TF-IDF rows, aligned with `item_index` positions
    rows: Vec<SparseVector>,
    /// L2-row-normalized copy; zero rows stay zero
    rows_norm: Vec<SparseVector>,
}

impl From<ContentArtifact> for ContentIndex {
    fn from(artifact: ContentArtifact) -> Self {
        let rows_norm = artifact.rows.iter().map(|row| row.normalized()).collect();
        Self {
            item_index: artifact.item_index,
            vectorizer: artifact.vectorizer,
            rows: artifact.rows,
            rows_norm,
        }
    }
}

impl From<ContentIndex> for ContentArtifact {
    fn from(index: ContentIndex) -> Self {
        Self {
            item_index: index.item_index,
            vectorizer: index.vectorizer,
            rows: index.rows,
        }
    }
}

impl ContentIndex {
    /// Fit the vocabulary and build the index from per-item content rows.
    ///
    /// Duplicate item ids keep their first row; items with empty text are
    /// kept as zero rows so their ids still resolve.
    pub fn fit(content: &[ContentRow], params: VectorizerParams) -> Self {
        let mut item_index = IdIndex::new();
        let mut texts: Vec<String> = Vec::new();
        for row in content {
            let position = item_index.insert_or_get(&row.item_id);
            if (position as usize) == texts.len() {
                texts.push(row.text.clone());
            }
        }

        let (vectorizer, rows) = TfidfVectorizer::fit_transform(&texts, params);
        info!(
            "Built content index: {} items, {} vocabulary terms",
            item_index.len(),
            vectorizer.vocab_size()
        );
        ContentArtifact {
            item_index,
            vectorizer,
            rows,
        }
        .into()
    }

    pub fn num_items(&self) -> usize {
        self.item_index.len()
    }

    pub fn vocab_size(&self) -> usize {
        self.vectorizer.vocab_size()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.item_index.contains(item_id)
    }

    /// Average the **raw** rows of the known ids, then L2-normalize the
    /// mean. `None` when no id is known to this index (or the known rows
    /// carry no terms at all).
    pub fn profile_from_item_ids(&self, item_ids: &[ItemId]) -> Option<Profile> {
        let positions = self.item_index.positions_of(item_ids);
        if positions.is_empty() {
            return None;
        }

        let mut acc = vec![0.0f32; self.vocab_size()];
        let scale = 1.0 / positions.len() as f32;
        for position in positions {
            self.rows[position as usize].add_into_dense(&mut acc, scale);
        }
        Profile::from_unnormalized(acc)
    }

    /// Build a profile from free text through the fitted vocabulary, so
    /// items outside the index can still contribute a signal.
    pub fn profile_from_texts(&self, texts: &[String]) -> Option<Profile> {
        if texts.is_empty() {
            return None;
        }

        let mut acc = vec![0.0f32; self.vocab_size()];
        let scale = 1.0 / texts.len() as f32;
        for text in texts {
            self.vectorizer.transform(text).add_into_dense(&mut acc, scale);
        }
        Profile::from_unnormalized(acc)
    }

    /// Cosine similarity of the profile against a restricted candidate set.
    ///
    /// Unknown ids are dropped silently; the result is keyed by id, so it
    /// is independent of the candidate ordering supplied.
    pub fn similarity_to_profile(
        &self,
        profile: &Profile,
        candidate_ids: &[ItemId],
    ) -> HashMap<ItemId, f32> {
        candidate_ids
            .iter()
            .filter_map(|item_id| {
                self.item_index.position(item_id).map(|position| {
                    let score = self.rows_norm[position as usize].dot_dense(profile.as_slice());
                    (item_id.clone(), score)
                })
            })
            .collect()
    }

    /// Top-n most similar items across the **full** index.
    ///
    /// Excluded ids are forced to `-inf` per the selector contract; the
    /// same partial-top-n discipline as CF ranking applies.
    pub fn recommend_from_profile(
        &self,
        profile: &Profile,
        n: usize,
        exclude_ids: &[ItemId],
    ) -> Vec<ContentMatch> {
        if n == 0 {
            return Vec::new();
        }

        let mut scores: Vec<f32> = self
            .rows_norm
            .par_iter()
            .map(|row| row.dot_dense(profile.as_slice()))
            .collect();

        for position in self.item_index.positions_of(exclude_ids) {
            scores[position as usize] = f32::NEG_INFINITY;
        }

        top_indices(&scores, n)
            .into_iter()
            .filter_map(|i| {
                self.item_index.id(i as Position).map(|item_id| ContentMatch {
                    item_id: item_id.to_string(),
                    score: scores[i],
                })
            })
            .collect()
    }

    /// Serialize the artifact to a JSON file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string(self).context("Failed to serialize content index")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load an artifact written by [`ContentIndex::save`]; the normalized
    /// matrix is rebuilt on the way in.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read content index from {}", path.display()))?;
        serde_json::from_str(&json).context("Failed to deserialize content index")
    }
}
