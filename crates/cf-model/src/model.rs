//! The trained collaborative-filtering artifact and its inference paths.
//!
//! A [`FactorModel`] is produced once by the trainer, serialized to JSON,
//! and thereafter loaded read-only. Inference methods take `&self` and
//! allocate per call, so a model behind an `Arc` can serve any number of
//! concurrent requests without locking.

use anyhow::{Context, Result, ensure};
use data_loader::{IdIndex, ItemId, Position, top_indices};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Which mean is subtracted from observed ratings before factorization.
///
/// Both variants appear across revisions of this engine, so the choice is
/// a named training option recorded in the artifact; scoring adds the same
/// offset back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CenteringPolicy {
    /// Center each rating by its user's mean (per-user taste baseline)
    #[default]
    UserMean,
    /// Center every rating by the global mean
    GlobalMean,
}

/// One `(item_id, score)` result row. Freshly constructed per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f32,
}

/// The full CF artifact: identity indexes, latent factors, means, and
/// per-user rated-item sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorModel {
    pub user_index: IdIndex,
    pub item_index: IdIndex,
    /// users × k
    pub user_factors: Array2<f32>,
    /// k × items
    pub item_factors: Array2<f32>,
    pub user_means: Vec<f32>,
    pub item_means: Vec<f32>,
    pub global_mean: f32,
    /// Rated item positions per user position, sorted ascending
    pub rated_items: Vec<Vec<Position>>,
    pub centering: CenteringPolicy,
}

impl FactorModel {
    pub fn num_users(&self) -> usize {
        self.user_index.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_index.len()
    }

    /// Factor rank the model was trained with.
    pub fn rank(&self) -> usize {
        self.user_factors.ncols()
    }

    /// Check the structural invariants the inference paths rely on.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.user_factors.nrows() == self.num_users(),
            "user_factors rows ({}) != user index size ({})",
            self.user_factors.nrows(),
            self.num_users()
        );
        ensure!(
            self.item_factors.ncols() == self.num_items(),
            "item_factors columns ({}) != item index size ({})",
            self.item_factors.ncols(),
            self.num_items()
        );
        ensure!(
            self.user_factors.ncols() == self.item_factors.nrows(),
            "factor rank mismatch between user and item matrices"
        );
        ensure!(
            self.user_means.len() == self.num_users()
                && self.item_means.len() == self.num_items()
                && self.rated_items.len() == self.num_users(),
            "means/rated_items length mismatch"
        );
        let num_items = self.num_items() as Position;
        for rated in &self.rated_items {
            ensure!(
                rated.iter().all(|&i| i < num_items),
                "rated_items references an item position outside the index"
            );
        }
        Ok(())
    }

    /// Raw predicted score for every item, or `None` for an unknown user.
    ///
    /// `score[i] = dot(user_factors[u], item_factors[:, i]) + offset`,
    /// where the offset is whichever mean the centering policy removed at
    /// training time. With `exclude_rated`, every item the user already
    /// rated is forced to `-inf` — the selector's exclusion contract
    /// guarantees such an item can never be selected.
    pub fn score_items(&self, user_id: &str, exclude_rated: bool) -> Option<Vec<f32>> {
        let user_pos = self.user_index.position(user_id)? as usize;
        let user_vec = self.user_factors.row(user_pos);
        let offset = match self.centering {
            CenteringPolicy::UserMean => self.user_means[user_pos],
            CenteringPolicy::GlobalMean => self.global_mean,
        };

        let mut scores: Vec<f32> = (0..self.num_items())
            .map(|i| user_vec.dot(&self.item_factors.column(i)) + offset)
            .collect();

        if exclude_rated {
            for &item_pos in &self.rated_items[user_pos] {
                scores[item_pos as usize] = f32::NEG_INFINITY;
            }
        }
        Some(scores)
    }

    /// Top-n recommendations for a user.
    ///
    /// Unknown users fall back to the cold-start ranking; they are never
    /// an error.
    pub fn recommend(&self, user_id: &str, n: usize, exclude_rated: bool) -> Vec<ScoredItem> {
        if n == 0 {
            return Vec::new();
        }

        let scores = match self.score_items(user_id, exclude_rated) {
            Some(scores) => scores,
            None => {
                debug!("User {} unknown to the CF index, using cold start", user_id);
                return self.cold_start(n);
            }
        };
        self.collect_top(&scores, n)
    }

    /// Cold-start ranking: all items by mean rating descending, ties by
    /// ascending item position.
    pub fn cold_start(&self, n: usize) -> Vec<ScoredItem> {
        self.collect_top(&self.item_means, n)
    }

    /// Popularity proxy for an item: its mean rating, or the global mean
    /// for items outside the CF space.
    pub fn item_mean_or_global(&self, item_id: &str) -> f32 {
        self.item_index
            .position(item_id)
            .map(|pos| self.item_means[pos as usize])
            .unwrap_or(self.global_mean)
    }

    fn collect_top(&self, scores: &[f32], n: usize) -> Vec<ScoredItem> {
        top_indices(scores, n)
            .into_iter()
            .filter_map(|i| {
                self.item_index.id(i as Position).map(|item_id| ScoredItem {
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
        let json = serde_json::to_string(self).context("Failed to serialize CF model")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Load and validate an artifact written by [`FactorModel::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read CF model from {}", path.display()))?;
        let model: FactorModel =
            serde_json::from_str(&json).context("Failed to deserialize CF model")?;
        model.validate()?;
        Ok(model)
    }
}
