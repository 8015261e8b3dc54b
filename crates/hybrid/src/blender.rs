//! Blending of the CF and content signals into one ranking.
//!
//! Two modes:
//! 1. User-anchored: personalized CF scores over a candidate window,
//!    reranked by similarity to the user's own taste profile
//! 2. Seed-anchored: content similarity to an ad-hoc profile, steadied by
//!    an item-popularity proxy where no personalized CF vector exists
//!
//! The two signals live on different scales, so each is normalized into
//! [0, 1] before the weighted sum: CF sub-scores by min-max over the
//! candidate set, content cosines by the affine map (x + 1) / 2 in the
//! user-anchored mode.

use cf_model::FactorModel;
use content_index::{ContentIndex, Profile};
use data_loader::{ItemId, Position, min_max_normalize, top_indices};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Blend weights and candidate-window size.
#[derive(Debug, Clone)]
pub struct HybridConfig {
    pub cf_weight: f32,
    pub content_weight: f32,
    /// How many top CF items are reranked (user-anchored), and the
    /// minimum content retrieval pool (seed-anchored)
    pub candidate_k: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            cf_weight: 0.7,
            content_weight: 0.3,
            candidate_k: 200,
        }
    }
}

impl HybridConfig {
    /// Configure the blend weights (default: 0.7 CF / 0.3 content)
    pub fn with_weights(mut self, cf_weight: f32, content_weight: f32) -> Self {
        self.cf_weight = cf_weight;
        self.content_weight = content_weight;
        self
    }

    /// Configure the candidate window (default: 200)
    pub fn with_candidate_k(mut self, candidate_k: usize) -> Self {
        self.candidate_k = candidate_k;
        self
    }
}

/// One row of a user-anchored hybrid ranking.
///
/// `hybrid_score` is absent when the ranking fell back to plain CF
/// (no taste profile or no content overlap) — that fallback is a defined
/// behavior, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridRecommendation {
    pub item_id: ItemId,
    pub cf_score: f32,
    pub hybrid_score: Option<f32>,
}

/// One row of a seed-anchored hybrid ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedHybridRecommendation {
    pub item_id: ItemId,
    pub content_score: f32,
    pub cf_score: f32,
    pub hybrid_score: f32,
}

/// Combines the two loaded models; read-only over both, so one blender
/// serves concurrent requests without locking.
#[derive(Debug)]
pub struct HybridBlender {
    cf: Arc<FactorModel>,
    content: Arc<ContentIndex>,
    config: HybridConfig,
}

impl HybridBlender {
    pub fn new(cf: Arc<FactorModel>, content: Arc<ContentIndex>) -> Self {
        Self {
            cf,
            content,
            config: HybridConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HybridConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// User-anchored hybrid ranking.
    ///
    /// Takes the top `candidate_k` items by raw CF score, builds the
    /// user's content profile from their rated items, and reranks the
    /// window by `cf_weight * cf_norm + content_weight * content_norm`.
    /// Unknown users get the cold-start ranking; users without a usable
    /// profile get the plain CF ranking with `hybrid_score` omitted.
    pub fn recommend_for_user(
        &self,
        user_id: &str,
        n: usize,
        exclude_rated: bool,
    ) -> Vec<HybridRecommendation> {
        if n == 0 {
            return Vec::new();
        }

        let scores = match self.cf.score_items(user_id, exclude_rated) {
            Some(scores) => scores,
            None => {
                // Cold start has no rated items to profile from either
                return self
                    .cf
                    .cold_start(n)
                    .into_iter()
                    .map(|item| HybridRecommendation {
                        item_id: item.item_id,
                        cf_score: item.score,
                        hybrid_score: None,
                    })
                    .collect();
            }
        };

        // Candidate window by raw CF score; the selector already keeps
        // excluded (-inf) items out
        let candidate_idx = top_indices(&scores, self.config.candidate_k);
        if candidate_idx.is_empty() {
            return Vec::new();
        }

        let profile = match self.build_user_profile(user_id) {
            Some(profile) => profile,
            None => {
                debug!("No taste profile for user {}, falling back to CF", user_id);
                return self.plain_cf(&candidate_idx, &scores, n);
            }
        };

        let candidate_ids: Vec<ItemId> = candidate_idx
            .iter()
            .filter_map(|&i| self.cf.item_index.id(i as Position))
            .map(|id| id.to_string())
            .collect();
        let content_map = self.content.similarity_to_profile(&profile, &candidate_ids);
        if content_map.is_empty() {
            debug!("No content overlap for user {}, falling back to CF", user_id);
            return self.plain_cf(&candidate_idx, &scores, n);
        }

        // Candidates outside the content space contribute a neutral 0.0
        // cosine, rescaled to 0.5 like everything else
        let content_norm: Vec<f32> = candidate_ids
            .iter()
            .map(|id| (content_map.get(id).copied().unwrap_or(0.0) + 1.0) / 2.0)
            .collect();
        let cf_sub: Vec<f32> = candidate_idx.iter().map(|&i| scores[i]).collect();
        let cf_norm = min_max_normalize(&cf_sub);

        let mut blended: Vec<(usize, f32)> = candidate_idx
            .iter()
            .enumerate()
            .map(|(pos, &item_idx)| {
                let final_score = self.config.cf_weight * cf_norm[pos]
                    + self.config.content_weight * content_norm[pos];
                (item_idx, final_score)
            })
            .collect();
        // Descending blend score, ascending item position on exact ties
        blended.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        blended.truncate(n);

        blended
            .into_iter()
            .filter_map(|(item_idx, final_score)| {
                self.cf
                    .item_index
                    .id(item_idx as Position)
                    .map(|item_id| HybridRecommendation {
                        item_id: item_id.to_string(),
                        cf_score: scores[item_idx],
                        hybrid_score: Some(final_score),
                    })
            })
            .collect()
    }

    /// Seed-anchored hybrid ranking over an already-built profile.
    ///
    /// There is no personalized CF vector here, so each content candidate
    /// gets a popularity proxy instead: its CF item mean (global mean for
    /// items the CF space never saw), min-max normalized across the
    /// candidate pool and blended with the raw content cosine.
    pub fn recommend_from_profile(
        &self,
        profile: &Profile,
        exclude_ids: &[ItemId],
        n: usize,
    ) -> Vec<SeedHybridRecommendation> {
        if n == 0 {
            return Vec::new();
        }

        let pool = n.max(self.config.candidate_k);
        let matches = self.content.recommend_from_profile(profile, pool, exclude_ids);
        if matches.is_empty() {
            return Vec::new();
        }

        let cf_scores: Vec<f32> = matches
            .iter()
            .map(|m| self.cf.item_mean_or_global(&m.item_id))
            .collect();
        let cf_norm = min_max_normalize(&cf_scores);

        let mut results: Vec<SeedHybridRecommendation> = matches
            .into_iter()
            .zip(cf_scores)
            .zip(cf_norm)
            .map(|((m, cf_score), cf_scaled)| SeedHybridRecommendation {
                hybrid_score: self.config.cf_weight * cf_scaled
                    + self.config.content_weight * m.score,
                item_id: m.item_id,
                content_score: m.score,
                cf_score,
            })
            .collect();

        // Stable sort: exact ties keep the deterministic content-ranking
        // order they arrived in
        results.sort_by(|a, b| {
            b.hybrid_score
                .partial_cmp(&a.hybrid_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(n);
        results
    }

    fn build_user_profile(&self, user_id: &str) -> Option<Profile> {
        let user_pos = self.cf.user_index.position(user_id)?;
        let rated = &self.cf.rated_items[user_pos as usize];
        if rated.is_empty() {
            return None;
        }
        let rated_ids: Vec<ItemId> = rated
            .iter()
            .filter_map(|&i| self.cf.item_index.id(i))
            .map(|id| id.to_string())
            .collect();
        self.content.profile_from_item_ids(&rated_ids)
    }

    fn plain_cf(
        &self,
        candidate_idx: &[usize],
        scores: &[f32],
        n: usize,
    ) -> Vec<HybridRecommendation> {
        candidate_idx
            .iter()
            .take(n)
            .filter_map(|&i| {
                self.cf
                    .item_index
                    .id(i as Position)
                    .map(|item_id| HybridRecommendation {
                        item_id: item_id.to_string(),
                        cf_score: scores[i],
                        hybrid_score: None,
                    })
            })
            .collect()
    }
}
