//! Engine configuration loaded from the environment.
//!
//! All knobs live under the `MLR_` prefix (e.g. `MLR_ARTIFACTS_DIR`,
//! `MLR_SVD_RANK`); anything unset falls back to a default, so a bare
//! environment is fully usable.

use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Directory holding the two model artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Ratings CSV consumed by training
    #[serde(default = "default_ratings_file")]
    pub ratings_file: PathBuf,

    /// Titles CSV for display enrichment
    #[serde(default = "default_titles_file")]
    pub titles_file: PathBuf,

    /// Per-item content-text CSV consumed by the content build
    #[serde(default = "default_content_file")]
    pub content_file: PathBuf,

    /// Requested CF factor rank
    #[serde(default = "default_svd_rank")]
    pub svd_rank: usize,

    /// Users below this rating count are dropped before training
    #[serde(default = "default_min_ratings_per_user")]
    pub min_ratings_per_user: usize,

    /// TF-IDF vocabulary cap
    #[serde(default = "default_tfidf_max_features")]
    pub tfidf_max_features: usize,

    /// TF-IDF minimum document frequency
    #[serde(default = "default_tfidf_min_df")]
    pub tfidf_min_df: usize,

    /// Hybrid blend weights and candidate window
    #[serde(default = "default_hybrid_cf_weight")]
    pub hybrid_cf_weight: f32,
    #[serde(default = "default_hybrid_content_weight")]
    pub hybrid_content_weight: f32,
    #[serde(default = "default_hybrid_candidate_k")]
    pub hybrid_candidate_k: usize,

    /// Attach display titles to results when the side table is available
    #[serde(default = "default_include_titles")]
    pub include_titles: bool,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_ratings_file() -> PathBuf {
    PathBuf::from("data/ratings.csv")
}

fn default_titles_file() -> PathBuf {
    PathBuf::from("data/movies.csv")
}

fn default_content_file() -> PathBuf {
    PathBuf::from("data/content.csv")
}

fn default_svd_rank() -> usize {
    50
}

fn default_min_ratings_per_user() -> usize {
    3
}

fn default_tfidf_max_features() -> usize {
    50_000
}

fn default_tfidf_min_df() -> usize {
    2
}

fn default_hybrid_cf_weight() -> f32 {
    0.7
}

fn default_hybrid_content_weight() -> f32 {
    0.3
}

fn default_hybrid_candidate_k() -> usize {
    200
}

fn default_include_titles() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        // envy over an empty map exercises every serde default
        Self {
            artifacts_dir: default_artifacts_dir(),
            ratings_file: default_ratings_file(),
            titles_file: default_titles_file(),
            content_file: default_content_file(),
            svd_rank: default_svd_rank(),
            min_ratings_per_user: default_min_ratings_per_user(),
            tfidf_max_features: default_tfidf_max_features(),
            tfidf_min_df: default_tfidf_min_df(),
            hybrid_cf_weight: default_hybrid_cf_weight(),
            hybrid_content_weight: default_hybrid_content_weight(),
            hybrid_candidate_k: default_hybrid_candidate_k(),
            include_titles: default_include_titles(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `MLR_`-prefixed environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        envy::prefixed("MLR_")
            .from_env::<EngineConfig>()
            .map_err(|e| EngineError::Config(format!("Failed to load config: {}", e)))
    }

    pub fn cf_model_path(&self) -> PathBuf {
        self.artifacts_dir.join("cf_model.json")
    }

    pub fn content_model_path(&self) -> PathBuf {
        self.artifacts_dir.join("content_model.json")
    }

    pub fn with_artifacts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.artifacts_dir = dir.as_ref().to_path_buf();
        self
    }
}
