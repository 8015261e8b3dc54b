//! # CF Model Crate
//!
//! Latent-factor collaborative filtering: the training pipeline and the
//! immutable inference artifact.
//!
//! ## Components
//!
//! ### Trainer
//! Batch pipeline from rating triples to a serialized [`FactorModel`]:
//! sparse-user filtering, mean computation, configurable centering, and
//! seeded alternating-least-squares factorization.
//!
//! ### FactorModel
//! The loaded artifact. Scores the whole catalog for a user in one pass,
//! excludes already-rated items via the `-inf` selector contract, and
//! falls back to a mean-rating cold-start ranking for unknown users.
//!
//! ## Example Usage
//!
//! ```ignore
//! use cf_model::{TrainerConfig, train};
//!
//! let model = train(ratings, &TrainerConfig::default().with_rank(32))?;
//! model.save(Path::new("artifacts/cf_model.json"))?;
//!
//! let top = model.recommend("u42", 10, true);
//! ```

pub mod model;
pub mod trainer;

// Re-export commonly used types
pub use model::{CenteringPolicy, FactorModel, ScoredItem};
pub use trainer::{TrainerConfig, train};

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingRecord;

    fn trained_model() -> FactorModel {
        // m2 has the highest mean (5.0), then m1 (4.0), then m3 (3.0)
        let ratings = vec![
            RatingRecord::new("u1", "m1", 4.0),
            RatingRecord::new("u1", "m2", 5.0),
            RatingRecord::new("u2", "m2", 5.0),
            RatingRecord::new("u2", "m3", 3.0),
        ];
        let config = TrainerConfig::default()
            .with_rank(2)
            .with_min_ratings_per_user(1);
        train(ratings, &config).unwrap()
    }

    #[test]
    fn test_unknown_user_cold_start_orders_by_item_mean() {
        let model = trained_model();

        let results = model.recommend("stranger", 3, true);
        let ids: Vec<&str> = results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m1", "m3"]);

        // Scores are the item means themselves
        assert!((results[0].score - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_cold_start_ties_break_by_item_position() {
        let ratings = vec![
            RatingRecord::new("u1", "m1", 3.0),
            RatingRecord::new("u1", "m2", 3.0),
            RatingRecord::new("u2", "m3", 3.0),
        ];
        let config = TrainerConfig::default()
            .with_rank(2)
            .with_min_ratings_per_user(1);
        let model = train(ratings, &config).unwrap();

        // All means equal: first-seen order (m1, m2, m3) decides
        let results = model.recommend("stranger", 3, false);
        let ids: Vec<&str> = results.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn test_zero_n_is_empty() {
        let model = trained_model();
        assert!(model.recommend("u1", 0, true).is_empty());
        assert!(model.recommend("stranger", 0, true).is_empty());
    }

    #[test]
    fn test_score_items_unknown_user_is_none() {
        let model = trained_model();
        assert!(model.score_items("stranger", true).is_none());
        assert!(model.score_items("u1", true).is_some());
    }

    #[test]
    fn test_item_mean_or_global() {
        let model = trained_model();
        assert!((model.item_mean_or_global("m2") - 5.0).abs() < 1e-6);
        assert!((model.item_mean_or_global("ghost") - model.global_mean).abs() < 1e-6);
    }

    #[test]
    fn test_save_load_round_trip() {
        let model = trained_model();
        let path = std::env::temp_dir().join("cf_model_round_trip.json");

        model.save(&path).unwrap();
        let loaded = FactorModel::load(&path).unwrap();

        assert_eq!(loaded.num_users(), model.num_users());
        assert_eq!(loaded.num_items(), model.num_items());
        assert_eq!(loaded.user_factors, model.user_factors);
        assert_eq!(loaded.centering, model.centering);

        // Inference agrees before and after the round trip
        assert_eq!(loaded.recommend("u1", 2, true), model.recommend("u1", 2, true));
    }
}
