//! # Content Index Crate
//!
//! TF-IDF content similarity: vocabulary fitting, taste profiles, and
//! cosine-similarity search over the item catalog.
//!
//! ## Components
//!
//! - **vectorizer**: fits a bounded vocabulary (min-df threshold,
//!   max-features cap, smoothed idf) and transforms any text through it
//! - **sparse**: the sparse row representation and its few operations
//! - **index**: the immutable [`ContentIndex`] — profile construction
//!   from item ids or free text, restricted similarity, and full-catalog
//!   top-n search
//!
//! ## Example Usage
//!
//! ```ignore
//! use content_index::{ContentIndex, VectorizerParams};
//!
//! let index = ContentIndex::fit(&content_rows, VectorizerParams::default());
//! index.save(Path::new("artifacts/content_model.json"))?;
//!
//! let profile = index.profile_from_item_ids(&liked).unwrap();
//! let similar = index.recommend_from_profile(&profile, 10, &liked);
//! ```

pub mod index;
pub mod sparse;
pub mod vectorizer;

// Re-export commonly used types
pub use index::{ContentIndex, ContentMatch, Profile};
pub use sparse::SparseVector;
pub use vectorizer::{TfidfVectorizer, VectorizerParams, tokenize};

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::ContentRow;

    fn row(item_id: &str, text: &str) -> ContentRow {
        ContentRow {
            item_id: item_id.to_string(),
            text: text.to_string(),
        }
    }

    fn test_index() -> ContentIndex {
        let rows = vec![
            row("m1", "space adventure action heroes space battle"),
            row("m2", "space drama slow meditative journey"),
            row("m3", "romance comedy wedding mishaps"),
            row("m4", "action heist thriller heroes"),
            row("m5", ""),
        ];
        let params = VectorizerParams {
            max_features: 1000,
            min_df: 1,
        };
        ContentIndex::fit(&rows, params)
    }

    fn unit_norm(profile: &Profile) -> f32 {
        profile.as_slice().iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[test]
    fn test_profile_from_known_ids_is_unit_norm() {
        let index = test_index();
        let profile = index
            .profile_from_item_ids(&["m1".to_string(), "m2".to_string()])
            .unwrap();
        assert!((unit_norm(&profile) - 1.0).abs() < 1e-5);

        // A mix of known and unknown ids still produces a profile
        let mixed = index
            .profile_from_item_ids(&["ghost".to_string(), "m1".to_string()])
            .unwrap();
        assert!((unit_norm(&mixed) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_profile_from_only_unknown_ids_is_none() {
        let index = test_index();
        assert!(index.profile_from_item_ids(&["ghost".to_string()]).is_none());
        assert!(index.profile_from_item_ids(&[]).is_none());
    }

    #[test]
    fn test_profile_from_zero_row_only_is_none() {
        let index = test_index();
        // m5 is indexed but has no content text
        assert!(index.contains("m5"));
        assert!(index.profile_from_item_ids(&["m5".to_string()]).is_none());
    }

    #[test]
    fn test_profile_from_texts_uses_fitted_vocabulary() {
        let index = test_index();
        let profile = index
            .profile_from_texts(&["space battle adventure".to_string()])
            .unwrap();
        assert!((unit_norm(&profile) - 1.0).abs() < 1e-5);

        // Text with no fitted terms has no profile
        assert!(
            index
                .profile_from_texts(&["xylophone zeppelin".to_string()])
                .is_none()
        );
    }

    #[test]
    fn test_similarity_independent_of_candidate_order() {
        let index = test_index();
        let profile = index.profile_from_item_ids(&["m1".to_string()]).unwrap();

        let forward = vec!["m2".to_string(), "m3".to_string(), "m4".to_string()];
        let backward = vec!["m4".to_string(), "m3".to_string(), "m2".to_string()];

        let a = index.similarity_to_profile(&profile, &forward);
        let b = index.similarity_to_profile(&profile, &backward);
        assert_eq!(a, b);
    }

    #[test]
    fn test_similarity_drops_unknown_ids() {
        let index = test_index();
        let profile = index.profile_from_item_ids(&["m1".to_string()]).unwrap();

        let scores =
            index.similarity_to_profile(&profile, &["m2".to_string(), "ghost".to_string()]);
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key("m2"));
    }

    #[test]
    fn test_recommend_ranks_similar_items_first() {
        let index = test_index();
        let profile = index.profile_from_item_ids(&["m1".to_string()]).unwrap();

        let results = index.recommend_from_profile(&profile, 2, &["m1".to_string()]);
        assert_eq!(results.len(), 2);
        // m2 shares "space", m4 shares "action"/"heroes"; m3 shares nothing
        assert!(results.iter().all(|r| r.item_id != "m1"));
        assert!(results.iter().all(|r| r.item_id != "m3"));
    }

    #[test]
    fn test_recommend_oversized_n_returns_full_pool_sorted() {
        let index = test_index();
        let profile = index.profile_from_item_ids(&["m1".to_string()]).unwrap();

        let results = index.recommend_from_profile(&profile, 100, &[]);
        assert_eq!(results.len(), index.num_items());
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_recommend_excludes_requested_ids() {
        let index = test_index();
        let profile = index.profile_from_item_ids(&["m1".to_string()]).unwrap();

        let exclude = vec!["m1".to_string(), "m2".to_string()];
        let results = index.recommend_from_profile(&profile, 2, &exclude);
        assert!(results.iter().all(|r| !exclude.contains(&r.item_id)));
    }

    #[test]
    fn test_profile_merge_is_unit_norm() {
        let index = test_index();
        let a = index.profile_from_item_ids(&["m1".to_string()]).unwrap();
        let b = index
            .profile_from_texts(&["romance wedding".to_string()])
            .unwrap();

        let merged = Profile::merge(&a, &b).unwrap();
        assert!((unit_norm(&merged) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_save_load_round_trip() {
        let index = test_index();
        let path = std::env::temp_dir().join("content_index_round_trip.json");
        index.save(&path).unwrap();

        let loaded = ContentIndex::load(&path).unwrap();
        assert_eq!(loaded.num_items(), index.num_items());
        assert_eq!(loaded.vocab_size(), index.vocab_size());

        let profile = loaded.profile_from_item_ids(&["m1".to_string()]).unwrap();
        let before = index.recommend_from_profile(
            &index.profile_from_item_ids(&["m1".to_string()]).unwrap(),
            3,
            &[],
        );
        let after = loaded.recommend_from_profile(&profile, 3, &[]);
        assert_eq!(before, after);
    }
}
