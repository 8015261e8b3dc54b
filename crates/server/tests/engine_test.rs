//! Integration tests for the query surface.
//!
//! These exercise the whole path — training, content fitting, context
//! assembly, query dispatch — over an in-memory toy catalog, with both
//! enrichment subsystems absent (titles omitted, no metadata client).

use cf_model::{TrainerConfig, train};
use content_index::{ContentIndex, VectorizerParams};
use data_loader::{ContentRow, RatingRecord};
use server::{EngineConfig, EngineContext, EngineError, Query};

fn content_row(item_id: &str, text: &str) -> ContentRow {
    ContentRow {
        item_id: item_id.to_string(),
        text: text.to_string(),
    }
}

fn build_context() -> EngineContext {
    let ratings = vec![
        RatingRecord::new("u1", "m1", 5.0),
        RatingRecord::new("u1", "m2", 4.0),
        RatingRecord::new("u2", "m1", 4.0),
        RatingRecord::new("u2", "m3", 3.0),
        RatingRecord::new("u3", "m2", 2.0),
        RatingRecord::new("u3", "m4", 4.5),
    ];
    let cf = train(
        ratings,
        &TrainerConfig::default().with_rank(2).with_min_ratings_per_user(1),
    )
    .unwrap();

    let content = ContentIndex::fit(
        &[
            content_row("m1", "space opera adventure epic"),
            content_row("m2", "space station drama"),
            content_row("m3", "heist thriller crew"),
            content_row("m4", "space adventure crew"),
        ],
        VectorizerParams {
            max_features: 1000,
            min_df: 1,
        },
    );

    let config = EngineConfig::default()
        .with_artifacts_dir(std::env::temp_dir().join("engine_test_artifacts"));
    EngineContext::from_parts(cf, content, None, None, &config)
}

#[tokio::test]
async fn test_user_query_returns_ranked_entries() {
    let context = build_context();

    let results = context
        .recommend(&Query::User("u1".to_string()), 2)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= 2);

    // u1 rated m1 and m2; the user query excludes rated items
    for entry in &results {
        assert!(entry.item_id != "m1" && entry.item_id != "m2");
        assert!(entry.cf_score.is_some());
        // No enrichment subsystems: both fields stay absent
        assert!(entry.title.is_none());
        assert!(entry.poster_url.is_none());
    }

    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_unknown_user_cold_starts_instead_of_failing() {
    let context = build_context();

    let results = context
        .recommend(&Query::User("nobody".to_string()), 3)
        .await
        .unwrap();
    assert_eq!(results.len(), 3);
    // Cold start carries CF scores only
    assert!(results.iter().all(|e| e.hybrid_score.is_none()));
}

#[tokio::test]
async fn test_seed_query_excludes_seeds_and_blends() {
    let context = build_context();

    let seeds = vec!["m1".to_string()];
    let results = context.recommend(&Query::Seeds(seeds.clone()), 3).await.unwrap();
    assert!(!results.is_empty());

    for entry in &results {
        assert!(!seeds.contains(&entry.item_id));
        assert!(entry.cf_score.is_some());
        assert!(entry.content_score.is_some());
        assert!(entry.hybrid_score.is_some());
    }
}

#[tokio::test]
async fn test_seed_query_without_any_profile_is_no_profile_error() {
    let context = build_context();

    // Unknown seeds and no metadata client to resolve them
    let err = context
        .recommend(&Query::Seeds(vec!["99999".to_string()]), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoProfileAvailable));
}

#[tokio::test]
async fn test_text_query_ranks_by_content() {
    let context = build_context();

    let results = context
        .recommend(&Query::Text("space adventure".to_string()), 4)
        .await
        .unwrap();
    assert!(!results.is_empty());

    // The space movies outrank the heist movie
    let heist_pos = results.iter().position(|e| e.item_id == "m3");
    let space_pos = results.iter().position(|e| e.item_id == "m1");
    if let (Some(heist), Some(space)) = (heist_pos, space_pos) {
        assert!(space < heist);
    }
}

#[tokio::test]
async fn test_text_query_with_unknown_vocabulary_is_no_profile_error() {
    let context = build_context();

    let err = context
        .recommend(&Query::Text("xylophone zeppelin".to_string()), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoProfileAvailable));
}

#[tokio::test]
async fn test_cf_only_and_seed_content_modes() {
    let context = build_context();

    let cf_only = context.recommend_cf_only("u1", 2, true).await.unwrap();
    assert!(!cf_only.is_empty());
    assert!(cf_only.iter().all(|e| e.hybrid_score.is_none()));
    assert!(cf_only.iter().all(|e| e.content_score.is_none()));

    let seed_content = context
        .recommend_seed_content(&["m1".to_string()], 2)
        .await
        .unwrap();
    assert!(!seed_content.is_empty());
    assert!(seed_content.iter().all(|e| e.cf_score.is_none()));
    assert!(seed_content.iter().all(|e| e.content_score.is_some()));
}

#[tokio::test]
async fn test_zero_n_returns_empty() {
    let context = build_context();
    let results = context
        .recommend(&Query::User("u1".to_string()), 0)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_model_not_loaded_when_artifacts_missing() {
    let config = EngineConfig::default()
        .with_artifacts_dir(std::env::temp_dir().join("definitely_missing_artifacts"));
    let err = EngineContext::load(&config).unwrap_err();
    assert!(matches!(err, EngineError::ModelNotLoaded(_)));
}
