//! Benchmarks for CF inference
//!
//! Run with: cargo bench --package cf-model
//!
//! Trains a synthetic model once, then benchmarks full-catalog scoring
//! and top-n selection.

use cf_model::{FactorModel, TrainerConfig, train};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::RatingRecord;

fn synthetic_model(num_users: usize, num_items: usize) -> FactorModel {
    // Deterministic pseudo-ratings: each user rates a spread of items
    let mut ratings = Vec::new();
    for u in 0..num_users {
        for step in 0..20 {
            let i = (u * 7 + step * 13) % num_items;
            let rating = 1.0 + ((u + i) % 5) as f32;
            ratings.push(RatingRecord::new(
                format!("u{}", u),
                format!("m{}", i),
                rating,
            ));
        }
    }
    let config = TrainerConfig::default().with_rank(32).with_min_ratings_per_user(1);
    train(ratings, &config).expect("synthetic training failed")
}

fn bench_score_items(c: &mut Criterion) {
    let model = synthetic_model(500, 2000);

    c.bench_function("score_items_full_catalog", |b| {
        b.iter(|| {
            let scores = model.score_items(black_box("u1"), black_box(true));
            black_box(scores)
        })
    });
}

fn bench_recommend_top_n(c: &mut Criterion) {
    let model = synthetic_model(500, 2000);

    c.bench_function("recommend_top_10", |b| {
        b.iter(|| {
            let results = model.recommend(black_box("u1"), black_box(10), true);
            black_box(results)
        })
    });
}

fn bench_cold_start(c: &mut Criterion) {
    let model = synthetic_model(500, 2000);

    c.bench_function("cold_start_top_10", |b| {
        b.iter(|| {
            let results = model.recommend(black_box("nobody"), black_box(10), true);
            black_box(results)
        })
    });
}

criterion_group!(benches, bench_score_items, bench_recommend_top_n, bench_cold_start);
criterion_main!(benches);
