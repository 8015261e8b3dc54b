//! Matrix-factorization training pipeline.
//!
//! Steps, in order:
//! 1. Drop users with fewer than `min_ratings_per_user` ratings
//! 2. Assign dense user/item positions in first-seen order
//! 3. Build the sparse observed-rating set and per-user rated-item sets
//! 4. Compute global/user/item means (empty rows fall back to the global mean)
//! 5. Center observed cells per the configured policy; unobserved cells
//!    stay zero (no residual preference)
//! 6. Factorize by regularized alternating least squares with a fixed seed
//! 7. Assemble the [`FactorModel`] artifact
//!
//! The pipeline is a single-threaded batch job; only the per-user/per-item
//! least-squares solves inside each ALS sweep fan out over Rayon. Solved
//! rows are collected in index order, so training is deterministic for a
//! given seed and input.

use crate::model::{CenteringPolicy, FactorModel};
use data_loader::{DataError, IdIndex, Position, RatingRecord, filter_sparse_users};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Training configuration.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Requested factor rank; clamped to `min(users, items) - 1` at fit time
    pub rank: usize,
    /// Users below this rating count are dropped before training
    pub min_ratings_per_user: usize,
    /// L2 regularization added to each least-squares solve
    pub regularization: f32,
    /// Number of alternating sweeps
    pub iterations: usize,
    /// RNG seed for factor initialization; same seed + same input = same model
    pub seed: u64,
    pub centering: CenteringPolicy,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            rank: 50,
            min_ratings_per_user: 3,
            regularization: 0.1,
            iterations: 15,
            seed: 42,
            centering: CenteringPolicy::UserMean,
        }
    }
}

impl TrainerConfig {
    /// Configure the requested factor rank (default: 50)
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    /// Configure the minimum ratings per user (default: 3)
    pub fn with_min_ratings_per_user(mut self, min: usize) -> Self {
        self.min_ratings_per_user = min;
        self
    }

    /// Configure the centering policy (default: user mean)
    pub fn with_centering(mut self, centering: CenteringPolicy) -> Self {
        self.centering = centering;
        self
    }

    /// Configure the RNG seed (default: 42)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Train a [`FactorModel`] from rating triples.
///
/// Fails with [`DataError::NoRatings`] when nothing survives the sparse-user
/// filter; every other input shape trains.
pub fn train(ratings: Vec<RatingRecord>, config: &TrainerConfig) -> Result<FactorModel, DataError> {
    let ratings = filter_sparse_users(ratings, config.min_ratings_per_user);
    if ratings.is_empty() {
        return Err(DataError::NoRatings);
    }

    // Dense positions in first-seen order, one index per entity space.
    // Observed cells deduplicate last-writer-wins; BTreeMap keeps the
    // iteration order (and therefore the fit) independent of how duplicates
    // were interleaved in the input
    let mut user_index = IdIndex::new();
    let mut item_index = IdIndex::new();
    let mut observed: BTreeMap<(Position, Position), f32> = BTreeMap::new();
    let mut rated_items: Vec<Vec<Position>> = Vec::new();
    for record in &ratings {
        let u = user_index.insert_or_get(&record.user_id);
        let i = item_index.insert_or_get(&record.item_id);
        if rated_items.len() <= u as usize {
            rated_items.resize(u as usize + 1, Vec::new());
        }
        if observed.insert((u, i), record.rating).is_none() {
            rated_items[u as usize].push(i);
        }
    }
    for rated in &mut rated_items {
        rated.sort_unstable();
    }
    let num_users = user_index.len();
    let num_items = item_index.len();

    let (user_means, item_means, global_mean) =
        compute_means(&observed, num_users, num_items);

    // Center observed cells; unobserved cells stay at zero
    let residuals: Vec<(Position, Position, f32)> = observed
        .iter()
        .map(|(&(u, i), &rating)| {
            let offset = match config.centering {
                CenteringPolicy::UserMean => user_means[u as usize],
                CenteringPolicy::GlobalMean => global_mean,
            };
            (u, i, rating - offset)
        })
        .collect();

    // Keep the factorization well-posed; a 1x1 corpus still gets rank 1
    let k = config
        .rank
        .min(num_users.min(num_items).saturating_sub(1))
        .max(1);

    info!(
        "Training CF model: {} users, {} items, {} observed ratings, rank {}",
        num_users,
        num_items,
        residuals.len(),
        k
    );

    let (user_factors, item_factors) = factorize(&residuals, num_users, num_items, k, config);

    Ok(FactorModel {
        user_index,
        item_index,
        user_factors,
        // Stored as k × items so scoring reads columns
        item_factors: item_factors.t().to_owned(),
        user_means,
        item_means,
        global_mean,
        rated_items,
        centering: config.centering,
    })
}

fn compute_means(
    observed: &BTreeMap<(Position, Position), f32>,
    num_users: usize,
    num_items: usize,
) -> (Vec<f32>, Vec<f32>, f32) {
    let mut user_sums = vec![0.0f64; num_users];
    let mut user_counts = vec![0usize; num_users];
    let mut item_sums = vec![0.0f64; num_items];
    let mut item_counts = vec![0usize; num_items];
    let mut total = 0.0f64;

    for (&(u, i), &rating) in observed {
        user_sums[u as usize] += rating as f64;
        user_counts[u as usize] += 1;
        item_sums[i as usize] += rating as f64;
        item_counts[i as usize] += 1;
        total += rating as f64;
    }

    let global_mean = if observed.is_empty() {
        0.0
    } else {
        (total / observed.len() as f64) as f32
    };

    // A user/item with no observations falls back to the global mean
    let user_means = user_sums
        .iter()
        .zip(&user_counts)
        .map(|(&sum, &count)| {
            if count > 0 {
                (sum / count as f64) as f32
            } else {
                global_mean
            }
        })
        .collect();
    let item_means = item_sums
        .iter()
        .zip(&item_counts)
        .map(|(&sum, &count)| {
            if count > 0 {
                (sum / count as f64) as f32
            } else {
                global_mean
            }
        })
        .collect();

    (user_means, item_means, global_mean)
}

/// Alternating least squares over the observed residuals.
///
/// Returns `(user_factors: users × k, item_factors: items × k)`; the caller
/// transposes the item side into its artifact orientation.
fn factorize(
    residuals: &[(Position, Position, f32)],
    num_users: usize,
    num_items: usize,
    k: usize,
    config: &TrainerConfig,
) -> (Array2<f32>, Array2<f32>) {
    // Per-entity observation lists drive each normal-equation solve
    let mut by_user: Vec<Vec<(Position, f32)>> = vec![Vec::new(); num_users];
    let mut by_item: Vec<Vec<(Position, f32)>> = vec![Vec::new(); num_items];
    for &(u, i, r) in residuals {
        by_user[u as usize].push((i, r));
        by_item[i as usize].push((u, r));
    }

    let lambda = (config.regularization as f64).max(1e-6);

    // Seeded init makes repeated training on identical input reproducible
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut user_factors = Array2::<f32>::zeros((num_users, k));
    let mut item_factors = Array2::<f32>::zeros((num_items, k));
    for value in item_factors.iter_mut() {
        *value = rng.random_range(-0.1..0.1);
    }

    for iteration in 0..config.iterations {
        // Solve every user against the current item factors
        let new_users: Vec<Array1<f32>> = (0..num_users)
            .into_par_iter()
            .map(|u| solve_factor_row(&by_user[u], &item_factors, k, lambda))
            .collect();
        for (u, row) in new_users.into_iter().enumerate() {
            user_factors.row_mut(u).assign(&row);
        }

        // Then every item against the updated user factors
        let new_items: Vec<Array1<f32>> = (0..num_items)
            .into_par_iter()
            .map(|i| solve_factor_row(&by_item[i], &user_factors, k, lambda))
            .collect();
        for (i, row) in new_items.into_iter().enumerate() {
            item_factors.row_mut(i).assign(&row);
        }

        debug!(
            "ALS iteration {}: loss = {:.6}",
            iteration,
            reconstruction_loss(residuals, &user_factors, &item_factors)
        );
    }

    (user_factors, item_factors)
}

/// Solve one ridge-regularized normal-equation system
/// `(B^T B + lambda I) x = B^T r` for a single user or item, where B holds
/// the basis rows this entity was observed against.
fn solve_factor_row(
    observed: &[(Position, f32)],
    basis: &Array2<f32>,
    k: usize,
    lambda: f64,
) -> Array1<f32> {
    if observed.is_empty() {
        return Array1::zeros(k);
    }

    let mut a = Array2::<f64>::zeros((k, k));
    let mut b = Array1::<f64>::zeros(k);

    for &(pos, residual) in observed {
        let basis_vec = basis.row(pos as usize);
        for row in 0..k {
            let lhs = basis_vec[row] as f64;
            for col in 0..k {
                a[[row, col]] += lhs * basis_vec[col] as f64;
            }
            b[row] += residual as f64 * lhs;
        }
    }
    for diag in 0..k {
        a[[diag, diag]] += lambda;
    }

    cholesky_solve(&a, &b).mapv(|v| v as f32)
}

/// Solve `A x = b` for symmetric positive-definite A via Cholesky
/// decomposition. The ridge term keeps A strictly positive definite, so
/// the decomposition cannot encounter a non-positive pivot.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    // A = L * L^T
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                l[[i, j]] = (a[[i, i]] - sum).max(f64::MIN_POSITIVE).sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }
    x
}

fn reconstruction_loss(
    residuals: &[(Position, Position, f32)],
    user_factors: &Array2<f32>,
    item_factors: &Array2<f32>,
) -> f32 {
    if residuals.is_empty() {
        return 0.0;
    }
    let total: f32 = residuals
        .iter()
        .map(|&(u, i, r)| {
            let prediction = user_factors
                .row(u as usize)
                .dot(&item_factors.row(i as usize));
            (r - prediction).powi(2)
        })
        .sum();
    total / residuals.len() as f32
}
