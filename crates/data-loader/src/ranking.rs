//! Shared score-vector primitives: partial top-n selection and min-max
//! normalization.
//!
//! Every scorer in the engine (CF, content, hybrid) funnels through
//! [`top_indices`], so the selection contract lives in one place:
//!
//! - Callers exclude candidates by overwriting their score with
//!   `f32::NEG_INFINITY`. The selector never returns a `-inf` entry — not
//!   even when `n` exceeds the remaining pool — which is what makes the
//!   sentinel a safe exclusion mechanism rather than a numeric accident.
//! - Ties among exactly equal scores are broken by ascending index, so
//!   repeated runs over identical scores return identical rankings.

use std::cmp::Ordering;

/// Compare two scored positions: higher score first, ascending index on ties.
///
/// `-inf` compares below every finite score, and the index tie-break makes
/// this a total order over positions, so selection is deterministic.
fn compare_scored(a: (usize, f32), b: (usize, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Indices of the `n` highest scores, sorted descending by score.
/// `-inf` entries are excluded candidates and never selected.
///
/// Partial-sort discipline: `select_nth_unstable_by` first partitions the
/// index set so the n best are isolated, then only that prefix is sorted.
/// For n much smaller than the catalog this avoids sorting the full score
/// vector.
pub fn top_indices(scores: &[f32], n: usize) -> Vec<usize> {
    if scores.is_empty() || n == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..scores.len())
        .filter(|&i| scores[i] != f32::NEG_INFINITY)
        .collect();
    let n = n.min(indices.len());
    if n == 0 {
        return Vec::new();
    }
    let cmp = |&a: &usize, &b: &usize| compare_scored((a, scores[a]), (b, scores[b]));

    if n < indices.len() {
        indices.select_nth_unstable_by(n - 1, cmp);
        indices.truncate(n);
    }
    indices.sort_unstable_by(cmp);
    indices
}

/// Min-max normalize a score slice into `[0, 1]`.
///
/// An all-equal input maps every value to 1.0 instead of dividing by a
/// zero range; an empty input stays empty.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    if scores.is_empty() {
        return Vec::new();
    }
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == min {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|&s| (s - min) / (max - min)).collect()
}
