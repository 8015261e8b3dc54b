//! Minimal sparse vector for TF-IDF rows.
//!
//! Rows of the term matrix are sparse (a movie's text touches a tiny slice
//! of the vocabulary), while profiles are dense. The only operations the
//! engine needs are dot-against-dense, scaled accumulation into a dense
//! buffer, and L2 normalization — so that is all this type offers.

use serde::{Deserialize, Serialize};

/// Sorted index/value pairs over a fixed-dimension vector space.
///
/// An empty pair list is a legitimate zero vector (an item with no content
/// text); normalization leaves it untouched rather than dividing by zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    indices: Vec<u32>,
    values: Vec<f32>,
}

impl SparseVector {
    /// Build from unsorted pairs; indices are sorted and must be unique.
    pub fn from_pairs(mut pairs: Vec<(u32, f32)>) -> Self {
        pairs.sort_unstable_by_key(|&(index, _)| index);
        Self {
            indices: pairs.iter().map(|&(index, _)| index).collect(),
            values: pairs.iter().map(|&(_, value)| value).collect(),
        }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_zero(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// L2-normalized copy; a zero vector stays the zero vector.
    pub fn normalized(&self) -> Self {
        let norm = self.norm();
        if norm <= f32::EPSILON {
            return self.clone();
        }
        Self {
            indices: self.indices.clone(),
            values: self.values.iter().map(|v| v / norm).collect(),
        }
    }

    /// Dot product against a dense vector of the full dimension.
    pub fn dot_dense(&self, dense: &[f32]) -> f32 {
        self.iter()
            .map(|(index, value)| value * dense.get(index as usize).copied().unwrap_or(0.0))
            .sum()
    }

    /// Accumulate `scale * self` into a dense buffer.
    pub fn add_into_dense(&self, acc: &mut [f32], scale: f32) {
        for (index, value) in self.iter() {
            if let Some(slot) = acc.get_mut(index as usize) {
                *slot += value * scale;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_sorts() {
        let v = SparseVector::from_pairs(vec![(5, 1.0), (1, 2.0), (3, 3.0)]);
        let pairs: Vec<(u32, f32)> = v.iter().collect();
        assert_eq!(pairs, vec![(1, 2.0), (3, 3.0), (5, 1.0)]);
    }

    #[test]
    fn test_zero_vector_normalization_is_identity() {
        let zero = SparseVector::default();
        assert!(zero.is_zero());
        assert_eq!(zero.normalized(), zero);
        assert_eq!(zero.norm(), 0.0);
    }

    #[test]
    fn test_normalized_is_unit() {
        let v = SparseVector::from_pairs(vec![(0, 3.0), (2, 4.0)]);
        let n = v.normalized();
        assert!((n.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_dense() {
        let v = SparseVector::from_pairs(vec![(0, 1.0), (2, 2.0)]);
        let dense = [0.5, 9.0, 0.25];
        assert!((v.dot_dense(&dense) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_add_into_dense_with_scale() {
        let v = SparseVector::from_pairs(vec![(1, 2.0)]);
        let mut acc = vec![0.0; 3];
        v.add_into_dense(&mut acc, 0.5);
        assert_eq!(acc, vec![0.0, 1.0, 0.0]);
    }
}
