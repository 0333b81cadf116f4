//! Affinity to distance conversion for distance-based partitioners.
//!
//! ```text
//! P      = rownorm(W)                  every row sums to 1
//! Dist   = 1 - (P + Pᵀ) / 2            off the diagonal
//! Dist_ii = 0
//! ```
//!
//! A fused affinity is already (close to) row-stochastic, so the row
//! normalization is then near the identity and `Dist ≈ 1 - W`.

use ndarray::Array2;
use tracing::warn;

use crate::matrix::{row_normalize, symmetrize, AffinityMatrix, DistanceMatrix};

/// Row-stochastic version of an affinity matrix.
///
/// Rows summing to zero become uniform.
pub fn row_stochastic(affinity: &AffinityMatrix) -> Array2<f64> {
    let (p, fallbacks) = row_normalize(affinity.view());
    if fallbacks > 0 {
        warn!(rows = fallbacks, "affinity rows with zero mass mapped to uniform");
    }
    p
}

/// Convert an affinity matrix into a normalized distance matrix.
pub fn to_distance(affinity: &AffinityMatrix) -> DistanceMatrix {
    let p = row_stochastic(affinity);
    let mut dist = symmetrize(&p.mapv(|v| 1.0 - v));
    // P_ij ≤ 1, but rounding in the normalization can leave -1e-17.
    dist.mapv_inplace(|v| v.max(0.0));
    dist.diag_mut().fill(0.0);
    DistanceMatrix::from_array(dist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn affinity() -> AffinityMatrix {
        AffinityMatrix::new(array![
            [0.0, 2.0, 1.0, 1.0],
            [2.0, 0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0, 3.0],
            [1.0, 0.0, 3.0, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_row_stochastic_invariant() {
        let p = row_stochastic(&affinity());
        for row in p.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_distance_is_complement_of_symmetrized_p() {
        let w = affinity();
        let p = row_stochastic(&w);
        let d = to_distance(&w);
        for i in 0..4 {
            assert_eq!(d.get(i, i), 0.0);
            for j in 0..4 {
                if i != j {
                    let expected = 1.0 - (p[[i, j]] + p[[j, i]]) / 2.0;
                    assert!((d.get(i, j) - expected).abs() < 1e-12);
                    assert_eq!(d.get(i, j), d.get(j, i));
                }
            }
        }
        // row 0: P_01 = 0.5, row 1: P_10 = 2/3
        assert!((d.get(0, 1) - (1.0 - (0.5 + 2.0 / 3.0) / 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_more_similar_means_closer() {
        let d = to_distance(&affinity());
        assert!(d.get(2, 3) < d.get(1, 3));
        assert!(d.get(0, 1) < d.get(0, 3));
    }

    #[test]
    fn test_zero_row_is_uniform() {
        let w = AffinityMatrix::new(array![
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 1.0, 0.0]
        ])
        .unwrap();
        let d = to_distance(&w);
        assert!(d.view().iter().all(|v| v.is_finite() && *v >= 0.0));
        let p = row_stochastic(&w);
        assert!((p[[0, 0]] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_valid_for_constructor() {
        let d = to_distance(&affinity());
        assert!(DistanceMatrix::new(d.into_inner()).is_ok());
    }
}
