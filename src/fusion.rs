//! Cross-diffusion fusion of several affinity matrices into one.
//!
//! Each source contributes two views of its affinity `W`:
//!
//! - a **transition matrix** `P`: off-diagonal entries scaled so that each
//!   row's off-diagonal mass is `1 - s`, with the diagonal fixed at the self
//!   weight `s` (default 1/2), so every row sums to 1;
//! - a **local neighbor matrix** `S`: only the `K` largest off-diagonal
//!   entries per row, renormalized to sum to 1.
//!
//! # Iteration
//!
//! ```text
//! for t iterations:
//!     for every source m (simultaneously):
//!         P_m ← S_m · mean(P_¬m) · S_mᵀ
//!         P_m ← (P_m + P_mᵀ) / 2
//! fused = sym(rownorm(mean(P_m)))
//! ```
//!
//! The dense `P` carries global structure; the sparse `S` restricts the
//! update to each source's own neighborhood. Structure that several sources
//! agree on survives the diffusion; structure only one source sees gets
//! averaged away.
//!
//! Iterations are sequential. Within one iteration the per-source updates
//! only read the previous iterate, so they run in parallel under the
//! `parallel` feature.
//!
//! # Baseline
//!
//! [`average_combine`] is the elementwise mean of the inputs, no diffusion.
//! It is the naive comparison point: when sources disagree, the mean blurs
//! both structures into near-uniform similarity.
//!
//! # References
//!
//! - Wang et al. (2014). "Similarity network fusion for aggregating data types on a genomic scale"

use ndarray::{Array2, ArrayView2};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::matrix::{row_normalize, symmetrize, AffinityMatrix};

/// Cross-diffusion network fusion.
#[derive(Debug, Clone)]
pub struct NetworkFusion {
    /// Neighbors kept per row of the local matrices.
    k: usize,
    /// Number of diffusion iterations.
    iterations: usize,
    /// Diagonal of the transition matrices.
    self_weight: f64,
}

impl Default for NetworkFusion {
    fn default() -> Self {
        Self::new(20)
    }
}

impl NetworkFusion {
    /// Create a fusion with `k` neighbors, 20 iterations and self weight 1/2.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            iterations: 20,
            self_weight: 0.5,
        }
    }

    /// Set the number of diffusion iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the transition-matrix diagonal. Must lie in `[0, 1)`.
    pub fn with_self_weight(mut self, self_weight: f64) -> Self {
        self.self_weight = self_weight;
        self
    }

    /// Fuse two or more affinity matrices.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] for fewer than 2 matrices, `k == 0`,
    ///   `k >= n`, zero iterations or a self weight outside `[0, 1)`.
    /// - [`Error::DimensionMismatch`] if the matrices differ in size.
    pub fn fuse<'a, I>(&self, affinities: I) -> Result<AffinityMatrix>
    where
        I: IntoIterator<Item = &'a AffinityMatrix>,
    {
        let mats: Vec<&AffinityMatrix> = affinities.into_iter().collect();
        let n = self.validate(&mats)?;
        let m = mats.len();

        let mut transitions: Vec<Array2<f64>> = mats
            .iter()
            .map(|w| transition_matrix(w.view(), self.self_weight))
            .collect();
        let locals: Vec<Array2<f64>> = mats
            .iter()
            .map(|w| local_neighbor_matrix(w.view(), self.k))
            .collect();

        for iteration in 0..self.iterations {
            let total = transitions
                .iter()
                .fold(Array2::<f64>::zeros((n, n)), |acc, p| acc + p);

            let step = |v: usize| -> Array2<f64> {
                let others = (&total - &transitions[v]) / (m - 1) as f64;
                let s = &locals[v];
                symmetrize(&s.dot(&others).dot(&s.t()))
            };

            #[cfg(feature = "parallel")]
            let next: Vec<Array2<f64>> = (0..m).into_par_iter().map(step).collect();
            #[cfg(not(feature = "parallel"))]
            let next: Vec<Array2<f64>> = (0..m).map(step).collect();

            let delta = next
                .iter()
                .zip(&transitions)
                .map(|(a, b)| (a - b).fold(0.0f64, |acc, v| acc.max(v.abs())))
                .fold(0.0f64, f64::max);
            debug!(iteration, delta, "cross-diffusion step");

            transitions = next;
        }

        let mean = transitions
            .iter()
            .fold(Array2::<f64>::zeros((n, n)), |acc, p| acc + p)
            / m as f64;
        let (normalized, fallbacks) = row_normalize(mean.view());
        if fallbacks > 0 {
            warn!(rows = fallbacks, "fused rows with zero mass replaced by uniform");
        }

        debug!(sources = m, n, k = self.k, iterations = self.iterations, "fused networks");
        Ok(AffinityMatrix::from_array(symmetrize(&normalized)))
    }

    fn validate(&self, mats: &[&AffinityMatrix]) -> Result<usize> {
        if mats.len() < 2 {
            return Err(Error::invalid_parameter(
                "affinities",
                format!("fusion needs at least 2 matrices, got {}", mats.len()),
            ));
        }
        let n = check_same_size(mats)?;
        if self.k == 0 || self.k >= n {
            return Err(Error::invalid_parameter(
                "k",
                format!("neighborhood size must be in 1..{n}, got {}", self.k),
            ));
        }
        if self.iterations == 0 {
            return Err(Error::invalid_parameter("iterations", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.self_weight) {
            return Err(Error::invalid_parameter("self_weight", "must lie in [0, 1)"));
        }
        Ok(n)
    }
}

/// Fuse affinity matrices with `k` neighbors and `iterations` steps.
pub fn fuse(
    affinities: &[AffinityMatrix],
    k: usize,
    iterations: usize,
) -> Result<AffinityMatrix> {
    NetworkFusion::new(k)
        .with_iterations(iterations)
        .fuse(affinities)
}

/// Elementwise mean of one or more affinity matrices.
pub fn average_combine<'a, I>(affinities: I) -> Result<AffinityMatrix>
where
    I: IntoIterator<Item = &'a AffinityMatrix>,
{
    let mats: Vec<&AffinityMatrix> = affinities.into_iter().collect();
    if mats.is_empty() {
        return Err(Error::EmptyInput);
    }
    let n = check_same_size(&mats)?;
    let sum = mats
        .iter()
        .fold(Array2::<f64>::zeros((n, n)), |acc, w| acc + &w.view());
    Ok(AffinityMatrix::from_array(sum / mats.len() as f64))
}

/// Row-stochastic transition matrix with a fixed diagonal.
///
/// Off-diagonal entries of row `i` are `(1 - s) · W_ij / Σ_{j≠i} W_ij`; the
/// diagonal is `s`. A row with no off-diagonal mass spreads `1 - s` evenly.
pub fn transition_matrix(w: ArrayView2<'_, f64>, self_weight: f64) -> Array2<f64> {
    let n = w.nrows();
    let mut p = Array2::zeros((n, n));
    let mut isolated = 0usize;
    for i in 0..n {
        let off: f64 = (0..n).filter(|&j| j != i).map(|j| w[[i, j]]).sum();
        for j in 0..n {
            p[[i, j]] = if i == j {
                self_weight
            } else if off > 0.0 {
                (1.0 - self_weight) * w[[i, j]] / off
            } else {
                (1.0 - self_weight) / (n - 1) as f64
            };
        }
        if off <= 0.0 {
            isolated += 1;
        }
    }
    if isolated > 0 {
        warn!(rows = isolated, "isolated rows in transition matrix; spreading mass uniformly");
    }
    p
}

/// Keep the `k` largest off-diagonal entries per row, renormalized to sum
/// to 1. Ties go to the lower column index.
pub fn local_neighbor_matrix(w: ArrayView2<'_, f64>, k: usize) -> Array2<f64> {
    let n = w.nrows();
    let mut s = Array2::zeros((n, n));
    let mut order: Vec<usize> = Vec::with_capacity(n);
    for i in 0..n {
        order.clear();
        order.extend((0..n).filter(|&j| j != i));
        order.sort_by(|&a, &b| w[[i, b]].total_cmp(&w[[i, a]]).then(a.cmp(&b)));
        let kept = &order[..k.min(order.len())];

        let total: f64 = kept.iter().map(|&j| w[[i, j]]).sum();
        for &j in kept {
            s[[i, j]] = if total > 0.0 {
                w[[i, j]] / total
            } else {
                1.0 / kept.len() as f64
            };
        }
    }
    s
}

fn check_same_size(mats: &[&AffinityMatrix]) -> Result<usize> {
    let n = mats[0].n();
    for w in &mats[1..] {
        if w.n() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: w.n(),
            });
        }
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SYMMETRY_TOLERANCE;
    use ndarray::array;
    use proptest::prelude::*;

    fn block_affinity() -> AffinityMatrix {
        AffinityMatrix::new(array![
            [0.0, 0.9, 0.8, 0.1, 0.0],
            [0.9, 0.0, 0.7, 0.0, 0.1],
            [0.8, 0.7, 0.0, 0.1, 0.0],
            [0.1, 0.0, 0.1, 0.0, 0.9],
            [0.0, 0.1, 0.0, 0.9, 0.0],
        ])
        .unwrap()
    }

    fn noisy_affinity() -> AffinityMatrix {
        AffinityMatrix::new(array![
            [0.0, 0.3, 0.2, 0.6, 0.4],
            [0.3, 0.0, 0.5, 0.2, 0.7],
            [0.2, 0.5, 0.0, 0.4, 0.3],
            [0.6, 0.2, 0.4, 0.0, 0.5],
            [0.4, 0.7, 0.3, 0.5, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_transition_rows_sum_to_one() {
        let p = transition_matrix(block_affinity().view(), 0.5);
        for i in 0..5 {
            assert_eq!(p[[i, i]], 0.5);
            assert!((p.row(i).sum() - 1.0).abs() < 1e-12);
        }
        // 0.9 / (0.9 + 0.8 + 0.1) of the off-diagonal half
        assert!((p[[0, 1]] - 0.5 * 0.9 / 1.8).abs() < 1e-12);
    }

    #[test]
    fn test_transition_isolated_row() {
        let w = array![[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]];
        let p = transition_matrix(w.view(), 0.5);
        assert!((p[[0, 1]] - 0.25).abs() < 1e-12);
        assert!((p[[0, 2]] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_local_neighbors_keep_k_largest() {
        let s = local_neighbor_matrix(block_affinity().view(), 2);
        // row 0 keeps columns 1 (0.9) and 2 (0.8)
        assert!((s[[0, 1]] - 0.9 / 1.7).abs() < 1e-12);
        assert!((s[[0, 2]] - 0.8 / 1.7).abs() < 1e-12);
        assert_eq!(s[[0, 3]], 0.0);
        assert_eq!(s[[0, 0]], 0.0);
        for i in 0..5 {
            assert!((s.row(i).sum() - 1.0).abs() < 1e-12);
            assert_eq!(s.row(i).iter().filter(|&&v| v > 0.0).count(), 2);
        }
    }

    #[test]
    fn test_local_neighbors_tie_prefers_lower_index() {
        let w = array![
            [0.0, 0.5, 0.5, 0.5],
            [0.5, 0.0, 0.5, 0.5],
            [0.5, 0.5, 0.0, 0.5],
            [0.5, 0.5, 0.5, 0.0],
        ];
        let s = local_neighbor_matrix(w.view(), 1);
        assert_eq!(s[[0, 1]], 1.0);
        assert_eq!(s[[3, 0]], 1.0);
    }

    #[test]
    fn test_fused_is_symmetric_nonnegative() {
        let fused = NetworkFusion::new(2)
            .with_iterations(10)
            .fuse([&block_affinity(), &noisy_affinity()])
            .unwrap();
        assert!(fused.is_symmetric(SYMMETRY_TOLERANCE));
        assert!(fused
            .view()
            .iter()
            .all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_identical_copies_independent_of_count() {
        let w = block_affinity();
        let two = fuse(&[w.clone(), w.clone()], 2, 20).unwrap();
        let four = fuse(&[w.clone(), w.clone(), w.clone(), w.clone()], 2, 20).unwrap();
        for (a, b) in two.view().iter().zip(four.view().iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_fuse_requires_two_matrices() {
        let w = block_affinity();
        assert!(NetworkFusion::new(2).fuse([&w]).is_err());
    }

    #[test]
    fn test_fuse_dimension_mismatch() {
        let small = AffinityMatrix::new(array![[0.0, 1.0], [1.0, 0.0]]).unwrap();
        let err = NetworkFusion::new(1)
            .fuse([&block_affinity(), &small])
            .unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 5,
                found: 2
            }
        );
    }

    #[test]
    fn test_fuse_parameter_checks() {
        let (a, b) = (block_affinity(), noisy_affinity());
        assert!(NetworkFusion::new(5).fuse([&a, &b]).is_err());
        assert!(NetworkFusion::new(0).fuse([&a, &b]).is_err());
        assert!(NetworkFusion::new(2).with_iterations(0).fuse([&a, &b]).is_err());
        assert!(NetworkFusion::new(2).with_self_weight(1.0).fuse([&a, &b]).is_err());
    }

    #[test]
    fn test_average_combine() {
        let avg = average_combine([&block_affinity(), &noisy_affinity()]).unwrap();
        assert!((avg.get(0, 1) - 0.6).abs() < 1e-12);
        assert!((avg.get(3, 4) - 0.7).abs() < 1e-12);
        assert!(avg.is_symmetric(SYMMETRY_TOLERANCE));
        assert!(average_combine(Vec::<&AffinityMatrix>::new()).is_err());
    }

    fn random_affinity(n: usize, raw: &[f64]) -> AffinityMatrix {
        let w = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                0.0
            } else {
                let (a, b) = (i.min(j), i.max(j));
                raw[a * n + b]
            }
        });
        AffinityMatrix::new(w).unwrap()
    }

    proptest! {
        #[test]
        fn prop_fused_symmetric_nonnegative(
            (n, raws, k) in (4usize..9, 2usize..4).prop_flat_map(|(n, m)| {
                (
                    Just(n),
                    proptest::collection::vec(proptest::collection::vec(0.0f64..1.0, n * n), m),
                    1..n,
                )
            }),
            iterations in 1usize..6,
        ) {
            let mats: Vec<AffinityMatrix> =
                raws.iter().map(|raw| random_affinity(n, raw)).collect();
            let fused = NetworkFusion::new(k)
                .with_iterations(iterations)
                .fuse(&mats)
                .unwrap();
            prop_assert_eq!(fused.n(), n);
            prop_assert!(fused.is_symmetric(SYMMETRY_TOLERANCE));
            for &v in fused.view().iter() {
                prop_assert!(v.is_finite());
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
