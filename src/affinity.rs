//! Locally scaled affinity graphs from sample-by-feature matrices.
//!
//! A global Gaussian kernel `exp(-d² / 2σ²)` needs one σ for the whole
//! dataset. Different sources live on very different distance scales, and
//! within one source dense and sparse regions disagree on what "close" means.
//! Local scaling replaces σ with a per-pair scale derived from each sample's
//! neighborhood.
//!
//! # Kernel
//!
//! ```text
//! ε_i  = mean distance from i to its K nearest other samples
//! μ_ij = (ε_i + ε_j + D_ij) / 3
//! W_ij = exp(-D_ij² / (α · μ_ij))     (i ≠ j),   W_ii = 0
//! ```
//!
//! `W` is symmetric by construction and its off-diagonal entries lie in
//! `(0, 1]` (tiny values may underflow to zero).
//!
//! # Degenerate scales
//!
//! A sample with K exact duplicates has `ε_i = 0`. With a positive
//! `scale_floor` (the default) `μ_ij` is clamped to the floor; with
//! `scale_floor = 0` the builder fails with [`Error::Numerical`].
//!
//! # References
//!
//! - Zelnik-Manor & Perona (2004). "Self-Tuning Spectral Clustering"
//! - Wang et al. (2014). "Similarity network fusion for aggregating data types on a genomic scale"

use ndarray::{Array2, ArrayView2};
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::matrix::{AffinityMatrix, SampleFeatureMatrix};
use crate::source::SourceSet;

/// Builder for locally scaled affinity matrices.
#[derive(Debug, Clone)]
pub struct AffinityBuilder {
    /// Neighborhood size used for the local scale.
    k: usize,
    /// Kernel smoothing constant.
    alpha: f64,
    /// Lower bound applied to `μ_ij`.
    scale_floor: f64,
}

impl Default for AffinityBuilder {
    fn default() -> Self {
        Self::new(20)
    }
}

impl AffinityBuilder {
    /// Create a builder with neighborhood size `k`.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            alpha: 0.5,
            scale_floor: f64::EPSILON,
        }
    }

    /// Set the kernel smoothing constant α.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the floor for the pairwise scale μ. Zero disables clamping.
    pub fn with_scale_floor(mut self, floor: f64) -> Self {
        self.scale_floor = floor;
        self
    }

    /// Neighborhood size.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Build the affinity matrix for one source.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if `k == 0`, `k >= n`, `n < 2`, or
    ///   `alpha` / `scale_floor` are out of range.
    /// - [`Error::Numerical`] if a local scale is zero and `scale_floor == 0`,
    ///   or if distances or kernel values overflow to a non-finite value.
    pub fn build(&self, matrix: &SampleFeatureMatrix) -> Result<AffinityMatrix> {
        let n = matrix.n_samples();
        self.validate(n)?;

        let distances = pairwise_distances(matrix.values());
        if distances.iter().any(|d| !d.is_finite()) {
            return Err(Error::Numerical(
                "pairwise distance overflowed; rescale the features".into(),
            ));
        }
        let scales = local_scales(&distances, self.k);

        let degenerate = scales.iter().filter(|&&e| e == 0.0).count();
        if degenerate > 0 {
            if self.scale_floor <= 0.0 {
                return Err(Error::Numerical(format!(
                    "{degenerate} samples have zero local scale (duplicate points)"
                )));
            }
            warn!(
                degenerate,
                floor = self.scale_floor,
                "zero local scale; clamping pairwise scale"
            );
        }

        let alpha = self.alpha;
        let floor = self.scale_floor;
        let w = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                return 0.0;
            }
            let d = distances[[i, j]];
            let mu = ((scales[i] + scales[j] + d) / 3.0).max(floor);
            (-(d * d) / (alpha * mu)).exp()
        });

        if let Some(((i, j), v)) = w.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::Numerical(format!(
                "kernel value at ({i}, {j}) is {v}; local scales overflowed"
            )));
        }

        debug!(n, k = self.k, alpha, "built affinity matrix");
        Ok(AffinityMatrix::from_array(w))
    }

    /// Build one affinity matrix per source, preserving source order.
    ///
    /// Sources are independent; with the `parallel` feature they are built
    /// concurrently.
    pub fn build_all(&self, sources: &SourceSet) -> Result<Vec<(String, AffinityMatrix)>> {
        if sources.is_empty() {
            return Err(Error::EmptyInput);
        }

        #[cfg(feature = "parallel")]
        let built = sources
            .as_slice()
            .par_iter()
            .map(|(name, m)| self.build(m).map(|a| (name.clone(), a)))
            .collect::<Result<Vec<_>>>();

        #[cfg(not(feature = "parallel"))]
        let built = sources
            .as_slice()
            .iter()
            .map(|(name, m)| self.build(m).map(|a| (name.clone(), a)))
            .collect::<Result<Vec<_>>>();

        built
    }

    fn validate(&self, n: usize) -> Result<()> {
        if n < 2 {
            return Err(Error::invalid_parameter(
                "matrix",
                format!("need at least 2 samples, got {n}"),
            ));
        }
        if self.k == 0 || self.k >= n {
            return Err(Error::invalid_parameter(
                "k",
                format!("neighborhood size must be in 1..{n}, got {}", self.k),
            ));
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(Error::invalid_parameter("alpha", "must be positive and finite"));
        }
        if !(self.scale_floor.is_finite() && self.scale_floor >= 0.0) {
            return Err(Error::invalid_parameter(
                "scale_floor",
                "must be nonnegative and finite",
            ));
        }
        Ok(())
    }
}

/// Build a locally scaled affinity matrix with default α and floor.
pub fn build_affinity(matrix: &SampleFeatureMatrix, k: usize) -> Result<AffinityMatrix> {
    AffinityBuilder::new(k).build(matrix)
}

/// Pairwise Euclidean distances between rows. `D_ii = 0` exactly.
pub fn pairwise_distances(points: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = points.nrows();
    let mut d = Array2::zeros((n, n));
    for i in 0..n {
        let xi = points.row(i);
        for j in (i + 1)..n {
            let diff = &xi - &points.row(j);
            let dist = diff.dot(&diff).sqrt();
            d[[i, j]] = dist;
            d[[j, i]] = dist;
        }
    }
    d
}

/// Mean distance from each sample to its `k` nearest other samples.
fn local_scales(distances: &Array2<f64>, k: usize) -> Vec<f64> {
    let n = distances.nrows();
    let mut scratch = Vec::with_capacity(n - 1);
    (0..n)
        .map(|i| {
            scratch.clear();
            scratch.extend(
                distances
                    .row(i)
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, &d)| d),
            );
            scratch.select_nth_unstable_by(k - 1, f64::total_cmp);
            scratch[..k].iter().sum::<f64>() / k as f64
        })
        .collect()
}
