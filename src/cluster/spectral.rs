//! Spectral partitioning of an affinity matrix.
//!
//! Spectral partitioning works by:
//! 1. Compute normalized Laplacian of the affinity graph
//! 2. Find k smallest eigenvectors
//! 3. Row-normalize the embedding
//! 4. Run k-means on the embedded points
//!
//! # When to Use
//!
//! Spectral partitioning finds non-convex clusters that centroid or medoid
//! methods on raw distances miss: two samples can end up together because
//! they are connected through a chain of strong affinities, even when they
//! are not directly similar.
//!
//! | Aspect | Spectral | k-medoids |
//! |--------|----------|-----------|
//! | Input | Affinity | Distance |
//! | Shape | Any | Compact |
//! | Complexity | O(n³) eigendecomp | O(k n²) per swap sweep |
//! | Randomness | k-means restarts | None |
//!
//! # Algorithm
//!
//! ```text
//! 1. d_i = Σ_j W_ij, floored to a small positive degree
//! 2. L_sym = I - D^{-1/2} W D^{-1/2}
//! 3. U ∈ R^{n×k}: eigenvectors of the k smallest eigenvalues of L_sym
//! 4. Normalize rows of U to unit length
//! 5. k-means (several seeded restarts) on rows of U
//! ```
//!
//! # References
//!
//! - Ng, Jordan, Weiss (2001). "On Spectral Clustering"
//! - von Luxburg (2007). "A Tutorial on Spectral Clustering"

use faer::{Mat, Side};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::kmeans::Kmeans;
use super::traits::Partitioner;
use crate::error::{Error, Result};
use crate::matrix::AffinityMatrix;
use crate::partition::Partition;

/// Spectral partitioning configuration and runner.
#[derive(Debug, Clone)]
pub struct SpectralPartitioner {
    /// Number of clusters
    k: usize,
    /// K-means restarts on the embedding
    n_init: usize,
    /// K-means iterations per restart
    kmeans_iter: usize,
    /// Smallest degree used in D^{-1/2}; zero makes isolated nodes an error
    degree_floor: f64,
    /// Seed used by [`Partitioner::partition`]
    seed: u64,
}

impl SpectralPartitioner {
    /// Create new spectral partitioning with k clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_init: 10,
            kmeans_iter: 300,
            degree_floor: 1e-12,
            seed: 42,
        }
    }

    /// Set number of k-means restarts.
    pub fn with_restarts(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set number of k-means iterations.
    pub fn with_kmeans_iter(mut self, iter: usize) -> Self {
        self.kmeans_iter = iter;
        self
    }

    /// Set the degree floor for isolated nodes.
    pub fn with_degree_floor(mut self, floor: f64) -> Self {
        self.degree_floor = floor;
        self
    }

    /// Set the seed used when no RNG is passed explicitly.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Row-normalized spectral embedding (n × k).
    pub fn embedding(&self, affinity: &AffinityMatrix) -> Result<Array2<f64>> {
        let n = affinity.n();
        if self.k < 2 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }

        let laplacian = normalized_laplacian(affinity, self.degree_floor)?;
        let lap = Mat::<f64>::from_fn(n, n, |i, j| laplacian[[i, j]]);
        let evd = lap.selfadjoint_eigendecomposition(Side::Lower);
        let values = evd.s().column_vector();
        let vectors = evd.u();

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| values.read(a).total_cmp(&values.read(b)).then(a.cmp(&b)));

        let mut embedding = Array2::zeros((n, self.k));
        for (c, &idx) in order.iter().take(self.k).enumerate() {
            for i in 0..n {
                embedding[[i, c]] = vectors[(i, idx)];
            }
        }
        if embedding.iter().any(|v: &f64| !v.is_finite()) {
            return Err(Error::Numerical(
                "eigendecomposition produced non-finite values".into(),
            ));
        }

        for mut row in embedding.rows_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            }
        }

        debug!(
            n,
            k = self.k,
            lambda_k = values.read(order[self.k - 1]),
            "spectral embedding"
        );
        Ok(embedding)
    }

    /// Partition with an explicitly supplied random source.
    pub fn fit_with_rng<R: Rng>(
        &self,
        affinity: &AffinityMatrix,
        rng: &mut R,
    ) -> Result<Partition> {
        let embedding = self.embedding(affinity)?;
        let fit = Kmeans::new(self.k)
            .with_max_iter(self.kmeans_iter)
            .fit_restarts(embedding.view(), self.n_init, rng)?;
        debug!(
            k = self.k,
            inertia = fit.inertia,
            iterations = fit.iterations,
            "k-means on spectral embedding"
        );
        Ok(Partition::from_assignments(&fit.labels))
    }
}

impl Partitioner<AffinityMatrix> for SpectralPartitioner {
    fn partition(&self, input: &AffinityMatrix) -> Result<Partition> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        self.fit_with_rng(input, &mut rng)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Spectral partition of `affinity` into `k` clusters using `rng` for the
/// k-means restarts.
pub fn spectral_partition<R: Rng>(
    affinity: &AffinityMatrix,
    k: usize,
    rng: &mut R,
) -> Result<Partition> {
    SpectralPartitioner::new(k).fit_with_rng(affinity, rng)
}

/// `L = I - D^{-1/2} W D^{-1/2}`.
///
/// Zero-degree rows are floored to `degree_floor`; with a zero floor they
/// are reported as [`Error::Numerical`].
pub fn normalized_laplacian(
    affinity: &AffinityMatrix,
    degree_floor: f64,
) -> Result<Array2<f64>> {
    let n = affinity.n();
    let mut degrees = affinity.degrees();

    let isolated = degrees.iter().filter(|&&d| d <= 0.0).count();
    if isolated > 0 {
        if degree_floor <= 0.0 {
            return Err(Error::Numerical(format!(
                "{isolated} isolated nodes with zero degree"
            )));
        }
        warn!(isolated, floor = degree_floor, "flooring zero node degrees");
        for d in degrees.iter_mut().filter(|d| **d <= 0.0) {
            *d = degree_floor;
        }
    }

    let inv_sqrt: Vec<f64> = degrees.iter().map(|d| 1.0 / d.sqrt()).collect();
    let w = affinity.view();
    Ok(Array2::from_shape_fn((n, n), |(i, j)| {
        let identity = if i == j { 1.0 } else { 0.0 };
        identity - inv_sqrt[i] * w[[i, j]] * inv_sqrt[j]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity::AffinityBuilder;
    use crate::matrix::SampleFeatureMatrix;
    use ndarray::array;

    fn blob_affinity() -> AffinityMatrix {
        let m = SampleFeatureMatrix::from_rows(
            vec!["a", "b", "c", "d", "e", "f"],
            &[
                vec![0.0, 0.0],
                vec![0.1, 0.0],
                vec![0.0, 0.1],
                vec![5.0, 5.0],
                vec![5.1, 5.0],
                vec![5.0, 5.1],
            ],
        )
        .unwrap();
        AffinityBuilder::new(2).build(&m).unwrap()
    }

    #[test]
    fn test_spectral_two_clusters() {
        let p = SpectralPartitioner::new(2)
            .partition(&blob_affinity())
            .expect("fit should succeed");

        // First 3 should be in same cluster, last 3 in another
        assert_eq!(p.labels(), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_spectral_deterministic_with_seed() {
        let w = blob_affinity();
        let a = spectral_partition(&w, 2, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = spectral_partition(&w, 2, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_laplacian_properties() {
        let w = blob_affinity();
        let l = normalized_laplacian(&w, 1e-12).unwrap();
        for i in 0..6 {
            // W_ii = 0 so the diagonal of L is exactly 1
            assert!((l[[i, i]] - 1.0).abs() < 1e-12);
            for j in 0..6 {
                assert!((l[[i, j]] - l[[j, i]]).abs() < 1e-12);
            }
        }
        // D^{1/2} 1 is in the null space of L_sym
        let degrees = w.degrees();
        let v: Vec<f64> = degrees.iter().map(|d| d.sqrt()).collect();
        for i in 0..6 {
            let lv: f64 = (0..6).map(|j| l[[i, j]] * v[j]).sum();
            assert!(lv.abs() < 1e-9);
        }
    }

    #[test]
    fn test_embedding_rows_unit_norm() {
        let emb = SpectralPartitioner::new(2).embedding(&blob_affinity()).unwrap();
        assert_eq!(emb.dim(), (6, 2));
        for row in emb.rows() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_isolated_node() {
        let w = AffinityMatrix::new(array![
            [0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.1],
            [0.0, 1.0, 0.0, 0.1],
            [0.0, 0.1, 0.1, 0.0],
        ])
        .unwrap();
        assert!(matches!(
            normalized_laplacian(&w, 0.0),
            Err(Error::Numerical(_))
        ));
        let p = SpectralPartitioner::new(2).partition(&w).unwrap();
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn test_invalid_cluster_count() {
        let w = blob_affinity();
        assert!(SpectralPartitioner::new(1).partition(&w).is_err());
        assert!(SpectralPartitioner::new(7).partition(&w).is_err());
    }
}
