//! K-means on embedded rows.
//!
//! Used as the final step of spectral partitioning, where the rows of the
//! spectral embedding are clustered. Partitions data into k clusters by
//! minimizing **within-cluster sum of squares** (WCSS):
//!
//! ```text
//! WCSS = Σₖ Σᵢ∈Cₖ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids via k-means++
//! 2. **Assign**: Each point → nearest centroid
//! 3. **Update**: Each centroid → mean of assigned points
//! 4. Repeat until the centroid shift drops below `tol`
//!
//! Lloyd only finds a local minimum, so [`Kmeans::fit_restarts`] runs several
//! initializations from one random stream and keeps the lowest WCSS.
//!
//! ## K-means++ Initialization
//!
//! 1. Choose first centroid uniformly at random
//! 2. Choose next centroid with probability proportional to D(x)²
//!    (squared distance to nearest existing centroid)
//!
//! Randomness is always injected by the caller; there is no ambient RNG.

use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::error::{Error, Result};

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on the squared centroid shift.
    tol: f64,
}

/// Result of one k-means fit.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Cluster index per row.
    pub labels: Vec<usize>,
    /// Within-cluster sum of squares.
    pub inertia: f64,
    /// Lloyd iterations performed.
    pub iterations: usize,
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 300,
            tol: 1e-10,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Run `n_init` seeded initializations and keep the lowest inertia.
    ///
    /// Ties keep the earliest run.
    pub fn fit_restarts<R: Rng>(
        &self,
        data: ArrayView2<'_, f64>,
        n_init: usize,
        rng: &mut R,
    ) -> Result<KmeansFit> {
        if n_init == 0 {
            return Err(Error::invalid_parameter("n_init", "must be at least 1"));
        }
        let mut best: Option<KmeansFit> = None;
        for _ in 0..n_init {
            let fit = self.fit_with_rng(data, rng)?;
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or(Error::EmptyInput)
    }

    /// Fit once, drawing the initialization from `rng`.
    pub fn fit_with_rng<R: Rng>(
        &self,
        data: ArrayView2<'_, f64>,
        rng: &mut R,
    ) -> Result<KmeansFit> {
        let n = data.nrows();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }

        let d = data.ncols();
        let mut centroids = self.init_centroids(data, rng);
        let mut labels = vec![0usize; n];
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            self.assign(data, &centroids, &mut labels);

            // Update step
            let mut new_centroids = Array2::zeros((self.k, d));
            let mut counts = vec![0usize; self.k];
            for (i, &c) in labels.iter().enumerate() {
                let mut row = new_centroids.row_mut(c);
                row += &data.row(i);
                counts[c] += 1;
            }
            for (c, &count) in counts.iter().enumerate() {
                if count > 0 {
                    new_centroids
                        .row_mut(c)
                        .mapv_inplace(|v| v / count as f64);
                } else {
                    // Empty cluster: reinitialize randomly
                    let idx = rng.random_range(0..n);
                    new_centroids.row_mut(c).assign(&data.row(idx));
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(new_centroids.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            centroids = new_centroids;

            if shift < self.tol {
                break;
            }
        }

        let inertia = self.assign(data, &centroids, &mut labels);
        Ok(KmeansFit {
            labels,
            inertia,
            iterations,
        })
    }

    /// Assign each row to its nearest centroid; returns the WCSS.
    fn assign(
        &self,
        data: ArrayView2<'_, f64>,
        centroids: &Array2<f64>,
        labels: &mut [usize],
    ) -> f64 {
        let mut wcss = 0.0;
        for (i, label) in labels.iter_mut().enumerate() {
            let point = data.row(i);
            let mut best_cluster = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..self.k {
                let dist = squared_distance(&point, &centroids.row(c));
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            *label = best_cluster;
            wcss += best_dist;
        }
        wcss
    }

    /// Initialize centroids using k-means++ algorithm.
    fn init_centroids<R: Rng>(&self, data: ArrayView2<'_, f64>, rng: &mut R) -> Array2<f64> {
        let n = data.nrows();
        let mut centroids = Array2::zeros((self.k, data.ncols()));

        // First centroid: random point
        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&data.row(first));

        // Remaining centroids: k-means++ selection
        for i in 1..self.k {
            let distances: Vec<f64> = (0..n)
                .map(|j| {
                    let point = data.row(j);
                    (0..i)
                        .map(|c| squared_distance(&point, &centroids.row(c)))
                        .fold(f64::INFINITY, f64::min)
                })
                .collect();

            // Sample proportional to squared distance
            let total: f64 = distances.iter().sum();
            if total == 0.0 {
                let idx = rng.random_range(0..n);
                centroids.row_mut(i).assign(&data.row(idx));
                continue;
            }

            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (j, &d) in distances.iter().enumerate() {
                cumsum += d;
                if cumsum >= threshold && d > 0.0 {
                    selected = j;
                    break;
                }
            }

            centroids.row_mut(i).assign(&data.row(selected));
        }

        centroids
    }
}

fn squared_distance(a: &ArrayView1<'_, f64>, b: &ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
