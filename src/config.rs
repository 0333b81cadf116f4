//! Pipeline configuration.
//!
//! Every field has a default, so a partial JSON or TOML document is enough:
//!
//! ```rust
//! use meld::PipelineConfig;
//!
//! let json = r#"{ "neighbors": 10, "iterations": 30 }"#;
//! let config: PipelineConfig = serde_json::from_str(json).unwrap();
//! assert_eq!(config.neighbors, 10);
//! assert_eq!(config.alpha, 0.5);
//! ```

use serde::{Deserialize, Serialize};

use crate::affinity::AffinityBuilder;
use crate::cluster::{KMedoids, SpectralPartitioner};
use crate::error::{Error, Result};
use crate::fusion::NetworkFusion;

/// Parameters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Neighborhood size K for affinity scaling and fusion.
    pub neighbors: usize,
    /// Kernel smoothing constant α.
    pub alpha: f64,
    /// Lower bound on the pairwise kernel scale.
    pub scale_floor: f64,
    /// Cross-diffusion iterations t.
    pub iterations: usize,
    /// Diagonal of the fusion transition matrices.
    pub self_weight: f64,
    /// Number of clusters; `None` uses the reference labeling's count.
    pub n_clusters: Option<usize>,
    /// Cap on k-medoids swaps.
    pub kmedoids_max_swaps: usize,
    /// K-means restarts inside spectral partitioning.
    pub spectral_restarts: usize,
    /// K-means iterations per restart.
    pub kmeans_max_iter: usize,
    /// Degree floor for isolated nodes in the Laplacian.
    pub degree_floor: f64,
    /// Seed for all randomized steps.
    pub seed: u64,
    /// Also partition and score every single-source affinity.
    pub include_single_sources: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            neighbors: 20,
            alpha: 0.5,
            scale_floor: f64::EPSILON,
            iterations: 20,
            self_weight: 0.5,
            n_clusters: None,
            kmedoids_max_swaps: 100,
            spectral_restarts: 10,
            kmeans_max_iter: 300,
            degree_floor: 1e-12,
            seed: 42,
            include_single_sources: true,
        }
    }
}

impl PipelineConfig {
    /// Check parameter ranges that do not depend on the data.
    pub fn validate(&self) -> Result<()> {
        if self.neighbors == 0 {
            return Err(Error::invalid_parameter("neighbors", "must be at least 1"));
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
        if self.iterations == 0 {
            return Err(Error::invalid_parameter("iterations", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.self_weight) {
            return Err(Error::invalid_parameter("self_weight", "must lie in [0, 1)"));
        }
        if let Some(k) = self.n_clusters {
            if k < 2 {
                return Err(Error::invalid_parameter("n_clusters", "must be at least 2"));
            }
        }
        if self.spectral_restarts == 0 {
            return Err(Error::invalid_parameter(
                "spectral_restarts",
                "must be at least 1",
            ));
        }
        if !(self.degree_floor.is_finite() && self.degree_floor >= 0.0) {
            return Err(Error::invalid_parameter(
                "degree_floor",
                "must be nonnegative and finite",
            ));
        }
        Ok(())
    }

    /// Affinity builder for these parameters.
    pub fn affinity_builder(&self) -> AffinityBuilder {
        AffinityBuilder::new(self.neighbors)
            .with_alpha(self.alpha)
            .with_scale_floor(self.scale_floor)
    }

    /// Network fusion for these parameters.
    pub fn fusion(&self) -> NetworkFusion {
        NetworkFusion::new(self.neighbors)
            .with_iterations(self.iterations)
            .with_self_weight(self.self_weight)
    }

    /// k-medoids partitioner with `k` clusters.
    pub fn kmedoids(&self, k: usize) -> KMedoids {
        KMedoids::new(k).with_max_swaps(self.kmedoids_max_swaps)
    }

    /// Spectral partitioner with `k` clusters.
    pub fn spectral(&self, k: usize) -> SpectralPartitioner {
        SpectralPartitioner::new(k)
            .with_restarts(self.spectral_restarts)
            .with_kmeans_iter(self.kmeans_max_iter)
            .with_degree_floor(self.degree_floor)
            .with_seed(self.seed)
    }
}
