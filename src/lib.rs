//! # meld
//!
//! Multi-source similarity network fusion.
//!
//! Each data source (one feature matrix over a shared set of samples) becomes a
//! locally scaled affinity graph. The graphs are fused by cross-diffusion into
//! one consensus network, which can then be partitioned (k-medoids on a derived
//! distance, or spectral partitioning on the affinity directly) and scored
//! against a reference labeling.
//!
//! ```text
//! SampleFeatureMatrix ─► AffinityBuilder ─► AffinityMatrix ─┐
//! SampleFeatureMatrix ─► AffinityBuilder ─► AffinityMatrix ─┼─► fuse ─► AffinityMatrix
//!                                                           │            │
//!                                                           │   to_distance ─► KMedoids
//!                                                           │            └──► SpectralPartitioner
//!                                                           └─► average_combine (baseline)
//! ```
//!
//! [`Pipeline`] wires the whole flow together and returns an [`Evaluation`].
//!
//! With the default `parallel` feature, per-source affinity construction and
//! the per-network fusion updates run on the rayon pool.

pub mod affinity;
pub mod cluster;
pub mod config;
pub mod distance;
/// Error types used across `meld`.
pub mod error;
pub mod fusion;
pub mod harness;
pub mod matrix;
pub mod metrics;
pub mod partition;
pub mod source;

#[cfg(test)]
mod scenario_tests;

pub use affinity::{build_affinity, AffinityBuilder};
pub use cluster::{k_medoids, spectral_partition, KMedoids, Partitioner, SpectralPartitioner};
pub use config::PipelineConfig;
pub use distance::{row_stochastic, to_distance};
pub use error::{Error, ErrorKind, Result};
pub use fusion::{average_combine, fuse, NetworkFusion};
pub use harness::{Algorithm, Evaluation, EvaluationRow, Network, Pipeline};
pub use matrix::{AffinityMatrix, DistanceMatrix, SampleFeatureMatrix};
pub use metrics::{score, AgreementReport};
pub use partition::{Partition, ReferenceLabeling};
pub use source::SourceSet;
