//! End-to-end clustering and scoring harness.
//!
//! ```text
//! SourceSet ──► per-source affinity ──┬─► fuse ─────────────┐
//!                                     ├─► average_combine ──┤
//!                                     └─► (each source) ────┤
//!                                                           ▼
//!                              k-medoids(to_distance(W)), spectral(W)
//!                                                           ▼
//!                                    score vs reference ──► Evaluation
//! ```
//!
//! The harness renders nothing; [`EvaluationRow`] derives `Serialize` so the
//! caller can emit CSV or JSON however it likes.

use std::fmt;

use ndarray::Array2;
use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::Partitioner;
use crate::config::PipelineConfig;
use crate::distance::to_distance;
use crate::error::{Error, Result};
use crate::fusion::average_combine;
use crate::matrix::AffinityMatrix;
use crate::metrics::{nmi, score, AgreementReport};
use crate::partition::Partition;
use crate::source::SourceSet;

/// Which similarity network a row was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// Cross-diffusion fused network.
    Fused,
    /// Elementwise mean of the source networks.
    Average,
    /// A single source's own network.
    Source(String),
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Fused => write!(f, "fused"),
            Network::Average => write!(f, "average"),
            Network::Source(name) => write!(f, "{name}"),
        }
    }
}

/// Partitioning algorithm used for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// k-medoids on `to_distance(W)`.
    KMedoids,
    /// Spectral partitioning on `W`.
    Spectral,
}

/// One line of the result table.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRow {
    /// Network the partition came from.
    pub network: Network,
    /// Algorithm that produced the partition.
    pub algorithm: Algorithm,
    /// The partition itself.
    pub partition: Partition,
    /// Agreement with the reference labeling.
    pub report: AgreementReport,
}

/// Pairwise NMI between the spectral partitions of the fused network and of
/// each source network.
///
/// Index 0 is the fused network; indices `1..` follow source order. A high
/// value in row 0 means that source agrees with the consensus.
#[derive(Debug, Clone)]
pub struct Concordance {
    /// Network for each row/column.
    pub networks: Vec<Network>,
    /// Symmetric NMI matrix with unit diagonal.
    pub nmi: Array2<f64>,
}

impl Concordance {
    fn from_partitions(parts: Vec<(Network, Partition)>) -> Self {
        let m = parts.len();
        let nmi_matrix = Array2::from_shape_fn((m, m), |(i, j)| {
            if i == j {
                1.0
            } else {
                nmi(parts[i].1.labels(), parts[j].1.labels())
            }
        });
        Self {
            networks: parts.into_iter().map(|(n, _)| n).collect(),
            nmi: nmi_matrix,
        }
    }

    /// NMI between the fused partition and the named source's partition.
    pub fn with_fused(&self, source: &str) -> Option<f64> {
        self.networks
            .iter()
            .position(|n| matches!(n, Network::Source(s) if s == source))
            .map(|idx| self.nmi[[0, idx]])
    }
}

/// Everything produced by one pipeline run.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Number of clusters used.
    pub k: usize,
    /// Fused affinity.
    pub fused: AffinityMatrix,
    /// Average-combined affinity.
    pub average: AffinityMatrix,
    /// Scored partitions, fused first, then average, then single sources.
    pub rows: Vec<EvaluationRow>,
    /// Source-vs-consensus agreement.
    pub concordance: Concordance,
}

impl Evaluation {
    /// Look up one row.
    pub fn row(&self, network: &Network, algorithm: Algorithm) -> Option<&EvaluationRow> {
        self.rows
            .iter()
            .find(|r| r.network == *network && r.algorithm == algorithm)
    }

    /// Row with the highest adjusted Rand index (first on ties).
    pub fn best(&self) -> Option<&EvaluationRow> {
        self.rows.iter().fold(None, |best: Option<&EvaluationRow>, r| match best {
            Some(b) if b.report.adjusted_rand_index >= r.report.adjusted_rand_index => Some(b),
            _ => Some(r),
        })
    }
}

/// Runs the full fusion / partition / scoring flow.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, validating the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fuse, partition and score.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] with fewer than 2 sources.
    /// - [`Error::DimensionMismatch`] if the reference covers a different
    ///   number of samples.
    /// - [`Error::InvalidClusterCount`] if k is not in `2..n`.
    /// - Any error from the individual stages.
    pub fn run(&self, sources: &SourceSet, reference: &Partition) -> Result<Evaluation> {
        if sources.len() < 2 {
            return Err(Error::invalid_parameter(
                "sources",
                format!("need at least 2 sources, got {}", sources.len()),
            ));
        }
        let n = sources.n_samples();
        if reference.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: reference.len(),
            });
        }
        let k = self.config.n_clusters.unwrap_or(reference.n_clusters());
        if k < 2 || k >= n {
            return Err(Error::InvalidClusterCount {
                requested: k,
                n_items: n,
            });
        }

        let affinities = self.config.affinity_builder().build_all(sources)?;
        debug!(sources = affinities.len(), n, "built source affinities");

        let fused = self
            .config
            .fusion()
            .fuse(affinities.iter().map(|(_, w)| w))?;
        let average = average_combine(affinities.iter().map(|(_, w)| w))?;

        let mut rows = Vec::new();
        let fused_spectral = self.evaluate(Network::Fused, &fused, k, reference, &mut rows)?;
        self.evaluate(Network::Average, &average, k, reference, &mut rows)?;

        let mut concordance = vec![(Network::Fused, fused_spectral)];
        for (name, w) in &affinities {
            let network = Network::Source(name.clone());
            let spectral = if self.config.include_single_sources {
                self.evaluate(network.clone(), w, k, reference, &mut rows)?
            } else {
                self.config.spectral(k).partition(w)?
            };
            concordance.push((network, spectral));
        }
        let concordance = Concordance::from_partitions(concordance);

        let evaluation = Evaluation {
            k,
            fused,
            average,
            rows,
            concordance,
        };
        if let Some(best) = evaluation.best() {
            info!(
                n,
                k,
                sources = sources.len(),
                best_network = %best.network,
                best_algorithm = ?best.algorithm,
                best_ari = best.report.adjusted_rand_index,
                "pipeline finished"
            );
        }
        Ok(evaluation)
    }

    /// Partition one network with both algorithms and append the scored rows.
    /// Returns the spectral partition.
    fn evaluate(
        &self,
        network: Network,
        w: &AffinityMatrix,
        k: usize,
        reference: &Partition,
        rows: &mut Vec<EvaluationRow>,
    ) -> Result<Partition> {
        let distance = to_distance(w);
        let medoids = self.config.kmedoids(k).partition(&distance)?;
        let spectral = self.config.spectral(k).partition(w)?;

        for (algorithm, partition) in [
            (Algorithm::KMedoids, medoids),
            (Algorithm::Spectral, spectral.clone()),
        ] {
            let report = score(&partition, reference)?;
            debug!(
                network = %network,
                ?algorithm,
                ari = report.adjusted_rand_index,
                nmi = report.nmi,
                "scored partition"
            );
            rows.push(EvaluationRow {
                network: network.clone(),
                algorithm,
                partition,
                report,
            });
        }
        Ok(spectral)
    }
}
