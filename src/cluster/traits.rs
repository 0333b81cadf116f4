//! Partitioning traits.

use crate::error::Result;
use crate::partition::Partition;

/// A hard partitioning algorithm over some pairwise matrix `M`.
///
/// k-medoids consumes a [`DistanceMatrix`](crate::DistanceMatrix); spectral
/// partitioning consumes an [`AffinityMatrix`](crate::AffinityMatrix).
pub trait Partitioner<M: ?Sized> {
    /// Partition the samples described by `input`.
    fn partition(&self, input: &M) -> Result<Partition>;

    /// Get the number of clusters.
    fn n_clusters(&self) -> usize;
}
