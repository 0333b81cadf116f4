//! Hard partitions of a sample set.

use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;

use crate::error::{Error, Result};

/// A total assignment of samples (by row position) to cluster ids.
///
/// Labels are canonical: cluster ids are `0..n_clusters`, numbered by first
/// appearance. Two partitions that differ only by a relabeling are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    labels: Vec<usize>,
    n_clusters: usize,
}

/// Externally supplied labeling used only for scoring.
pub type ReferenceLabeling = Partition;

impl Partition {
    /// Build a partition from raw cluster assignments.
    pub fn from_assignments(assignments: &[usize]) -> Self {
        Self::from_labels(assignments)
    }

    /// Build a partition from arbitrary hashable labels, e.g. subtype names.
    pub fn from_labels<T: Eq + Hash>(labels: &[T]) -> Self {
        let mut ids: HashMap<&T, usize> = HashMap::new();
        let mut out = Vec::with_capacity(labels.len());
        for label in labels {
            let next = ids.len();
            let id = *ids.entry(label).or_insert(next);
            out.push(id);
        }
        Self {
            n_clusters: ids.len(),
            labels: out,
        }
    }

    /// Cluster id per sample.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of distinct clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the partition covers no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Size of each cluster, indexed by cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }

    /// Sample positions belonging to `cluster`.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Pair each sample identifier with its cluster id.
    pub fn assign<'a>(&self, sample_ids: &'a [String]) -> Result<Vec<(&'a str, usize)>> {
        if sample_ids.len() != self.labels.len() {
            return Err(Error::DimensionMismatch {
                expected: self.labels.len(),
                found: sample_ids.len(),
            });
        }
        Ok(sample_ids
            .iter()
            .map(String::as_str)
            .zip(self.labels.iter().copied())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_relabeling() {
        let a = Partition::from_assignments(&[5, 5, 2, 2, 9]);
        let b = Partition::from_assignments(&[0, 0, 1, 1, 2]);
        assert_eq!(a, b);
        assert_eq!(a.labels(), &[0, 0, 1, 1, 2]);
        assert_eq!(a.n_clusters(), 3);
    }

    #[test]
    fn test_from_string_labels() {
        let p = Partition::from_labels(&["LumA", "Basal", "LumA", "Her2"]);
        assert_eq!(p.labels(), &[0, 1, 0, 2]);
        assert_eq!(p.cluster_sizes(), vec![2, 1, 1]);
        assert_eq!(p.members(0), vec![0, 2]);
    }

    #[test]
    fn test_assign_checks_length() {
        let p = Partition::from_assignments(&[0, 1]);
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(p.assign(&ids).unwrap(), vec![("a", 0), ("b", 1)]);
        assert!(p.assign(&ids[..1]).is_err());
    }
}
