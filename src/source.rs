//! Ordered, named collection of aligned per-source matrices.

use crate::error::{Error, Result};
use crate::matrix::SampleFeatureMatrix;

/// Per-source feature matrices keyed by source name.
///
/// Every matrix shares one canonical sample identifier sequence, fixed by the
/// first insertion. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sample_ids: Vec<String>,
    sources: Vec<(String, SampleFeatureMatrix)>,
}

impl SourceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source, checking it against the canonical sample order.
    ///
    /// # Errors
    ///
    /// - [`Error::DuplicateSource`] if `name` is already present.
    /// - [`Error::DimensionMismatch`] if the sample count differs.
    /// - [`Error::SampleMismatch`] if the identifier sequence differs.
    pub fn insert(&mut self, name: impl Into<String>, matrix: SampleFeatureMatrix) -> Result<()> {
        let name = name.into();
        if self.sources.iter().any(|(n, _)| *n == name) {
            return Err(Error::DuplicateSource(name));
        }

        if self.sources.is_empty() {
            self.sample_ids = matrix.sample_ids().to_vec();
        } else {
            if matrix.n_samples() != self.sample_ids.len() {
                return Err(Error::DimensionMismatch {
                    expected: self.sample_ids.len(),
                    found: matrix.n_samples(),
                });
            }
            if let Some((position, (expected, found))) = self
                .sample_ids
                .iter()
                .zip(matrix.sample_ids())
                .enumerate()
                .find(|(_, (a, b))| a != b)
            {
                return Err(Error::SampleMismatch {
                    position,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }

        self.sources.push((name, matrix));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_source(
        mut self,
        name: impl Into<String>,
        matrix: SampleFeatureMatrix,
    ) -> Result<Self> {
        self.insert(name, matrix)?;
        Ok(self)
    }

    /// Canonical sample identifiers.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Number of samples shared by every source.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the set has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<&SampleFeatureMatrix> {
        self.sources.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// Source names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|(n, _)| n.as_str())
    }

    /// `(name, matrix)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SampleFeatureMatrix)> {
        self.sources.iter().map(|(n, m)| (n.as_str(), m))
    }

    pub(crate) fn as_slice(&self) -> &[(String, SampleFeatureMatrix)] {
        &self.sources
    }
}
