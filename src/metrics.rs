//! Partition agreement statistics.
//!
//! Measures for comparing a predicted partition with a reference labeling
//! (or any two partitions of the same samples).
//!
//! # Metrics Overview
//!
//! | Metric | Range | Best | Properties |
//! |--------|-------|------|------------|
//! | [`rand_index`] | [0, 1] | 1 | Fraction of agreeing sample pairs |
//! | [`ari`] | [-1, 1] | 1 | Rand index adjusted for chance |
//! | [`nmi`] | [0, 1] | 1 | Mutual information over mean entropy |
//! | [`jaccard`] | [0, 1] | 1 | Shared same-cluster pairs over all same-cluster pairs |
//!
//! All four are symmetric in their arguments and invariant to relabeling the
//! clusters of either partition.
//!
//! # Pair counting
//!
//! Everything is computed from the k_a × k_b contingency table `n_ij`
//! without enumerating the n² sample pairs:
//!
//! ```text
//! same_both = Σ_ij C(n_ij, 2)
//! same_a    = Σ_i  C(a_i, 2)        a_i = row sums
//! same_b    = Σ_j  C(b_j, 2)        b_j = column sums
//! total     = C(n, 2)
//!
//! RI      = (total + 2·same_both - same_a - same_b) / total
//! Jaccard = same_both / (same_a + same_b - same_both)
//! ARI     = (same_both - same_a·same_b/total) / ((same_a + same_b)/2 - same_a·same_b/total)
//! ```
//!
//! # References
//!
//! - Rand (1971). "Objective criteria for the evaluation of clustering methods"
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)
//! - Strehl & Ghosh (2002). "Cluster ensembles" (NMI)

use std::collections::HashMap;

use ndarray::Array2;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::partition::Partition;

/// The four agreement statistics between two partitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgreementReport {
    /// Rand index.
    pub rand_index: f64,
    /// Adjusted Rand index.
    pub adjusted_rand_index: f64,
    /// Normalized mutual information.
    pub nmi: f64,
    /// Jaccard index over same-cluster pairs.
    pub jaccard: f64,
}

/// Score two partitions of the same samples.
///
/// # Errors
///
/// - [`Error::EmptyInput`] if the partitions are empty.
/// - [`Error::DimensionMismatch`] if they cover different sample counts.
pub fn score(a: &Partition, b: &Partition) -> Result<AgreementReport> {
    if a.is_empty() {
        return Err(Error::EmptyInput);
    }
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    let table = ContingencyTable::new(a.labels(), b.labels());
    Ok(AgreementReport {
        rand_index: table.rand_index(),
        adjusted_rand_index: table.adjusted_rand_index(),
        nmi: table.nmi(),
        jaccard: table.jaccard(),
    })
}

/// Cross-tabulation of two labelings.
#[derive(Debug, Clone)]
pub struct ContingencyTable {
    counts: Array2<usize>,
    row_sums: Vec<usize>,
    col_sums: Vec<usize>,
    n: usize,
}

impl ContingencyTable {
    /// Build the table. Labels may be arbitrary ids; they are densified.
    pub fn new(a: &[usize], b: &[usize]) -> Self {
        let (a_ids, ka) = densify(a);
        let (b_ids, kb) = densify(b);
        let mut counts = Array2::zeros((ka, kb));
        for (&i, &j) in a_ids.iter().zip(&b_ids) {
            counts[[i, j]] += 1;
        }
        let row_sums = counts.rows().into_iter().map(|r| r.sum()).collect();
        let col_sums = counts.columns().into_iter().map(|c| c.sum()).collect();
        Self {
            counts,
            row_sums,
            col_sums,
            n: a_ids.len().min(b_ids.len()),
        }
    }

    /// `n_ij` counts (k_a × k_b).
    pub fn counts(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.n
    }

    fn pair_counts(&self) -> PairCounts {
        PairCounts {
            same_both: self.counts.iter().map(|&c| comb2(c)).sum(),
            same_a: self.row_sums.iter().map(|&c| comb2(c)).sum(),
            same_b: self.col_sums.iter().map(|&c| comb2(c)).sum(),
            total: comb2(self.n),
        }
    }

    /// Fraction of sample pairs on which both labelings agree.
    pub fn rand_index(&self) -> f64 {
        let p = self.pair_counts();
        if p.total == 0.0 {
            return 1.0;
        }
        (p.total + 2.0 * p.same_both - p.same_a - p.same_b) / p.total
    }

    /// Rand index corrected for chance agreement.
    pub fn adjusted_rand_index(&self) -> f64 {
        let p = self.pair_counts();
        if p.total == 0.0 {
            return 1.0;
        }
        let expected = p.same_a * p.same_b / p.total;
        let max_index = (p.same_a + p.same_b) / 2.0;
        let denom = max_index - expected;
        if denom.abs() < 1e-10 {
            // Both trivial (all together or all apart): identical structure.
            return if (p.same_a - p.same_b).abs() < 1e-10 {
                1.0
            } else {
                0.0
            };
        }
        (p.same_both - expected) / denom
    }

    /// `I(A; B) / ((H(A) + H(B)) / 2)`. Two constant labelings score 1.
    pub fn nmi(&self) -> f64 {
        if self.n == 0 {
            return 1.0;
        }
        let n = self.n as f64;
        let h_a = entropy(&self.row_sums, n);
        let h_b = entropy(&self.col_sums, n);

        let mut mi = 0.0;
        for ((i, j), &c) in self.counts.indexed_iter() {
            if c > 0 {
                let p_joint = c as f64 / n;
                let p_a = self.row_sums[i] as f64 / n;
                let p_b = self.col_sums[j] as f64 / n;
                mi += p_joint * (p_joint / (p_a * p_b)).ln();
            }
        }

        let denom = h_a + h_b;
        if denom > 0.0 {
            (2.0 * mi / denom).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Same-cluster pairs shared by both labelings over same-cluster pairs in
    /// either. Two all-singleton labelings score 1.
    pub fn jaccard(&self) -> f64 {
        let p = self.pair_counts();
        let union = p.same_a + p.same_b - p.same_both;
        if union == 0.0 {
            return 1.0;
        }
        p.same_both / union
    }
}

struct PairCounts {
    same_both: f64,
    same_a: f64,
    same_b: f64,
    total: f64,
}

/// Rand index between two label slices (0 on length mismatch).
pub fn rand_index(a: &[usize], b: &[usize]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    ContingencyTable::new(a, b).rand_index()
}

/// Adjusted Rand index between two label slices (0 on length mismatch).
///
/// ```rust
/// use meld::metrics::ari;
///
/// let pred = [0, 0, 1, 1];
/// let truth = [1, 1, 0, 0];
/// assert!((ari(&pred, &truth) - 1.0).abs() < 1e-12);
/// ```
pub fn ari(a: &[usize], b: &[usize]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    ContingencyTable::new(a, b).adjusted_rand_index()
}

/// Normalized mutual information between two label slices (0 on length
/// mismatch).
pub fn nmi(a: &[usize], b: &[usize]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    ContingencyTable::new(a, b).nmi()
}

/// Jaccard index between two label slices (0 on length mismatch).
pub fn jaccard(a: &[usize], b: &[usize]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    ContingencyTable::new(a, b).jaccard()
}

// Helper functions

fn densify(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut ids = HashMap::new();
    let dense = labels
        .iter()
        .map(|l| {
            let next = ids.len();
            *ids.entry(*l).or_insert(next)
        })
        .collect();
    (dense, ids.len())
}

fn comb2(n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        (n * (n - 1) / 2) as f64
    }
}

fn entropy(counts: &[usize], n: f64) -> f64 {
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}
