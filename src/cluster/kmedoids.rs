//! k-medoids (PAM) on a precomputed distance matrix.
//!
//! Medoids are actual samples, so only pairwise distances are needed; no
//! vector space or centroid is involved. This is what makes k-medoids usable
//! on distances derived from fused similarity networks.
//!
//! # Objective
//!
//! ```text
//! TD = Σᵢ min_{m ∈ M} d(i, m)
//! ```
//!
//! # BUILD
//!
//! 1. First medoid: the sample with the smallest total distance to all others.
//! 2. Each further medoid: the non-medoid with the largest reduction of TD.
//!
//! # SWAP
//!
//! Evaluate every (medoid, non-medoid) exchange, apply the one that reduces
//! TD the most, repeat until no exchange improves TD. The change of one
//! exchange is computed in O(n) from each sample's nearest and second nearest
//! medoid distances, so one sweep costs O(k · n²).
//!
//! TD never increases between BUILD and the end of SWAP. Ties are broken
//! toward the lowest sample index everywhere, which makes the result a pure
//! function of the distance matrix.
//!
//! # References
//!
//! - Kaufman & Rousseeuw (1990). "Finding Groups in Data", ch. 2 (PAM)
//! - Schubert & Rousseeuw (2021). "Fast and eager k-medoids clustering"

use ndarray::ArrayView2;
use tracing::{debug, warn};

use super::traits::Partitioner;
use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;
use crate::partition::Partition;

/// k-medoids with BUILD initialization and greedy SWAP refinement.
#[derive(Debug, Clone)]
pub struct KMedoids {
    /// Number of clusters.
    k: usize,
    /// Cap on accepted swaps.
    max_swaps: usize,
    /// Fail instead of warning when the cap is hit.
    strict: bool,
}

/// Result of a k-medoids fit.
#[derive(Debug, Clone)]
pub struct KMedoidsFit {
    /// Canonical partition of the samples.
    pub partition: Partition,
    /// Medoid sample indices, ascending.
    pub medoids: Vec<usize>,
    /// Medoid sample index each sample is assigned to.
    pub medoid_of: Vec<usize>,
    /// Objective after BUILD.
    pub build_cost: f64,
    /// Objective after SWAP.
    pub cost: f64,
    /// Number of swaps applied.
    pub swaps: usize,
    /// Whether SWAP stopped because no exchange improved the objective.
    pub converged: bool,
}

/// Nearest / second nearest medoid bookkeeping.
struct Assignment {
    /// Position (into the medoid list) of the nearest medoid.
    nearest: Vec<usize>,
    /// Distance to the nearest medoid.
    near: Vec<f64>,
    /// Distance to the second nearest medoid.
    second: Vec<f64>,
}

impl Assignment {
    fn compute(d: ArrayView2<'_, f64>, medoids: &[usize]) -> Self {
        let n = d.nrows();
        let mut nearest = vec![0; n];
        let mut near = vec![f64::INFINITY; n];
        let mut second = vec![f64::INFINITY; n];
        for j in 0..n {
            for (pos, &m) in medoids.iter().enumerate() {
                let dist = d[[j, m]];
                if dist < near[j] {
                    second[j] = near[j];
                    near[j] = dist;
                    nearest[j] = pos;
                } else if dist < second[j] {
                    second[j] = dist;
                }
            }
        }
        Self {
            nearest,
            near,
            second,
        }
    }

    fn cost(&self) -> f64 {
        self.near.iter().sum()
    }
}

impl KMedoids {
    /// Create a k-medoids partitioner with `k` clusters.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_swaps: 100,
            strict: false,
        }
    }

    /// Set the cap on accepted swaps.
    pub fn with_max_swaps(mut self, max_swaps: usize) -> Self {
        self.max_swaps = max_swaps;
        self
    }

    /// Return [`Error::NonConvergence`] instead of the best partition found
    /// when the swap cap is reached.
    pub fn with_strict_convergence(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Run BUILD and SWAP.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidClusterCount`] if `k < 2` or `k >= n`.
    /// - [`Error::NonConvergence`] if strict convergence is on and the swap
    ///   cap is reached.
    pub fn fit(&self, distance: &DistanceMatrix) -> Result<KMedoidsFit> {
        let n = distance.n();
        if self.k < 2 || self.k >= n {
            return Err(Error::InvalidClusterCount {
                requested: self.k,
                n_items: n,
            });
        }
        let d = distance.view();

        let mut medoids = build(d, self.k);
        let mut assignment = Assignment::compute(d, &medoids);
        let build_cost = assignment.cost();
        let tol = 1e-12 * build_cost.max(1.0);

        let mut swaps = 0;
        let converged = loop {
            let Some((delta, pos, candidate)) = best_swap(d, &medoids, &assignment) else {
                break true;
            };
            if delta >= -tol {
                break true;
            }
            if swaps == self.max_swaps {
                break false;
            }
            medoids[pos] = candidate;
            medoids.sort_unstable();
            assignment = Assignment::compute(d, &medoids);
            swaps += 1;
        };

        if !converged {
            if self.strict {
                return Err(Error::NonConvergence {
                    iterations: self.max_swaps,
                });
            }
            warn!(
                max_swaps = self.max_swaps,
                "k-medoids swap cap reached; returning best medoids found"
            );
        }

        let cost = assignment.cost();
        debug!(k = self.k, n, build_cost, cost, swaps, "k-medoids finished");

        let medoid_of: Vec<usize> = assignment.nearest.iter().map(|&p| medoids[p]).collect();
        Ok(KMedoidsFit {
            partition: Partition::from_assignments(&assignment.nearest),
            medoids,
            medoid_of,
            build_cost,
            cost,
            swaps,
            converged,
        })
    }
}

impl Partitioner<DistanceMatrix> for KMedoids {
    fn partition(&self, input: &DistanceMatrix) -> Result<Partition> {
        self.fit(input).map(|fit| fit.partition)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Partition a distance matrix into `k` clusters with default settings.
pub fn k_medoids(distance: &DistanceMatrix, k: usize) -> Result<Partition> {
    KMedoids::new(k).partition(distance)
}

/// Greedy BUILD initialization. Returns medoids in ascending order.
fn build(d: ArrayView2<'_, f64>, k: usize) -> Vec<usize> {
    let n = d.nrows();

    let mut first = 0;
    let mut first_cost = f64::INFINITY;
    for c in 0..n {
        let total = d.column(c).sum();
        if total < first_cost {
            first_cost = total;
            first = c;
        }
    }

    let mut medoids = vec![first];
    let mut is_medoid = vec![false; n];
    is_medoid[first] = true;
    let mut near: Vec<f64> = d.column(first).to_vec();

    while medoids.len() < k {
        let mut best: Option<(f64, usize)> = None;
        for c in (0..n).filter(|&c| !is_medoid[c]) {
            let gain: f64 = (0..n).map(|j| (near[j] - d[[j, c]]).max(0.0)).sum();
            if best.map_or(true, |(g, _)| gain > g) {
                best = Some((gain, c));
            }
        }
        // k < n guarantees a remaining candidate.
        let Some((_, c)) = best else { break };
        medoids.push(c);
        is_medoid[c] = true;
        for j in 0..n {
            near[j] = near[j].min(d[[j, c]]);
        }
    }

    medoids.sort_unstable();
    medoids
}

/// Most improving exchange as `(delta, medoid position, candidate)`.
fn best_swap(
    d: ArrayView2<'_, f64>,
    medoids: &[usize],
    assignment: &Assignment,
) -> Option<(f64, usize, usize)> {
    let n = d.nrows();
    let mut best: Option<(f64, usize, usize)> = None;
    for pos in 0..medoids.len() {
        for h in (0..n).filter(|h| !medoids.contains(h)) {
            let delta: f64 = (0..n)
                .map(|j| {
                    let dh = d[[j, h]];
                    let replaced = if assignment.nearest[j] == pos {
                        assignment.second[j].min(dh)
                    } else {
                        assignment.near[j].min(dh)
                    };
                    replaced - assignment.near[j]
                })
                .sum();
            if best.map_or(true, |(b, _, _)| delta < b) {
                best = Some((delta, pos, h));
            }
        }
    }
    best
}
