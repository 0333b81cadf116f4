//! Hard partitioning of fused (or single-source) networks.
//!
//! ## Algorithms
//!
//! ### k-medoids (PAM)
//!
//! Chooses k samples as medoids and assigns every other sample to its nearest
//! medoid, minimizing
//!
//! ```text
//! J = Σ_i min_m D(i, m)
//! ```
//!
//! Works on any [`DistanceMatrix`](crate::DistanceMatrix); no coordinates are
//! needed, which is why it pairs with [`to_distance`](crate::to_distance).
//! Deterministic: BUILD is greedy and SWAP takes the best improving exchange.
//!
//! ### Spectral
//!
//! Embeds samples with the bottom eigenvectors of the normalized Laplacian of
//! an [`AffinityMatrix`](crate::AffinityMatrix) and runs k-means on the
//! embedding. Finds clusters connected through chains of strong affinities.
//! Randomness comes only from k-means seeding.
//!
//! ## Choosing
//!
//! | Algorithm | Input | Deterministic | Cost |
//! |-----------|-------|---------------|------|
//! | [`KMedoids`] | distance | yes | O(k n²) per sweep |
//! | [`SpectralPartitioner`] | affinity | given a seed | O(n³) |

mod kmeans;
mod kmedoids;
pub mod spectral;
mod traits;

pub use kmeans::{Kmeans, KmeansFit};
pub use kmedoids::{k_medoids, KMedoids, KMedoidsFit};
pub use spectral::{normalized_laplacian, spectral_partition, SpectralPartitioner};
pub use traits::Partitioner;
