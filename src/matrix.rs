//! Matrix types flowing through the fusion pipeline.
//!
//! ```text
//! SampleFeatureMatrix (n × p) ──► AffinityMatrix (n × n) ──► DistanceMatrix (n × n)
//! ```
//!
//! All three wrap an `ndarray::Array2<f64>`. Constructors validate the
//! invariants once so the algorithms downstream can index without rechecking:
//!
//! | Type | Shape | Entries | Symmetric |
//! |------|-------|---------|-----------|
//! | [`SampleFeatureMatrix`] | n × p, one row per sample | finite | n/a |
//! | [`AffinityMatrix`] | n × n | finite, ≥ 0, larger = more similar | yes (1e-9) |
//! | [`DistanceMatrix`] | n × n | finite, ≥ 0, zero diagonal | yes (1e-9) |

use std::collections::HashSet;

use ndarray::{Array2, ArrayView2, Axis};

use crate::error::{Error, Result};

/// Tolerance used when checking symmetry of square matrices.
pub const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Per-sample feature measurements from one source.
///
/// Rows are samples in a fixed canonical order, columns are features.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFeatureMatrix {
    sample_ids: Vec<String>,
    values: Array2<f64>,
}

impl SampleFeatureMatrix {
    /// Create a matrix from sample identifiers and an `n × p` value array.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`] if there are no samples or no features.
    /// - [`Error::DimensionMismatch`] if `sample_ids.len() != values.nrows()`.
    /// - [`Error::DuplicateSample`] if an identifier repeats.
    /// - [`Error::InvalidValue`] on NaN or infinite entries.
    pub fn new<S: Into<String>>(sample_ids: Vec<S>, values: Array2<f64>) -> Result<Self> {
        let sample_ids: Vec<String> = sample_ids.into_iter().map(Into::into).collect();
        if values.nrows() == 0 || values.ncols() == 0 {
            return Err(Error::EmptyInput);
        }
        if sample_ids.len() != values.nrows() {
            return Err(Error::DimensionMismatch {
                expected: values.nrows(),
                found: sample_ids.len(),
            });
        }

        let mut seen = HashSet::with_capacity(sample_ids.len());
        for id in &sample_ids {
            if !seen.insert(id.as_str()) {
                return Err(Error::DuplicateSample(id.clone()));
            }
        }

        check_finite(values.view())?;
        Ok(Self { sample_ids, values })
    }

    /// Create a matrix from row vectors.
    pub fn from_rows<S: Into<String>>(sample_ids: Vec<S>, rows: &[Vec<f64>]) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyInput);
        }
        let d = rows[0].len();
        let mut flat = Vec::with_capacity(rows.len() * d);
        for row in rows {
            if row.len() != d {
                return Err(Error::DimensionMismatch {
                    expected: d,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        let values = Array2::from_shape_vec((rows.len(), d), flat)
            .map_err(|e| Error::Numerical(e.to_string()))?;
        Self::new(sample_ids, values)
    }

    /// Number of samples (rows).
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Number of features (columns).
    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Sample identifiers in row order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Underlying values.
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}

/// Symmetric, nonnegative similarity over samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AffinityMatrix {
    inner: Array2<f64>,
}

impl AffinityMatrix {
    /// Wrap a square array, validating squareness, finiteness, non-negativity
    /// and symmetry.
    pub fn new(values: Array2<f64>) -> Result<Self> {
        check_square_nonnegative(values.view())?;
        check_symmetric(values.view())?;
        Ok(Self { inner: values })
    }

    /// Wrap an array already known to satisfy the invariants.
    pub(crate) fn from_array(values: Array2<f64>) -> Self {
        debug_assert!(values.is_square());
        Self { inner: values }
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.inner.nrows()
    }

    /// Entry `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner[[i, j]]
    }

    /// View of the values.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.inner.view()
    }

    /// Consume and return the values.
    pub fn into_inner(self) -> Array2<f64> {
        self.inner
    }

    /// Row sums.
    pub fn degrees(&self) -> Vec<f64> {
        self.inner.sum_axis(Axis(1)).to_vec()
    }

    /// Whether `|A_ij - A_ji| <= tol` for all pairs.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        max_asymmetry(self.inner.view()) <= tol
    }
}

/// Symmetric, nonnegative dissimilarity over samples with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    inner: Array2<f64>,
}

impl DistanceMatrix {
    /// Wrap a square array, validating squareness, finiteness,
    /// non-negativity, symmetry and a zero diagonal.
    pub fn new(values: Array2<f64>) -> Result<Self> {
        check_square_nonnegative(values.view())?;
        check_symmetric(values.view())?;
        for i in 0..values.nrows() {
            let v = values[[i, i]];
            if v != 0.0 {
                return Err(Error::InvalidValue {
                    row: i,
                    col: i,
                    value: v,
                });
            }
        }
        Ok(Self { inner: values })
    }

    pub(crate) fn from_array(values: Array2<f64>) -> Self {
        debug_assert!(values.is_square());
        Self { inner: values }
    }

    /// Number of samples.
    pub fn n(&self) -> usize {
        self.inner.nrows()
    }

    /// Entry `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.inner[[i, j]]
    }

    /// View of the values.
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.inner.view()
    }

    /// Consume and return the values.
    pub fn into_inner(self) -> Array2<f64> {
        self.inner
    }
}

/// `(A + Aᵀ) / 2`.
pub fn symmetrize(a: &Array2<f64>) -> Array2<f64> {
    (a + &a.t()) * 0.5
}

/// Divide every row by its sum. Rows summing to zero become uniform.
///
/// Returns the normalized matrix and the number of rows that needed the
/// uniform fallback.
pub fn row_normalize(a: ArrayView2<'_, f64>) -> (Array2<f64>, usize) {
    let n_cols = a.ncols();
    let mut out = a.to_owned();
    let mut fallbacks = 0;
    for mut row in out.rows_mut() {
        let sum: f64 = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        } else {
            row.fill(1.0 / n_cols as f64);
            fallbacks += 1;
        }
    }
    (out, fallbacks)
}

/// Largest `|A_ij - A_ji|`.
pub(crate) fn max_asymmetry(a: ArrayView2<'_, f64>) -> f64 {
    let n = a.nrows();
    let mut worst = 0.0f64;
    for i in 0..n {
        for j in (i + 1)..n {
            worst = worst.max((a[[i, j]] - a[[j, i]]).abs());
        }
    }
    worst
}

fn check_finite(a: ArrayView2<'_, f64>) -> Result<()> {
    for ((row, col), &value) in a.indexed_iter() {
        if !value.is_finite() {
            return Err(Error::InvalidValue { row, col, value });
        }
    }
    Ok(())
}

fn check_square_nonnegative(a: ArrayView2<'_, f64>) -> Result<()> {
    if a.nrows() == 0 {
        return Err(Error::EmptyInput);
    }
    if !a.is_square() {
        return Err(Error::ShapeMismatch {
            expected: format!("{0}x{0} square matrix", a.nrows()),
            actual: format!("{}x{}", a.nrows(), a.ncols()),
        });
    }
    for ((row, col), &value) in a.indexed_iter() {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidValue { row, col, value });
        }
    }
    Ok(())
}

fn check_symmetric(a: ArrayView2<'_, f64>) -> Result<()> {
    let asym = max_asymmetry(a);
    if asym > SYMMETRY_TOLERANCE {
        return Err(Error::ShapeMismatch {
            expected: "symmetric matrix".into(),
            actual: format!("asymmetry {asym:e}"),
        });
    }
    Ok(())
}
