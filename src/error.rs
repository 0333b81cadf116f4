use core::fmt;

/// Result alias for `meld`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by graph construction, fusion, partitioning and scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Sample count or matrix size mismatch.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Shape mismatch (string description).
    ShapeMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// Two sources disagree on the sample identifier at some position.
    SampleMismatch {
        /// Row position of the first disagreement.
        position: usize,
        /// Identifier in the canonical order.
        expected: String,
        /// Identifier found in the offending source.
        found: String,
    },

    /// A sample identifier occurs more than once.
    DuplicateSample(String),

    /// A source name occurs more than once.
    DuplicateSource(String),

    /// Invalid number of clusters requested.
    InvalidClusterCount {
        /// Requested count.
        requested: usize,
        /// Number of items.
        n_items: usize,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: String,
    },

    /// A matrix entry is NaN, infinite, or negative where that is not allowed.
    InvalidValue {
        /// Row of the entry.
        row: usize,
        /// Column of the entry.
        col: usize,
        /// Offending value.
        value: f64,
    },

    /// Degenerate matrix with no safe fallback.
    Numerical(String),

    /// An iterative step exhausted its iteration cap.
    NonConvergence {
        /// Number of iterations attempted.
        iterations: usize,
    },
}

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inputs disagree on sample count or order.
    DimensionMismatch,
    /// A parameter or entry is out of its valid range.
    InvalidInput,
    /// Degenerate matrix (zero local scale, isolated node, ...).
    Numerical,
    /// Iteration cap reached without stabilising.
    NonConvergence,
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DimensionMismatch { .. }
            | Error::ShapeMismatch { .. }
            | Error::SampleMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::EmptyInput
            | Error::DuplicateSample(_)
            | Error::DuplicateSource(_)
            | Error::InvalidClusterCount { .. }
            | Error::InvalidParameter { .. }
            | Error::InvalidValue { .. } => ErrorKind::InvalidInput,
            Error::Numerical(_) => ErrorKind::Numerical,
            Error::NonConvergence { .. } => ErrorKind::NonConvergence,
        }
    }

    pub(crate) fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::ShapeMismatch { expected, actual } => {
                write!(f, "shape mismatch: expected {expected}, actual {actual}")
            }
            Error::SampleMismatch {
                position,
                expected,
                found,
            } => write!(
                f,
                "sample order mismatch at row {position}: expected '{expected}', found '{found}'"
            ),
            Error::DuplicateSample(id) => write!(f, "duplicate sample identifier '{id}'"),
            Error::DuplicateSource(name) => write!(f, "duplicate source name '{name}'"),
            Error::InvalidClusterCount { requested, n_items } => {
                write!(f, "cannot create {requested} clusters from {n_items} items")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::InvalidValue { row, col, value } => {
                write!(f, "invalid value {value} at ({row}, {col})")
            }
            Error::Numerical(msg) => write!(f, "numerical error: {msg}"),
            Error::NonConvergence { iterations } => {
                write!(f, "did not converge after {iterations} iterations")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::DimensionMismatch {
                expected: 3,
                found: 4
            }
            .kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(
            Error::InvalidClusterCount {
                requested: 5,
                n_items: 3
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            Error::Numerical("zero degree".into()).kind(),
            ErrorKind::Numerical
        );
        assert_eq!(
            Error::NonConvergence { iterations: 10 }.kind(),
            ErrorKind::NonConvergence
        );
    }

    #[test]
    fn test_display_names_parameter() {
        let e = Error::invalid_parameter("k", "must be positive");
        assert_eq!(e.to_string(), "invalid parameter 'k': must be positive");
    }
}
