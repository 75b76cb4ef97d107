use ldla_sparse::SparseError;
use thiserror::Error;

pub type ApproxResult<T> = Result<T, ApproxError>;

/// Errors detected before any elimination work starts.
///
/// Violated internal invariants during the sweep (non-finite pivots, broken
/// solver postconditions) are defects and panic instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApproxError {
    #[error("expected square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("diagonal entry {index} has non-zero imaginary part {imaginary}")]
    ComplexDiagonal { index: usize, imaginary: f64 },
    #[error("{name} must be a scalar or have length {expected}, got length {actual}")]
    BoundWrongShape {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{name} has inadmissible value {value}")]
    BoundNotFinite { name: &'static str, value: f64 },
    #[error("{name} must be at least {minimum}, got {value}")]
    BoundBelowMinimum {
        name: &'static str,
        minimum: f64,
        value: f64,
    },
    #[error("inconsistent bounds: lower bound {lower} exceeds upper bound {upper}")]
    InconsistentBounds { lower: f64, upper: f64 },
    #[error("unsupported option: {message}")]
    UnsupportedOption { message: String },
    #[error("matrix entry ({row}, {col}) is not finite")]
    NonFiniteInput { row: usize, col: usize },
    #[error("matrix is not Hermitian: entries ({row}, {col}) and ({col}, {row}) are not conjugate")]
    NotHermitian { row: usize, col: usize },
    #[error(transparent)]
    Sparse(#[from] SparseError),
}

impl ApproxError {
    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOption {
            message: message.into(),
        }
    }
}
