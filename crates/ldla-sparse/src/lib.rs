#![forbid(unsafe_code)]

//! Sparse storage for Hermitian LDL approximation.
//!
//! Compressed formats (`CsrMatrix`, `CscMatrix`), triplets (`CooMatrix`) and
//! the row-list working format `LilMatrix`, all generic over the element
//! type so that real, complex and integer inputs share one code path.

pub mod construct;
pub mod formats;
pub mod ops;

pub use construct::{random_hermitian, random_hermitian_complex};
pub use formats::{
    CanonicalMeta, CooMatrix, CscMatrix, CsrMatrix, LilMatrix, Shape2D, SparseElement,
    SparseError, SparseFormat, SparseResult,
};
pub use ops::{DenseBridge, FormatConvertible};
