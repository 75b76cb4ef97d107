#![forbid(unsafe_code)]

//! Bounded approximate LDL factorization of Hermitian matrices.
//!
//! Given a Hermitian `A`, the sweep computes a permutation `P`, a unit lower
//! triangular `L` and a real diagonal `D` such that `B = P^T L D L^H P` is
//! close to `A` while every pivot of `D` and every diagonal entry of `B`
//! stays inside caller-supplied bounds. The public entry points return the
//! factorization, the approximation `B`, or a positive (semi)definite
//! approximation. Dense `nalgebra` matrices as well as CSR and CSC matrices
//! from `ldla-sparse` are accepted, in real, complex or integer element types.

mod assemble;
mod elimination;

pub mod api;
pub mod decomposition;
pub mod error;
pub mod permutation;
pub mod pivot;
pub mod scalar;
pub mod storage;
pub mod validation;
pub mod view;

pub use api::{
    ApproximationOptions, approximate_matrix, approximate_matrix_with_evidence, decomposition,
    decomposition_as, decomposition_with_evidence, positive_definite_matrix,
    positive_definite_matrix_with_evidence, positive_semidefinite_matrix,
};
pub use decomposition::{Decomposition, DecompositionType, FactorMatrix, LdlDecomposition};
pub use error::{ApproxError, ApproxResult};
pub use permutation::{PermutationMethod, invert_permutation};
pub use pivot::{PivotBounds, PivotChoice, depressed_cubic_roots, minimal_change, penalty};
pub use scalar::{HermitianScalar, InputScalar};
pub use storage::{HermitianStorage, InputMatrix};
pub use validation::{
    BoundValue, BoundWarning, EPS, HERMITIAN_RTOL, ValidatedBounds, check_entries, check_square,
    real_diagonal, validate_bounds,
};
pub use view::{MatrixRead, MatrixView};
