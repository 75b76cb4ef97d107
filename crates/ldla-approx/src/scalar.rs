//! Element types: the scalars the elimination runs in, and the input types
//! that are promoted to them.

use std::borrow::Cow;

use ldla_sparse::{CscMatrix, CsrMatrix, SparseElement};
use nalgebra::{Complex, ComplexField, DMatrix};

use crate::error::ApproxResult;
use crate::storage::HermitianStorage;

/// Scalar type of a factor, a perturbed matrix and the elimination itself.
///
/// Implemented for `f64` and `Complex<f64>`; all bound arithmetic is in `f64`.
pub trait HermitianScalar: ComplexField<RealField = f64> + SparseElement {}

impl HermitianScalar for f64 {}

impl HermitianScalar for Complex<f64> {}

/// Element type accepted as input.
///
/// Integer matrices are promoted to `f64`. They cannot be reused in place
/// because their storage cannot hold the factor.
pub trait InputScalar: SparseElement {
    type Promoted: HermitianScalar;

    fn promote(self) -> Self::Promoted;

    /// Read-only access to `storage` in the promoted type, copying only when
    /// the element type differs.
    fn promoted(
        storage: &HermitianStorage<Self>,
    ) -> ApproxResult<Cow<'_, HermitianStorage<Self::Promoted>>>;

    /// Hand over owned storage for in-place use, or give it back if this type
    /// cannot hold the result.
    fn reuse(
        storage: HermitianStorage<Self>,
    ) -> Result<HermitianStorage<Self::Promoted>, HermitianStorage<Self>>;
}

impl InputScalar for f64 {
    type Promoted = f64;

    fn promote(self) -> f64 {
        self
    }

    fn promoted(
        storage: &HermitianStorage<f64>,
    ) -> ApproxResult<Cow<'_, HermitianStorage<f64>>> {
        Ok(Cow::Borrowed(storage))
    }

    fn reuse(
        storage: HermitianStorage<f64>,
    ) -> Result<HermitianStorage<f64>, HermitianStorage<f64>> {
        Ok(storage)
    }
}

impl InputScalar for Complex<f64> {
    type Promoted = Complex<f64>;

    fn promote(self) -> Complex<f64> {
        self
    }

    fn promoted(
        storage: &HermitianStorage<Complex<f64>>,
    ) -> ApproxResult<Cow<'_, HermitianStorage<Complex<f64>>>> {
        Ok(Cow::Borrowed(storage))
    }

    fn reuse(
        storage: HermitianStorage<Complex<f64>>,
    ) -> Result<HermitianStorage<Complex<f64>>, HermitianStorage<Complex<f64>>> {
        Ok(storage)
    }
}

macro_rules! integer_input {
    ($($int:ty),*) => {$(
        impl InputScalar for $int {
            type Promoted = f64;

            fn promote(self) -> f64 {
                self as f64
            }

            fn promoted(
                storage: &HermitianStorage<$int>,
            ) -> ApproxResult<Cow<'_, HermitianStorage<f64>>> {
                promote_storage(storage).map(Cow::Owned)
            }

            fn reuse(
                storage: HermitianStorage<$int>,
            ) -> Result<HermitianStorage<f64>, HermitianStorage<$int>> {
                Err(storage)
            }
        }
    )*};
}

integer_input!(i32, i64);

/// Copy `storage` into the promoted element type, keeping its format.
fn promote_storage<E: InputScalar>(
    storage: &HermitianStorage<E>,
) -> ApproxResult<HermitianStorage<E::Promoted>> {
    Ok(match storage {
        HermitianStorage::Dense(matrix) => HermitianStorage::Dense(promote_dense(matrix)),
        HermitianStorage::Csr(csr) => HermitianStorage::Csr(CsrMatrix::from_components(
            csr.shape(),
            csr.data().iter().map(|&v| v.promote()).collect(),
            csr.indices().to_vec(),
            csr.indptr().to_vec(),
            false,
        )?),
        HermitianStorage::Csc(csc) => HermitianStorage::Csc(CscMatrix::from_components(
            csc.shape(),
            csc.data().iter().map(|&v| v.promote()).collect(),
            csc.indices().to_vec(),
            csc.indptr().to_vec(),
            false,
        )?),
    })
}

fn promote_dense<E: InputScalar>(matrix: &DMatrix<E>) -> DMatrix<E::Promoted> {
    matrix.map(|v| v.promote())
}
