use ldla_sparse::{CscMatrix, CsrMatrix, DenseBridge, SparseElement};
use nalgebra::DMatrix;

/// A Hermitian matrix in one of the supported storage classes.
///
/// Results of the approximation keep the storage class of their input: a
/// dense matrix yields dense output, CSR yields CSR and CSC yields CSC.
#[derive(Debug, Clone, PartialEq)]
pub enum HermitianStorage<T> {
    Dense(DMatrix<T>),
    Csr(CsrMatrix<T>),
    Csc(CscMatrix<T>),
}

impl<T: SparseElement> HermitianStorage<T> {
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(matrix) => matrix.shape(),
            Self::Csr(csr) => (csr.shape().rows, csr.shape().cols),
            Self::Csc(csc) => (csc.shape().rows, csc.shape().cols),
        }
    }

    #[must_use]
    pub const fn is_sparse(&self) -> bool {
        !matches!(self, Self::Dense(_))
    }

    #[must_use]
    pub const fn format_name(&self) -> &'static str {
        match self {
            Self::Dense(_) => "dense",
            Self::Csr(_) => "csr",
            Self::Csc(_) => "csc",
        }
    }

    #[must_use]
    pub fn to_dense(&self) -> DMatrix<T> {
        match self {
            Self::Dense(matrix) => matrix.clone(),
            Self::Csr(csr) => csr.to_dense(),
            Self::Csc(csc) => csc.to_dense(),
        }
    }
}

impl<T> From<DMatrix<T>> for HermitianStorage<T> {
    fn from(matrix: DMatrix<T>) -> Self {
        Self::Dense(matrix)
    }
}

impl<T> From<CsrMatrix<T>> for HermitianStorage<T> {
    fn from(csr: CsrMatrix<T>) -> Self {
        Self::Csr(csr)
    }
}

impl<T> From<CscMatrix<T>> for HermitianStorage<T> {
    fn from(csc: CscMatrix<T>) -> Self {
        Self::Csc(csc)
    }
}

/// Input handed to the public operations.
///
/// `Owned` transfers the storage to the operation, which may then build its
/// result inside it instead of allocating a second matrix. `Borrowed` never
/// modifies the caller's matrix.
#[derive(Debug)]
pub enum InputMatrix<'a, E> {
    Borrowed(&'a HermitianStorage<E>),
    Owned(HermitianStorage<E>),
}

impl<E> InputMatrix<'_, E> {
    #[must_use]
    pub fn storage(&self) -> &HermitianStorage<E> {
        match self {
            Self::Borrowed(storage) => storage,
            Self::Owned(storage) => storage,
        }
    }
}

impl<'a, E> From<&'a HermitianStorage<E>> for InputMatrix<'a, E> {
    fn from(storage: &'a HermitianStorage<E>) -> Self {
        Self::Borrowed(storage)
    }
}

impl<E> From<HermitianStorage<E>> for InputMatrix<'_, E> {
    fn from(storage: HermitianStorage<E>) -> Self {
        Self::Owned(storage)
    }
}
