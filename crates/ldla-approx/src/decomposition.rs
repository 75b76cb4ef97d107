use std::fmt;
use std::str::FromStr;

use ldla_sparse::{CsrMatrix, DenseBridge, LilMatrix};
use nalgebra::DMatrix;

use crate::error::{ApproxError, ApproxResult};
use crate::scalar::HermitianScalar;

/// Storage of a triangular factor. Sparse factors are always CSR.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorMatrix<T> {
    Dense(DMatrix<T>),
    Sparse(CsrMatrix<T>),
}

impl<T: HermitianScalar> FactorMatrix<T> {
    #[must_use]
    pub fn nrows(&self) -> usize {
        match self {
            Self::Dense(matrix) => matrix.nrows(),
            Self::Sparse(csr) => csr.shape().rows,
        }
    }

    #[must_use]
    pub const fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    #[must_use]
    pub fn entry(&self, row: usize, col: usize) -> T {
        match self {
            Self::Dense(matrix) => matrix[(row, col)],
            Self::Sparse(csr) => csr.get(row, col),
        }
    }

    #[must_use]
    pub fn to_dense(&self) -> DMatrix<T> {
        match self {
            Self::Dense(matrix) => matrix.clone(),
            Self::Sparse(csr) => csr.to_dense(),
        }
    }

    /// Copy with the diagonal replaced by `values`.
    #[must_use]
    pub fn with_diagonal(&self, values: &[T]) -> Self {
        match self {
            Self::Dense(matrix) => {
                let mut matrix = matrix.clone();
                for (i, &value) in values.iter().enumerate() {
                    matrix[(i, i)] = value;
                }
                Self::Dense(matrix)
            }
            Self::Sparse(csr) => {
                let mut rows = LilMatrix::from_csr(csr.clone());
                for (i, &value) in values.iter().enumerate() {
                    rows.set(i, i, value);
                }
                Self::Sparse(rows.to_csr())
            }
        }
    }

    /// Copy with column `j` multiplied by `factors[j]`.
    pub fn scale_columns(&self, factors: &[f64]) -> ApproxResult<Self> {
        Ok(match self {
            Self::Dense(matrix) => {
                let mut matrix = matrix.clone();
                for (j, &factor) in factors.iter().enumerate() {
                    for value in matrix.column_mut(j).iter_mut() {
                        *value = value.scale(factor);
                    }
                }
                Self::Dense(matrix)
            }
            Self::Sparse(csr) => {
                let data = csr
                    .data()
                    .iter()
                    .zip(csr.indices())
                    .map(|(value, &col)| value.scale(factors[col]))
                    .collect();
                Self::Sparse(CsrMatrix::from_components(
                    csr.shape(),
                    data,
                    csr.indices().to_vec(),
                    csr.indptr().to_vec(),
                    csr.canonical_meta().is_canonical(),
                )?)
            }
        })
    }
}

/// Return-type tag for [`LdlDecomposition::as_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecompositionType {
    #[default]
    Ldl,
    /// `L` with `D` stored on its diagonal.
    LdlCompressed,
    /// Cholesky-like `L D^(1/2)`.
    Ll,
}

impl DecompositionType {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ldl => "LDL",
            Self::LdlCompressed => "LDL_compressed",
            Self::Ll => "LL",
        }
    }
}

impl fmt::Display for DecompositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DecompositionType {
    type Err = ApproxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Ldl, Self::LdlCompressed, Self::Ll]
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ApproxError::unsupported(format!(
                    "unknown decomposition type '{s}', expected one of LDL, LDL_compressed, LL"
                ))
            })
    }
}

/// `B = P^T L D L^H P`, the factorization of the approximation.
///
/// `l` is unit lower triangular (strictly lower when the sweep was asked for
/// the strict part only; the unit diagonal is then implicit). `d` is in
/// elimination order, `omega` and `delta` are indexed by original index, and
/// `p[i]` is the original index eliminated at step `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct LdlDecomposition<T> {
    pub l: FactorMatrix<T>,
    pub d: Vec<f64>,
    pub p: Vec<usize>,
    pub omega: Vec<f64>,
    pub delta: Vec<f64>,
}

/// A decomposition in one of the [`DecompositionType`] layouts.
#[derive(Debug, Clone, PartialEq)]
pub enum Decomposition<T> {
    Ldl(LdlDecomposition<T>),
    /// `L` with `d` on the diagonal.
    LdlCompressed { ld: FactorMatrix<T>, p: Vec<usize> },
    /// `L diag(sqrt(d))`; requires `d >= 0`.
    Ll { l: FactorMatrix<T>, p: Vec<usize> },
}

impl<T: HermitianScalar> Decomposition<T> {
    #[must_use]
    pub const fn kind(&self) -> DecompositionType {
        match self {
            Self::Ldl(_) => DecompositionType::Ldl,
            Self::LdlCompressed { .. } => DecompositionType::LdlCompressed,
            Self::Ll { .. } => DecompositionType::Ll,
        }
    }

    #[must_use]
    pub fn permutation(&self) -> &[usize] {
        match self {
            Self::Ldl(ldl) => &ldl.p,
            Self::LdlCompressed { p, .. } | Self::Ll { p, .. } => p,
        }
    }

    /// The decomposed matrix as a dense matrix.
    #[must_use]
    pub fn composed_matrix(&self) -> DMatrix<T> {
        match self {
            Self::Ldl(ldl) => ldl.composed_matrix(),
            Self::LdlCompressed { ld, p } => {
                let n = ld.nrows();
                let dense = ld.to_dense();
                let d: Vec<f64> = (0..n).map(|i| dense[(i, i)].real()).collect();
                let mut unit = dense;
                unit.fill_diagonal(T::one());
                permuted(&weighted_gram(&unit, &d), p)
            }
            Self::Ll { l, p } => {
                let dense = l.to_dense();
                permuted(&(&dense * dense.adjoint()), p)
            }
        }
    }
}

impl<T: HermitianScalar> LdlDecomposition<T> {
    #[must_use]
    pub fn n(&self) -> usize {
        self.d.len()
    }

    /// `L` with an explicit unit diagonal.
    #[must_use]
    pub fn unit_lower(&self) -> FactorMatrix<T> {
        self.l.with_diagonal(&vec![T::one(); self.n()])
    }

    pub fn as_type(&self, kind: DecompositionType) -> ApproxResult<Decomposition<T>> {
        Ok(match kind {
            DecompositionType::Ldl => Decomposition::Ldl(self.clone()),
            DecompositionType::LdlCompressed => {
                let diagonal: Vec<T> = self.d.iter().map(|&d| T::from_real(d)).collect();
                Decomposition::LdlCompressed {
                    ld: self.l.with_diagonal(&diagonal),
                    p: self.p.clone(),
                }
            }
            DecompositionType::Ll => {
                if let Some(&negative) = self.d.iter().find(|&&d| d < 0.0) {
                    return Err(ApproxError::unsupported(format!(
                        "LL decomposition needs a non-negative diagonal, found {negative}"
                    )));
                }
                let roots: Vec<f64> = self.d.iter().map(|d| d.sqrt()).collect();
                Decomposition::Ll {
                    l: self.unit_lower().scale_columns(&roots)?,
                    p: self.p.clone(),
                }
            }
        })
    }

    /// `B` with `B[p[i], p[j]] = (L D L^H)[i, j]`.
    #[must_use]
    pub fn composed_matrix(&self) -> DMatrix<T> {
        let unit = self.unit_lower().to_dense();
        permuted(&weighted_gram(&unit, &self.d), &self.p)
    }
}

/// `L diag(d) L^H`.
fn weighted_gram<T: HermitianScalar>(l: &DMatrix<T>, d: &[f64]) -> DMatrix<T> {
    let mut weighted = l.clone();
    for (j, &weight) in d.iter().enumerate() {
        for value in weighted.column_mut(j).iter_mut() {
            *value = value.scale(weight);
        }
    }
    weighted * l.adjoint()
}

fn permuted<T: HermitianScalar>(product: &DMatrix<T>, p: &[usize]) -> DMatrix<T> {
    let n = p.len();
    let mut out = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            out[(p[i], p[j])] = product[(i, j)];
        }
    }
    out
}
