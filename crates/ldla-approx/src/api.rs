//! Public entry points.
//!
//! Every operation validates its input completely before the sweep starts, so
//! an error never leaves a transferred matrix half overwritten.

use std::borrow::Cow;

use ldla_runtime::{PivotEvidenceLedger, RuntimeMode};
use ldla_sparse::{LilMatrix, Shape2D};
use nalgebra::DMatrix;

use crate::assemble::{assemble_separate, assemble_shared};
use crate::decomposition::{Decomposition, DecompositionType, FactorMatrix, LdlDecomposition};
use crate::elimination::{EliminationEngine, EntrySource, Sweep};
use crate::error::{ApproxError, ApproxResult};
use crate::permutation::PermutationMethod;
use crate::scalar::{HermitianScalar, InputScalar};
use crate::storage::{HermitianStorage, InputMatrix};
use crate::validation::{
    BoundValue, EPS, ValidatedBounds, check_entries, check_square, real_diagonal, validate_bounds,
};
use crate::view::MatrixView;

#[derive(Debug, Clone, PartialEq)]
pub struct ApproximationOptions {
    pub mode: RuntimeMode,
    pub min_diag_b: Option<BoundValue>,
    pub max_diag_b: Option<BoundValue>,
    pub min_diag_d: Option<f64>,
    pub max_diag_d: Option<f64>,
    pub min_abs_value_d: Option<f64>,
    pub permutation: PermutationMethod,
    /// Leave the diagonal and upper triangle of a returned factor empty.
    pub strict_lower_only: bool,
}

impl Default for ApproximationOptions {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Strict,
            min_diag_b: None,
            max_diag_b: None,
            min_diag_d: None,
            max_diag_d: None,
            min_abs_value_d: None,
            permutation: PermutationMethod::default(),
            strict_lower_only: false,
        }
    }
}

impl ApproximationOptions {
    /// Apply defaults and check the bounds for an `n x n` matrix.
    pub fn validate(&self, n: usize) -> ApproxResult<ValidatedBounds> {
        validate_bounds(
            n,
            self.min_diag_b.as_ref(),
            self.max_diag_b.as_ref(),
            self.min_diag_d,
            self.max_diag_d,
            self.min_abs_value_d,
            self.mode,
        )
    }
}

/// Matrix storage after the ownership decision.
enum Working<'a, T: Clone> {
    /// Read-only input; results go to fresh storage.
    Separate(Cow<'a, HermitianStorage<T>>),
    /// Transferred input; results are built inside it.
    InPlace(HermitianStorage<T>),
}

impl<T: HermitianScalar> Working<'_, T> {
    fn storage(&self) -> &HermitianStorage<T> {
        match self {
            Self::Separate(storage) => storage,
            Self::InPlace(storage) => storage,
        }
    }
}

struct Prepared {
    bounds: ValidatedBounds,
    gamma: Vec<f64>,
    order: Vec<usize>,
}

fn prepare<'a, E: InputScalar>(
    input: InputMatrix<'a, E>,
    options: &ApproximationOptions,
) -> ApproxResult<(Working<'a, E::Promoted>, Prepared)> {
    let n = check_square(input.storage())?;
    let bounds = options.validate(n)?;
    let working = match input {
        InputMatrix::Borrowed(storage) => Working::Separate(E::promoted(storage)?),
        InputMatrix::Owned(storage) => Working::InPlace(E::reuse(storage).map_err(|_| {
            ApproxError::unsupported(
                "integer storage cannot be reused in place; pass the matrix by reference",
            )
        })?),
    };
    let storage = working.storage();
    let gamma = real_diagonal(storage, n)?;
    if bounds.mode.checks_entries() {
        check_entries(storage)?;
    }
    let order = options.permutation.initial_order(&gamma)?;
    Ok((
        working,
        Prepared {
            bounds,
            gamma,
            order,
        },
    ))
}

fn run_sweep<T, V>(
    factor: &mut V,
    source: EntrySource<'_, T>,
    prepared: &Prepared,
    options: &ApproximationOptions,
    strict_lower_only: bool,
    evidence: Option<&mut PivotEvidenceLedger>,
) -> Sweep
where
    T: HermitianScalar,
    V: MatrixView<T>,
{
    EliminationEngine::new(
        factor,
        source,
        &prepared.bounds,
        &prepared.gamma,
        &options.permutation,
        prepared.order.clone(),
        strict_lower_only,
    )
    .run(evidence)
}

fn package<T>(l: FactorMatrix<T>, sweep: Sweep) -> LdlDecomposition<T> {
    LdlDecomposition {
        l,
        d: sweep.d,
        p: sweep.permutation,
        omega: sweep.omega,
        delta: sweep.delta,
    }
}

fn decompose<T: HermitianScalar>(
    working: Working<'_, T>,
    prepared: &Prepared,
    options: &ApproximationOptions,
    evidence: Option<&mut PivotEvidenceLedger>,
) -> LdlDecomposition<T> {
    let strict = options.strict_lower_only;
    match working {
        // A strict-lower factor cannot share storage: the shared upper triangle would remain.
        Working::InPlace(storage) if strict => {
            decompose_separate(&storage, prepared, options, evidence)
        }
        Working::InPlace(HermitianStorage::Dense(mut matrix)) => {
            let sweep = run_sweep::<T, _>(
                &mut matrix,
                EntrySource::Shared,
                prepared,
                options,
                false,
                evidence,
            );
            package(FactorMatrix::Dense(matrix), sweep)
        }
        Working::InPlace(HermitianStorage::Csr(csr)) => {
            let mut rows = LilMatrix::from_csr(csr);
            let sweep = run_sweep::<T, _>(
                &mut rows,
                EntrySource::Shared,
                prepared,
                options,
                false,
                evidence,
            );
            package(FactorMatrix::Sparse(rows.to_csr()), sweep)
        }
        Working::InPlace(HermitianStorage::Csc(csc)) => {
            let mut rows = LilMatrix::from_csc(&csc);
            drop(csc);
            let sweep = run_sweep::<T, _>(
                &mut rows,
                EntrySource::Shared,
                prepared,
                options,
                false,
                evidence,
            );
            package(FactorMatrix::Sparse(rows.to_csr()), sweep)
        }
        Working::Separate(storage) => decompose_separate(&storage, prepared, options, evidence),
    }
}

fn decompose_separate<T: HermitianScalar>(
    storage: &HermitianStorage<T>,
    prepared: &Prepared,
    options: &ApproximationOptions,
    evidence: Option<&mut PivotEvidenceLedger>,
) -> LdlDecomposition<T> {
    let n = prepared.gamma.len();
    let strict = options.strict_lower_only;
    match storage {
        HermitianStorage::Dense(matrix) => {
            let mut factor = DMatrix::<T>::zeros(n, n);
            let sweep = run_sweep::<T, _>(
                &mut factor,
                EntrySource::Separate(matrix),
                prepared,
                options,
                strict,
                evidence,
            );
            package(FactorMatrix::Dense(factor), sweep)
        }
        HermitianStorage::Csr(_) | HermitianStorage::Csc(_) => {
            let mut factor = LilMatrix::new(Shape2D::new(n, n));
            let sweep = run_sweep::<T, _>(
                &mut factor,
                EntrySource::Separate(storage),
                prepared,
                options,
                strict,
                evidence,
            );
            package(FactorMatrix::Sparse(factor.to_csr()), sweep)
        }
    }
}

fn approximate<T: HermitianScalar>(
    working: Working<'_, T>,
    prepared: &Prepared,
    options: &ApproximationOptions,
    evidence: Option<&mut PivotEvidenceLedger>,
) -> HermitianStorage<T> {
    let n = prepared.gamma.len();
    let (bounds, gamma) = (&prepared.bounds, prepared.gamma.as_slice());
    match working {
        Working::InPlace(HermitianStorage::Dense(mut matrix)) => {
            let sweep = run_sweep::<T, _>(
                &mut matrix,
                EntrySource::Shared,
                prepared,
                options,
                true,
                evidence,
            );
            assemble_shared::<T, _>(&mut matrix, &sweep, gamma, bounds);
            HermitianStorage::Dense(matrix)
        }
        Working::InPlace(HermitianStorage::Csr(csr)) => {
            let mut rows = LilMatrix::from_csr(csr);
            let sweep = run_sweep::<T, _>(
                &mut rows,
                EntrySource::Shared,
                prepared,
                options,
                true,
                evidence,
            );
            assemble_shared::<T, _>(&mut rows, &sweep, gamma, bounds);
            HermitianStorage::Csr(rows.to_csr())
        }
        Working::InPlace(HermitianStorage::Csc(csc)) => {
            let mut rows = LilMatrix::from_csc(&csc);
            drop(csc);
            let sweep = run_sweep::<T, _>(
                &mut rows,
                EntrySource::Shared,
                prepared,
                options,
                true,
                evidence,
            );
            assemble_shared::<T, _>(&mut rows, &sweep, gamma, bounds);
            HermitianStorage::Csc(rows.to_csc())
        }
        Working::Separate(storage) => match &*storage {
            HermitianStorage::Dense(matrix) => {
                let mut factor = DMatrix::<T>::zeros(n, n);
                let sweep = run_sweep::<T, _>(
                    &mut factor,
                    EntrySource::Separate(matrix),
                    prepared,
                    options,
                    true,
                    evidence,
                );
                let mut output = DMatrix::<T>::zeros(n, n);
                assemble_separate::<T, _, _>(matrix, &factor, &sweep, gamma, bounds, &mut output);
                HermitianStorage::Dense(output)
            }
            sparse => {
                let mut factor = LilMatrix::new(Shape2D::new(n, n));
                let sweep = run_sweep::<T, _>(
                    &mut factor,
                    EntrySource::Separate(sparse),
                    prepared,
                    options,
                    true,
                    evidence,
                );
                let mut output = LilMatrix::new(Shape2D::new(n, n));
                assemble_separate::<T, _, _>(sparse, &factor, &sweep, gamma, bounds, &mut output);
                match sparse {
                    HermitianStorage::Csc(_) => HermitianStorage::Csc(output.to_csc()),
                    _ => HermitianStorage::Csr(output.to_csr()),
                }
            }
        },
    }
}

/// Approximate LDL decomposition of `input`.
///
/// The result factors a matrix `B` close to `input` whose diagonal and pivots
/// satisfy the bounds in `options`. If `input` already admits such a
/// decomposition, `B` equals `input` up to rounding.
pub fn decomposition<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
) -> ApproxResult<LdlDecomposition<E::Promoted>> {
    let (working, prepared) = prepare(input.into(), options)?;
    Ok(decompose(working, &prepared, options, None))
}

/// [`decomposition`], recording every elimination step in `evidence`.
pub fn decomposition_with_evidence<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
    evidence: &mut PivotEvidenceLedger,
) -> ApproxResult<LdlDecomposition<E::Promoted>> {
    let (working, prepared) = prepare(input.into(), options)?;
    Ok(decompose(working, &prepared, options, Some(evidence)))
}

/// [`decomposition`] in the layout `kind`.
pub fn decomposition_as<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
    kind: DecompositionType,
) -> ApproxResult<Decomposition<E::Promoted>> {
    let (working, prepared) = prepare(input.into(), options)?;
    decompose(working, &prepared, options, None).as_type(kind)
}

/// A matrix close to `input` that has an LDL decomposition within the bounds
/// of `options`, in the storage format of `input`.
///
/// With [`InputMatrix::Owned`] the result is built inside the transferred storage.
pub fn approximate_matrix<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
) -> ApproxResult<HermitianStorage<E::Promoted>> {
    let (working, prepared) = prepare(input.into(), options)?;
    Ok(approximate(working, &prepared, options, None))
}

/// [`approximate_matrix`], recording every elimination step in `evidence`.
pub fn approximate_matrix_with_evidence<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
    evidence: &mut PivotEvidenceLedger,
) -> ApproxResult<HermitianStorage<E::Promoted>> {
    let (working, prepared) = prepare(input.into(), options)?;
    Ok(approximate(working, &prepared, options, Some(evidence)))
}

/// Positive semidefinite approximation: [`approximate_matrix`] with the
/// default `min_diag_d = 0`.
pub fn positive_semidefinite_matrix<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
) -> ApproxResult<HermitianStorage<E::Promoted>> {
    approximate_matrix(input, options)
}

/// Positive definite approximation: every pivot is at least `min_diag_d`,
/// which defaults to `sqrt(eps)` and must be positive.
pub fn positive_definite_matrix<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
) -> ApproxResult<HermitianStorage<E::Promoted>> {
    approximate_matrix(input, &positive_definite_options(options)?)
}

/// [`positive_definite_matrix`], recording every elimination step in `evidence`.
pub fn positive_definite_matrix_with_evidence<'a, E: InputScalar>(
    input: impl Into<InputMatrix<'a, E>>,
    options: &ApproximationOptions,
    evidence: &mut PivotEvidenceLedger,
) -> ApproxResult<HermitianStorage<E::Promoted>> {
    approximate_matrix_with_evidence(input, &positive_definite_options(options)?, evidence)
}

fn positive_definite_options(options: &ApproximationOptions) -> ApproxResult<ApproximationOptions> {
    let min_diag_d = match options.min_diag_d {
        None => EPS.sqrt(),
        Some(value) if value > 0.0 => value,
        Some(value) => {
            return Err(ApproxError::unsupported(format!(
                "positive definite approximation needs min_diag_d > 0, got {value}"
            )));
        }
    };
    Ok(ApproximationOptions {
        min_diag_d: Some(min_diag_d),
        ..options.clone()
    })
}
