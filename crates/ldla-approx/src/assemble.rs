//! Assembly of the approximation `B = P^T L D L^H P` without forming the product.
//!
//! With `q` the inverse permutation and `(a, b)` the pair `(i, j)` ordered so
//! that `q[a] < q[b]`, an off-diagonal entry is `A[i,j] * omega[b]` when the
//! earlier pivot `d[q[a]]` is non-zero, and otherwise the partial product of
//! factor rows `q[i]` and `q[j]` over the columns before `q[a]`. The diagonal
//! is `A[i,i] + delta[i]`, clamped into the diagonal bounds.

use crate::elimination::Sweep;
use crate::permutation::invert_permutation;
use crate::scalar::HermitianScalar;
use crate::validation::ValidatedBounds;
use crate::view::{MatrixRead, MatrixView};

/// Relative and absolute slack allowed between `A[i,i] + delta[i]` and its clamp.
const CLAMP_RTOL: f64 = 1e-5;
const CLAMP_ATOL: f64 = 1e-8;

fn diagonal_value<T: HermitianScalar>(
    index: usize,
    gamma: &[f64],
    sweep: &Sweep,
    bounds: &ValidatedBounds,
) -> T {
    let unclamped = gamma[index] + sweep.delta[index];
    let value = bounds.clamp_diag(index, unclamped);
    debug_assert!(
        !unclamped.is_finite()
            || (unclamped - value).abs() <= CLAMP_ATOL + CLAMP_RTOL * value.abs(),
        "diagonal {index} = {unclamped} is far outside its bounds (clamped to {value})"
    );
    assert!(value.is_finite(), "non-finite diagonal entry {index}");
    T::from_real(value)
}

fn off_diagonal_value<T, F>(
    i: usize,
    j: usize,
    a_ij: T,
    factor: &F,
    sweep: &Sweep,
    inverse: &[usize],
) -> T
where
    T: HermitianScalar,
    F: MatrixView<T> + ?Sized,
{
    let (first, second) = if inverse[i] < inverse[j] { (i, j) } else { (j, i) };
    let value = if sweep.d[inverse[first]] != 0.0 {
        a_ij.scale(sweep.omega[second])
    } else {
        factor.weighted_row_dot(inverse[i], inverse[j], inverse[first], &sweep.d)
    };
    assert!(value.is_finite(), "non-finite entry ({i}, {j})");
    value
}

/// Write `B` into the empty `output`, reading `A` from `source` and the strict
/// lower factor from `factor`.
pub(crate) fn assemble_separate<T, F, O>(
    source: &dyn MatrixRead<T>,
    factor: &F,
    sweep: &Sweep,
    gamma: &[f64],
    bounds: &ValidatedBounds,
    output: &mut O,
) where
    T: HermitianScalar,
    F: MatrixView<T>,
    O: MatrixView<T>,
{
    let n = gamma.len();
    let inverse = invert_permutation(&sweep.permutation);
    for i in 0..n {
        output.set(i, i, diagonal_value(i, gamma, sweep, bounds));
        for j in (i + 1)..n {
            let value = off_diagonal_value(i, j, source.entry(i, j), factor, sweep, &inverse);
            output.set(i, j, value);
            output.set(j, i, value.conjugate());
        }
    }
}

/// Overwrite shared storage with `B`.
///
/// The storage holds `A` in its upper triangle and the factor in its strict
/// lower triangle. The first pass replaces the upper triangle and the
/// diagonal, reading each upper entry just before it is replaced. The second
/// pass mirrors the upper triangle over the factor.
pub(crate) fn assemble_shared<T, V>(
    storage: &mut V,
    sweep: &Sweep,
    gamma: &[f64],
    bounds: &ValidatedBounds,
) where
    T: HermitianScalar,
    V: MatrixView<T>,
{
    let n = gamma.len();
    let inverse = invert_permutation(&sweep.permutation);
    for i in 0..n {
        storage.set(i, i, diagonal_value(i, gamma, sweep, bounds));
        for j in (i + 1)..n {
            let a_ij = storage.entry(i, j);
            let value = off_diagonal_value(i, j, a_ij, &*storage, sweep, &inverse);
            storage.set(i, j, value);
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let value = storage.entry(i, j);
            storage.set(j, i, value.conjugate());
        }
    }
}
