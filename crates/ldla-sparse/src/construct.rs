use nalgebra::Complex;

use crate::formats::{CooMatrix, CsrMatrix, Shape2D, SparseElement, SparseError, SparseResult};
use crate::ops::FormatConvertible;

/// Random real symmetric `n x n` matrix in CSR form.
///
/// Off-diagonal pairs are drawn with probability `density` and mirrored;
/// every diagonal entry is stored, drawn uniformly from `[-1, 1]`. The stream
/// is a deterministic xorshift64 sequence seeded by `seed`.
pub fn random_hermitian(n: usize, density: f64, seed: u64) -> SparseResult<CsrMatrix<f64>> {
    let samples = hermitian_samples(n, density, seed)?;
    let (rows, cols, data) = mirror(samples, |re, _| re, |v| v);
    CooMatrix::from_triplets(Shape2D::new(n, n), data, rows, cols, true)?.to_csr()
}

/// Random complex Hermitian `n x n` matrix in CSR form with a real diagonal.
pub fn random_hermitian_complex(
    n: usize,
    density: f64,
    seed: u64,
) -> SparseResult<CsrMatrix<Complex<f64>>> {
    let samples = hermitian_samples(n, density, seed)?;
    let (rows, cols, data) = mirror(samples, Complex::new, |v: Complex<f64>| v.conj());
    CooMatrix::from_triplets(Shape2D::new(n, n), data, rows, cols, true)?.to_csr()
}

/// Upper-triangle samples `(row, col, re, im)` with `row <= col`; `im = 0` on the diagonal.
fn hermitian_samples(
    n: usize,
    density: f64,
    seed: u64,
) -> SparseResult<Vec<(usize, usize, f64, f64)>> {
    if !(0.0..=1.0).contains(&density) {
        return Err(SparseError::InvalidArgument {
            message: "density must be in [0.0, 1.0]".to_string(),
        });
    }
    n.checked_mul(n).ok_or_else(|| SparseError::IndexOverflow {
        message: "n * n overflows usize".to_string(),
    })?;

    let mut state = seed.max(1);
    let mut uniform = move || {
        state = xorshift64(state);
        ((state as f64) / (u64::MAX as f64)) * 2.0 - 1.0
    };

    let mut samples = Vec::new();
    for row in 0..n {
        samples.push((row, row, uniform(), 0.0));
        for col in row + 1..n {
            if (uniform() + 1.0) * 0.5 <= density {
                samples.push((row, col, uniform(), uniform()));
            }
        }
    }
    Ok(samples)
}

fn mirror<T: SparseElement>(
    samples: Vec<(usize, usize, f64, f64)>,
    make: impl Fn(f64, f64) -> T,
    conj: impl Fn(T) -> T,
) -> (Vec<usize>, Vec<usize>, Vec<T>) {
    let mut rows = Vec::with_capacity(2 * samples.len());
    let mut cols = Vec::with_capacity(2 * samples.len());
    let mut data = Vec::with_capacity(2 * samples.len());
    for (row, col, re, im) in samples {
        let value = make(re, im);
        rows.push(row);
        cols.push(col);
        data.push(value);
        if row != col {
            rows.push(col);
            cols.push(row);
            data.push(conj(value));
        }
    }
    (rows, cols, data)
}

fn xorshift64(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}
