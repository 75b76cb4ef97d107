//! Uniform element access over dense and sparse storage.
//!
//! [`MatrixRead`] is what validation and the elimination need from an input
//! matrix. [`MatrixView`] adds the mutations the sweep performs on the factor.
//! It is implemented for the two working formats: dense `DMatrix` and the
//! row-list `LilMatrix`.

use ldla_sparse::{CscMatrix, CsrMatrix, LilMatrix, SparseElement};
use nalgebra::DMatrix;

use crate::scalar::HermitianScalar;
use crate::storage::HermitianStorage;

pub trait MatrixRead<T> {
    fn shape(&self) -> (usize, usize);

    /// Value at `(row, col)`; zero if not stored.
    fn entry(&self, row: usize, col: usize) -> T;

    /// Visit every stored entry. Dense storage visits all `rows * cols` entries.
    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, T));
}

pub trait MatrixView<T: HermitianScalar>: MatrixRead<T> {
    fn set(&mut self, row: usize, col: usize, value: T);

    /// `sum_{k < len} M[a, k] * weights[k] * conj(M[b, k])`.
    fn weighted_row_dot(&self, a: usize, b: usize, len: usize, weights: &[f64]) -> T;

    /// Multiply `M[row, 0..len]` by `factor`, flushing results with modulus
    /// below `threshold` to zero.
    fn scale_row_prefix(&mut self, row: usize, len: usize, factor: f64, threshold: f64);

    /// Exchange `M[a, 0..len]` and `M[b, 0..len]`.
    fn swap_row_prefixes(&mut self, a: usize, b: usize, len: usize);

    fn fill_unit_diagonal(&mut self);

    fn clear_strict_upper(&mut self);
}

/// Read `A[row, col]` of a Hermitian matrix using only the upper triangle
/// (diagonal included) of `storage`.
pub(crate) fn upper_entry<T, M>(storage: &M, row: usize, col: usize) -> T
where
    T: HermitianScalar,
    M: MatrixRead<T> + ?Sized,
{
    if row <= col {
        storage.entry(row, col)
    } else {
        storage.entry(col, row).conjugate()
    }
}

impl<T: SparseElement> MatrixRead<T> for DMatrix<T> {
    fn shape(&self) -> (usize, usize) {
        DMatrix::shape(self)
    }

    fn entry(&self, row: usize, col: usize) -> T {
        self[(row, col)]
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, T)) {
        for col in 0..self.ncols() {
            for row in 0..self.nrows() {
                visit(row, col, self[(row, col)]);
            }
        }
    }
}

impl<T: SparseElement> MatrixRead<T> for CsrMatrix<T> {
    fn shape(&self) -> (usize, usize) {
        let shape = CsrMatrix::shape(self);
        (shape.rows, shape.cols)
    }

    fn entry(&self, row: usize, col: usize) -> T {
        self.get(row, col)
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, T)) {
        for row in 0..CsrMatrix::shape(self).rows {
            let (cols, values) = self.row(row);
            for (&col, &value) in cols.iter().zip(values) {
                visit(row, col, value);
            }
        }
    }
}

impl<T: SparseElement> MatrixRead<T> for CscMatrix<T> {
    fn shape(&self) -> (usize, usize) {
        let shape = CscMatrix::shape(self);
        (shape.rows, shape.cols)
    }

    fn entry(&self, row: usize, col: usize) -> T {
        self.get(row, col)
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, T)) {
        for col in 0..CscMatrix::shape(self).cols {
            let (rows, values) = self.col(col);
            for (&row, &value) in rows.iter().zip(values) {
                visit(row, col, value);
            }
        }
    }
}

impl<T: SparseElement> MatrixRead<T> for LilMatrix<T> {
    fn shape(&self) -> (usize, usize) {
        let shape = LilMatrix::shape(self);
        (shape.rows, shape.cols)
    }

    fn entry(&self, row: usize, col: usize) -> T {
        self.get(row, col)
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, T)) {
        for row in 0..LilMatrix::shape(self).rows {
            let (cols, values) = self.row(row);
            for (&col, &value) in cols.iter().zip(values) {
                visit(row, col, value);
            }
        }
    }
}

impl<T: SparseElement> MatrixRead<T> for HermitianStorage<T> {
    fn shape(&self) -> (usize, usize) {
        HermitianStorage::shape(self)
    }

    fn entry(&self, row: usize, col: usize) -> T {
        match self {
            Self::Dense(matrix) => matrix.entry(row, col),
            Self::Csr(csr) => csr.entry(row, col),
            Self::Csc(csc) => csc.entry(row, col),
        }
    }

    fn for_each_stored(&self, visit: &mut dyn FnMut(usize, usize, T)) {
        match self {
            Self::Dense(matrix) => matrix.for_each_stored(visit),
            Self::Csr(csr) => csr.for_each_stored(visit),
            Self::Csc(csc) => csc.for_each_stored(visit),
        }
    }
}

fn flush<T: HermitianScalar>(value: T, factor: f64, threshold: f64) -> T {
    let scaled = value.scale(factor);
    if scaled.modulus() < threshold {
        T::zero()
    } else {
        scaled
    }
}

impl<T: HermitianScalar> MatrixView<T> for DMatrix<T> {
    fn set(&mut self, row: usize, col: usize, value: T) {
        self[(row, col)] = value;
    }

    fn weighted_row_dot(&self, a: usize, b: usize, len: usize, weights: &[f64]) -> T {
        (0..len).fold(T::zero(), |acc, k| {
            acc + (self[(a, k)] * self[(b, k)].conjugate()).scale(weights[k])
        })
    }

    fn scale_row_prefix(&mut self, row: usize, len: usize, factor: f64, threshold: f64) {
        for col in 0..len {
            self[(row, col)] = flush(self[(row, col)], factor, threshold);
        }
    }

    fn swap_row_prefixes(&mut self, a: usize, b: usize, len: usize) {
        if a == b {
            return;
        }
        for col in 0..len {
            self.swap((a, col), (b, col));
        }
    }

    fn fill_unit_diagonal(&mut self) {
        for i in 0..self.nrows().min(self.ncols()) {
            self[(i, i)] = T::one();
        }
    }

    fn clear_strict_upper(&mut self) {
        for col in 1..self.ncols() {
            for row in 0..col.min(self.nrows()) {
                self[(row, col)] = T::zero();
            }
        }
    }
}

impl<T: HermitianScalar> MatrixView<T> for LilMatrix<T> {
    fn set(&mut self, row: usize, col: usize, value: T) {
        LilMatrix::set(self, row, col, value);
    }

    fn weighted_row_dot(&self, a: usize, b: usize, len: usize, weights: &[f64]) -> T {
        let (cols_a, vals_a) = self.row(a);
        let (cols_b, vals_b) = self.row(b);
        let (mut x, mut y) = (0, 0);
        let mut acc = T::zero();
        while x < cols_a.len() && y < cols_b.len() {
            let (ca, cb) = (cols_a[x], cols_b[y]);
            if ca >= len || cb >= len {
                break;
            }
            match ca.cmp(&cb) {
                std::cmp::Ordering::Less => x += 1,
                std::cmp::Ordering::Greater => y += 1,
                std::cmp::Ordering::Equal => {
                    acc += (vals_a[x] * vals_b[y].conjugate()).scale(weights[ca]);
                    x += 1;
                    y += 1;
                }
            }
        }
        acc
    }

    fn scale_row_prefix(&mut self, row: usize, len: usize, factor: f64, threshold: f64) {
        self.map_row_prefix(row, len, |value| flush(value, factor, threshold));
    }

    fn swap_row_prefixes(&mut self, a: usize, b: usize, len: usize) {
        LilMatrix::swap_row_prefixes(self, a, b, len);
    }

    fn fill_unit_diagonal(&mut self) {
        let shape = LilMatrix::shape(self);
        for i in 0..shape.rows.min(shape.cols) {
            LilMatrix::set(self, i, i, T::one());
        }
    }

    fn clear_strict_upper(&mut self) {
        self.retain(|row, col| col <= row);
    }
}
