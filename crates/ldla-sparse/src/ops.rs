use nalgebra::DMatrix;

use crate::formats::{
    CooMatrix, CscMatrix, CsrMatrix, LilMatrix, Shape2D, SparseElement, SparseResult,
};

pub trait FormatConvertible<T> {
    fn to_csr(&self) -> SparseResult<CsrMatrix<T>>;
    fn to_csc(&self) -> SparseResult<CscMatrix<T>>;
    fn to_coo(&self) -> SparseResult<CooMatrix<T>>;
}

/// Conversion to and from dense `nalgebra` storage.
pub trait DenseBridge<T>: Sized {
    fn to_dense(&self) -> DMatrix<T>;
    /// Build from a dense matrix, storing only the non-zero entries.
    fn from_dense(matrix: &DMatrix<T>) -> SparseResult<Self>;
}

impl<T: SparseElement> FormatConvertible<T> for CooMatrix<T> {
    fn to_csr(&self) -> SparseResult<CsrMatrix<T>> {
        let mut triplets = canonical_triplets(self);
        triplets.sort_by_key(|(r, c, _)| (*r, *c));
        let (data, indices, indptr) = compress_triplets(self.shape(), &triplets, false);
        CsrMatrix::from_components(self.shape(), data, indices, indptr, true)
    }

    fn to_csc(&self) -> SparseResult<CscMatrix<T>> {
        let mut triplets = canonical_triplets(self);
        triplets.sort_by_key(|(r, c, _)| (*c, *r));
        let (data, indices, indptr) = compress_triplets(self.shape(), &triplets, true);
        CscMatrix::from_components(self.shape(), data, indices, indptr, true)
    }

    fn to_coo(&self) -> SparseResult<CooMatrix<T>> {
        Ok(self.clone())
    }
}

impl<T: SparseElement> FormatConvertible<T> for CsrMatrix<T> {
    fn to_csr(&self) -> SparseResult<CsrMatrix<T>> {
        Ok(self.clone())
    }

    fn to_csc(&self) -> SparseResult<CscMatrix<T>> {
        self.to_coo()?.to_csc()
    }

    fn to_coo(&self) -> SparseResult<CooMatrix<T>> {
        let mut rows = Vec::with_capacity(self.nnz());
        let mut cols = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        for row in 0..self.shape().rows {
            for idx in self.indptr()[row]..self.indptr()[row + 1] {
                rows.push(row);
                cols.push(self.indices()[idx]);
                data.push(self.data()[idx]);
            }
        }
        CooMatrix::from_triplets(self.shape(), data, rows, cols, false)
    }
}

impl<T: SparseElement> FormatConvertible<T> for CscMatrix<T> {
    fn to_csr(&self) -> SparseResult<CsrMatrix<T>> {
        self.to_coo()?.to_csr()
    }

    fn to_csc(&self) -> SparseResult<CscMatrix<T>> {
        Ok(self.clone())
    }

    fn to_coo(&self) -> SparseResult<CooMatrix<T>> {
        let mut rows = Vec::with_capacity(self.nnz());
        let mut cols = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        for col in 0..self.shape().cols {
            for idx in self.indptr()[col]..self.indptr()[col + 1] {
                rows.push(self.indices()[idx]);
                cols.push(col);
                data.push(self.data()[idx]);
            }
        }
        CooMatrix::from_triplets(self.shape(), data, rows, cols, false)
    }
}

impl<T: SparseElement> FormatConvertible<T> for LilMatrix<T> {
    fn to_csr(&self) -> SparseResult<CsrMatrix<T>> {
        Ok(LilMatrix::to_csr(self))
    }

    fn to_csc(&self) -> SparseResult<CscMatrix<T>> {
        Ok(LilMatrix::to_csc(self))
    }

    fn to_coo(&self) -> SparseResult<CooMatrix<T>> {
        LilMatrix::to_csr(self).to_coo()
    }
}

impl<T: SparseElement> DenseBridge<T> for CooMatrix<T> {
    fn to_dense(&self) -> DMatrix<T> {
        let shape = self.shape();
        let mut dense = DMatrix::from_element(shape.rows, shape.cols, T::zero());
        for idx in 0..self.nnz() {
            let (row, col) = (self.row_indices()[idx], self.col_indices()[idx]);
            dense[(row, col)] = dense[(row, col)] + self.data()[idx];
        }
        dense
    }

    fn from_dense(matrix: &DMatrix<T>) -> SparseResult<Self> {
        let (rows, cols) = matrix.shape();
        let mut triplet_rows = Vec::new();
        let mut triplet_cols = Vec::new();
        let mut triplet_data = Vec::new();

        for row in 0..rows {
            for col in 0..cols {
                let value = matrix[(row, col)];
                if !value.is_zero() {
                    triplet_rows.push(row);
                    triplet_cols.push(col);
                    triplet_data.push(value);
                }
            }
        }

        Self::from_triplets(
            Shape2D::new(rows, cols),
            triplet_data,
            triplet_rows,
            triplet_cols,
            false,
        )
    }
}

impl<T: SparseElement> DenseBridge<T> for CsrMatrix<T> {
    fn to_dense(&self) -> DMatrix<T> {
        let shape = self.shape();
        let mut dense = DMatrix::from_element(shape.rows, shape.cols, T::zero());
        for row in 0..shape.rows {
            let (cols, values) = self.row(row);
            for (&col, &value) in cols.iter().zip(values) {
                dense[(row, col)] = dense[(row, col)] + value;
            }
        }
        dense
    }

    fn from_dense(matrix: &DMatrix<T>) -> SparseResult<Self> {
        CooMatrix::from_dense(matrix)?.to_csr()
    }
}

impl<T: SparseElement> DenseBridge<T> for CscMatrix<T> {
    fn to_dense(&self) -> DMatrix<T> {
        let shape = self.shape();
        let mut dense = DMatrix::from_element(shape.rows, shape.cols, T::zero());
        for col in 0..shape.cols {
            let (rows, values) = self.col(col);
            for (&row, &value) in rows.iter().zip(values) {
                dense[(row, col)] = dense[(row, col)] + value;
            }
        }
        dense
    }

    fn from_dense(matrix: &DMatrix<T>) -> SparseResult<Self> {
        CooMatrix::from_dense(matrix)?.to_csc()
    }
}

impl<T: SparseElement> DenseBridge<T> for LilMatrix<T> {
    fn to_dense(&self) -> DMatrix<T> {
        LilMatrix::to_csr(self).to_dense()
    }

    fn from_dense(matrix: &DMatrix<T>) -> SparseResult<Self> {
        Ok(LilMatrix::from_csr(CsrMatrix::from_dense(matrix)?))
    }
}

fn canonical_triplets<T: SparseElement>(coo: &CooMatrix<T>) -> Vec<(usize, usize, T)> {
    let mut triplets: Vec<(usize, usize, T)> = coo
        .row_indices()
        .iter()
        .copied()
        .zip(coo.col_indices().iter().copied())
        .zip(coo.data().iter().copied())
        .map(|((r, c), v)| (r, c, v))
        .collect();

    triplets.sort_by_key(|(r, c, _)| (*r, *c));

    let mut dedup: Vec<(usize, usize, T)> = Vec::with_capacity(triplets.len());
    for (r, c, v) in triplets {
        let should_merge = match dedup.last_mut() {
            Some((lr, lc, lv)) if *lr == r && *lc == c => {
                *lv = *lv + v;
                true
            }
            _ => false,
        };
        if !should_merge {
            dedup.push((r, c, v));
        }
    }

    dedup
}

fn compress_triplets<T: SparseElement>(
    shape: Shape2D,
    triplets: &[(usize, usize, T)],
    by_col: bool,
) -> (Vec<T>, Vec<usize>, Vec<usize>) {
    let major_len = if by_col { shape.cols } else { shape.rows };
    let mut indptr = vec![0usize; major_len + 1];
    for (row, col, _) in triplets {
        let major = if by_col { *col } else { *row };
        indptr[major + 1] += 1;
    }
    for major in 0..major_len {
        indptr[major + 1] += indptr[major];
    }
    let mut data = Vec::with_capacity(triplets.len());
    let mut indices = Vec::with_capacity(triplets.len());
    for (row, col, value) in triplets {
        indices.push(if by_col { *row } else { *col });
        data.push(*value);
    }
    (data, indices, indptr)
}
