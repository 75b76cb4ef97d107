use nalgebra::Scalar;
use num_traits::Zero;
use thiserror::Error;

pub type SparseResult<T> = Result<T, SparseError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SparseError {
    #[error("invalid shape: {message}")]
    InvalidShape { message: String },
    #[error("invalid sparse structure: {message}")]
    InvalidSparseStructure { message: String },
    #[error("index {index} out of bounds for {axis} with bound {bound}")]
    IndexOutOfBounds {
        axis: &'static str,
        index: usize,
        bound: usize,
    },
    #[error("incompatible shape: {message}")]
    IncompatibleShape { message: String },
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
    #[error("index overflow: {message}")]
    IndexOverflow { message: String },
}

/// Element type storable in any of the sparse formats.
///
/// Covers `f64`, `Complex<f64>` and the integer types accepted as input.
pub trait SparseElement: Scalar + Copy + Zero {}

impl<T: Scalar + Copy + Zero> SparseElement for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseFormat {
    Csr,
    Csc,
    Coo,
    Lil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape2D {
    pub rows: usize,
    pub cols: usize,
}

impl Shape2D {
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    #[must_use]
    pub const fn is_square(self) -> bool {
        self.rows == self.cols
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalMeta {
    pub sorted_indices: bool,
    pub deduplicated: bool,
}

impl CanonicalMeta {
    #[must_use]
    pub const fn is_canonical(self) -> bool {
        self.sorted_indices && self.deduplicated
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T> {
    pub(crate) shape: Shape2D,
    pub(crate) data: Vec<T>,
    pub(crate) indices: Vec<usize>,
    pub(crate) indptr: Vec<usize>,
    pub(crate) canonical: CanonicalMeta,
}

impl<T: SparseElement> CsrMatrix<T> {
    pub fn from_components(
        shape: Shape2D,
        data: Vec<T>,
        indices: Vec<usize>,
        indptr: Vec<usize>,
        canonicalize: bool,
    ) -> SparseResult<Self> {
        let canonical = validate_compressed(
            "CSR",
            shape.rows,
            shape.cols,
            data.len(),
            &indices,
            &indptr,
            canonicalize,
        )?;
        Ok(Self {
            shape,
            data,
            indices,
            indptr,
            canonical,
        })
    }

    /// An all-zero matrix with no stored entries.
    #[must_use]
    pub fn zeros(shape: Shape2D) -> Self {
        Self {
            shape,
            data: Vec::new(),
            indices: Vec::new(),
            indptr: vec![0; shape.rows + 1],
            canonical: CanonicalMeta {
                sorted_indices: true,
                deduplicated: true,
            },
        }
    }

    #[must_use]
    pub const fn shape(&self) -> Shape2D {
        self.shape
    }

    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn canonical_meta(&self) -> CanonicalMeta {
        self.canonical
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// Column indices and values stored in `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        let range = self.indptr[row]..self.indptr[row + 1];
        (&self.indices[range.clone()], &self.data[range])
    }

    /// Value at `(row, col)`; duplicates are summed, absent entries are zero.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        let (cols, values) = self.row(row);
        lookup(cols, values, col, self.canonical)
    }

    pub(crate) fn into_parts(self) -> (Shape2D, Vec<T>, Vec<usize>, Vec<usize>) {
        (self.shape, self.data, self.indices, self.indptr)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T> {
    pub(crate) shape: Shape2D,
    pub(crate) data: Vec<T>,
    pub(crate) indices: Vec<usize>,
    pub(crate) indptr: Vec<usize>,
    pub(crate) canonical: CanonicalMeta,
}

impl<T: SparseElement> CscMatrix<T> {
    pub fn from_components(
        shape: Shape2D,
        data: Vec<T>,
        indices: Vec<usize>,
        indptr: Vec<usize>,
        canonicalize: bool,
    ) -> SparseResult<Self> {
        let canonical = validate_compressed(
            "CSC",
            shape.cols,
            shape.rows,
            data.len(),
            &indices,
            &indptr,
            canonicalize,
        )?;
        Ok(Self {
            shape,
            data,
            indices,
            indptr,
            canonical,
        })
    }

    #[must_use]
    pub const fn shape(&self) -> Shape2D {
        self.shape
    }

    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn canonical_meta(&self) -> CanonicalMeta {
        self.canonical
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    /// Row indices and values stored in `col`.
    #[must_use]
    pub fn col(&self, col: usize) -> (&[usize], &[T]) {
        let range = self.indptr[col]..self.indptr[col + 1];
        (&self.indices[range.clone()], &self.data[range])
    }

    /// Value at `(row, col)`; duplicates are summed, absent entries are zero.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        let (rows, values) = self.col(col);
        lookup(rows, values, row, self.canonical)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CooMatrix<T> {
    pub(crate) shape: Shape2D,
    pub(crate) data: Vec<T>,
    pub(crate) row_indices: Vec<usize>,
    pub(crate) col_indices: Vec<usize>,
}

impl<T: SparseElement> CooMatrix<T> {
    pub fn from_triplets(
        shape: Shape2D,
        data: Vec<T>,
        row_indices: Vec<usize>,
        col_indices: Vec<usize>,
        sum_duplicates: bool,
    ) -> SparseResult<Self> {
        if data.len() != row_indices.len() || data.len() != col_indices.len() {
            return Err(SparseError::IncompatibleShape {
                message: "COO data/row/col lengths must match".to_string(),
            });
        }
        for &row in &row_indices {
            if row >= shape.rows {
                return Err(SparseError::IndexOutOfBounds {
                    axis: "row",
                    index: row,
                    bound: shape.rows,
                });
            }
        }
        for &col in &col_indices {
            if col >= shape.cols {
                return Err(SparseError::IndexOutOfBounds {
                    axis: "col",
                    index: col,
                    bound: shape.cols,
                });
            }
        }

        if !sum_duplicates {
            return Ok(Self {
                shape,
                data,
                row_indices,
                col_indices,
            });
        }

        let mut triplets: Vec<(usize, usize, T)> = row_indices
            .into_iter()
            .zip(col_indices)
            .zip(data)
            .map(|((r, c), v)| (r, c, v))
            .collect();
        triplets.sort_by_key(|(r, c, _)| (*r, *c));

        let mut merged_rows = Vec::with_capacity(triplets.len());
        let mut merged_cols = Vec::with_capacity(triplets.len());
        let mut merged_data: Vec<T> = Vec::with_capacity(triplets.len());

        for (row, col, value) in triplets {
            let is_same_as_last = match (merged_rows.last(), merged_cols.last()) {
                (Some(&last_row), Some(&last_col)) => last_row == row && last_col == col,
                _ => false,
            };

            if is_same_as_last {
                if let Some(last) = merged_data.last_mut() {
                    *last = *last + value;
                }
            } else {
                merged_rows.push(row);
                merged_cols.push(col);
                merged_data.push(value);
            }
        }

        Ok(Self {
            shape,
            data: merged_data,
            row_indices: merged_rows,
            col_indices: merged_cols,
        })
    }

    #[must_use]
    pub const fn shape(&self) -> Shape2D {
        self.shape
    }

    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }

    #[must_use]
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }
}

/// Row-list ("LIL") matrix: one sorted column list per row, no explicit zeros.
///
/// This is the working format for sparse eliminations. Entries are inserted
/// and removed row by row while the factor grows, and the structure is
/// compressed into CSR or CSC afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct LilMatrix<T> {
    pub(crate) shape: Shape2D,
    pub(crate) rows: Vec<Vec<usize>>,
    pub(crate) data: Vec<Vec<T>>,
}

impl<T: SparseElement> LilMatrix<T> {
    #[must_use]
    pub fn new(shape: Shape2D) -> Self {
        Self {
            shape,
            rows: vec![Vec::new(); shape.rows],
            data: vec![Vec::new(); shape.rows],
        }
    }

    #[must_use]
    pub const fn shape(&self) -> Shape2D {
        self.shape
    }

    #[must_use]
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Sorted column indices and their values in `row`.
    #[must_use]
    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        (&self.rows[row], &self.data[row])
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> T {
        match self.rows[row].binary_search(&col) {
            Ok(pos) => self.data[row][pos],
            Err(_) => T::zero(),
        }
    }

    /// Store `value` at `(row, col)`. Writing zero removes the entry.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        let cols = &mut self.rows[row];
        let values = &mut self.data[row];
        match cols.binary_search(&col) {
            Ok(pos) if value.is_zero() => {
                cols.remove(pos);
                values.remove(pos);
            }
            Ok(pos) => values[pos] = value,
            Err(_) if value.is_zero() => {}
            Err(pos) => {
                cols.insert(pos, col);
                values.insert(pos, value);
            }
        }
    }

    /// Apply `f` to the stored entries of `row` with column below `len`,
    /// dropping those that become zero.
    pub fn map_row_prefix(&mut self, row: usize, len: usize, mut f: impl FnMut(T) -> T) {
        let split = self.rows[row].partition_point(|&c| c < len);
        let cols = &mut self.rows[row];
        let values = &mut self.data[row];
        let mut write = 0;
        for read in 0..cols.len() {
            let value = if read < split {
                f(values[read])
            } else {
                values[read]
            };
            if read < split && value.is_zero() {
                continue;
            }
            cols[write] = cols[read];
            values[write] = value;
            write += 1;
        }
        cols.truncate(write);
        values.truncate(write);
    }

    /// Exchange the entries of rows `a` and `b` lying in columns `0..len`.
    pub fn swap_row_prefixes(&mut self, a: usize, b: usize, len: usize) {
        if a == b || len == 0 {
            return;
        }
        let cols_a = std::mem::take(&mut self.rows[a]);
        let vals_a = std::mem::take(&mut self.data[a]);
        let cols_b = std::mem::take(&mut self.rows[b]);
        let vals_b = std::mem::take(&mut self.data[b]);
        let split_a = cols_a.partition_point(|&c| c < len);
        let split_b = cols_b.partition_point(|&c| c < len);

        self.rows[a] = [&cols_b[..split_b], &cols_a[split_a..]].concat();
        self.data[a] = [&vals_b[..split_b], &vals_a[split_a..]].concat();
        self.rows[b] = [&cols_a[..split_a], &cols_b[split_b..]].concat();
        self.data[b] = [&vals_a[..split_a], &vals_b[split_b..]].concat();
    }

    /// Keep only the entries for which `keep(row, col)` holds.
    pub fn retain(&mut self, mut keep: impl FnMut(usize, usize) -> bool) {
        for (row, (cols, values)) in self.rows.iter_mut().zip(self.data.iter_mut()).enumerate() {
            let mut write = 0;
            for read in 0..cols.len() {
                if keep(row, cols[read]) {
                    cols[write] = cols[read];
                    values[write] = values[read];
                    write += 1;
                }
            }
            cols.truncate(write);
            values.truncate(write);
        }
    }

    /// Build from CSR, taking ownership of its buffers.
    #[must_use]
    pub fn from_csr(csr: CsrMatrix<T>) -> Self {
        let canonical = csr.canonical;
        if !canonical.is_canonical() {
            return Self::from_entries(csr.shape, csr_entries(&csr));
        }
        let (shape, data, indices, indptr) = csr.into_parts();
        let mut rows = Vec::with_capacity(shape.rows);
        let mut values = Vec::with_capacity(shape.rows);
        let mut data = data.into_iter();
        let mut indices = indices.into_iter();
        for window in indptr.windows(2) {
            let count = window[1] - window[0];
            let mut row_cols = Vec::with_capacity(count);
            let mut row_vals = Vec::with_capacity(count);
            for (col, value) in indices.by_ref().take(count).zip(data.by_ref().take(count)) {
                if !value.is_zero() {
                    row_cols.push(col);
                    row_vals.push(value);
                }
            }
            rows.push(row_cols);
            values.push(row_vals);
        }
        Self {
            shape,
            rows,
            data: values,
        }
    }

    #[must_use]
    pub fn from_csc(csc: &CscMatrix<T>) -> Self {
        let mut entries = Vec::with_capacity(csc.nnz());
        for col in 0..csc.shape.cols {
            let (rows, values) = csc.col(col);
            entries.extend(rows.iter().zip(values).map(|(&row, &v)| (row, col, v)));
        }
        Self::from_entries(csc.shape, entries)
    }

    fn from_entries(shape: Shape2D, entries: Vec<(usize, usize, T)>) -> Self {
        let mut lil = Self::new(shape);
        for (row, col, value) in entries {
            let merged = lil.get(row, col) + value;
            lil.set(row, col, merged);
        }
        lil
    }

    #[must_use]
    pub fn to_csr(&self) -> CsrMatrix<T> {
        let mut indptr = Vec::with_capacity(self.shape.rows + 1);
        indptr.push(0);
        let mut indices = Vec::with_capacity(self.nnz());
        let mut data = Vec::with_capacity(self.nnz());
        for (cols, values) in self.rows.iter().zip(&self.data) {
            indices.extend_from_slice(cols);
            data.extend_from_slice(values);
            indptr.push(indices.len());
        }
        CsrMatrix {
            shape: self.shape,
            data,
            indices,
            indptr,
            canonical: CanonicalMeta {
                sorted_indices: true,
                deduplicated: true,
            },
        }
    }

    #[must_use]
    pub fn to_csc(&self) -> CscMatrix<T> {
        let mut indptr = vec![0usize; self.shape.cols + 1];
        for cols in &self.rows {
            for &col in cols {
                indptr[col + 1] += 1;
            }
        }
        for col in 0..self.shape.cols {
            indptr[col + 1] += indptr[col];
        }
        let mut next = indptr.clone();
        let mut indices = vec![0usize; self.nnz()];
        let mut data = vec![T::zero(); self.nnz()];
        for (row, (cols, values)) in self.rows.iter().zip(&self.data).enumerate() {
            for (&col, &value) in cols.iter().zip(values) {
                let slot = next[col];
                indices[slot] = row;
                data[slot] = value;
                next[col] += 1;
            }
        }
        CscMatrix {
            shape: self.shape,
            data,
            indices,
            indptr,
            canonical: CanonicalMeta {
                sorted_indices: true,
                deduplicated: true,
            },
        }
    }
}

fn csr_entries<T: SparseElement>(csr: &CsrMatrix<T>) -> Vec<(usize, usize, T)> {
    let mut entries = Vec::with_capacity(csr.nnz());
    for row in 0..csr.shape.rows {
        let (cols, values) = csr.row(row);
        entries.extend(cols.iter().zip(values).map(|(&col, &v)| (row, col, v)));
    }
    entries
}

fn lookup<T: SparseElement>(minor: &[usize], values: &[T], target: usize, meta: CanonicalMeta) -> T {
    if meta.is_canonical() {
        return match minor.binary_search(&target) {
            Ok(pos) => values[pos],
            Err(_) => T::zero(),
        };
    }
    minor
        .iter()
        .zip(values)
        .filter(|(idx, _)| **idx == target)
        .fold(T::zero(), |acc, (_, &v)| acc + v)
}

fn validate_compressed(
    label: &str,
    major_len: usize,
    minor_len: usize,
    nnz: usize,
    indices: &[usize],
    indptr: &[usize],
    canonicalize: bool,
) -> SparseResult<CanonicalMeta> {
    if nnz != indices.len() {
        return Err(SparseError::IncompatibleShape {
            message: format!("{label} data and indices lengths differ"),
        });
    }
    if indptr.len() != major_len + 1 {
        return Err(SparseError::InvalidShape {
            message: format!("{label} indptr length must be major_len + 1"),
        });
    }
    if !indptr.windows(2).all(|w| w[0] <= w[1]) {
        return Err(SparseError::InvalidSparseStructure {
            message: format!("{label} indptr must be monotone non-decreasing"),
        });
    }
    if indptr.first().copied().unwrap_or_default() != 0 || indptr[major_len] != nnz {
        return Err(SparseError::InvalidSparseStructure {
            message: format!(
                "{label} pointer endpoints must satisfy indptr[0]=0 and indptr[last]=nnz"
            ),
        });
    }
    for &idx in indices {
        if idx >= minor_len {
            return Err(SparseError::IndexOutOfBounds {
                axis: "minor",
                index: idx,
                bound: minor_len,
            });
        }
    }

    let (sorted, deduplicated) = detect_canonical(indptr, indices);
    if canonicalize && !(sorted && deduplicated) {
        return Err(SparseError::InvalidSparseStructure {
            message: format!("{label} claimed canonical but indices are unsorted or duplicated"),
        });
    }
    Ok(CanonicalMeta {
        sorted_indices: sorted,
        deduplicated,
    })
}

fn detect_canonical(indptr: &[usize], indices: &[usize]) -> (bool, bool) {
    let mut sorted = true;
    let mut deduplicated = true;

    for window in indptr.windows(2) {
        let start = window[0];
        let end = window[1];
        let mut prev: Option<usize> = None;
        for &idx in &indices[start..end] {
            if let Some(prev_idx) = prev {
                if idx < prev_idx {
                    sorted = false;
                }
                if idx == prev_idx {
                    deduplicated = false;
                }
            }
            prev = Some(idx);
        }
    }

    (sorted, deduplicated)
}
