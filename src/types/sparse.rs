//! Compressed sparse matrices
use crate::error::{Error, Result};
use crate::traits::BitEq;
use crate::types::DenseMatrix;
use itertools::Itertools;
use num::Zero;

/// Compressed row storage
///
/// The entries of row `i` are `col_indices[row_offsets[i]..row_offsets[i + 1]]` and the
/// matching `values`. Column indices inside a row are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrsMatrix<T> {
    rows: usize,
    cols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
}

/// Compressed column storage
///
/// Stored as the [CrsMatrix] of the transpose.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CcsMatrix<T> {
    transposed: CrsMatrix<T>,
}

impl<T: BitEq> BitEq for CrsMatrix<T> {
    fn bit_eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.row_offsets == other.row_offsets
            && self.col_indices == other.col_indices
            && self.values.bit_eq(&other.values)
    }
}

impl<T: BitEq> BitEq for CcsMatrix<T> {
    fn bit_eq(&self, other: &Self) -> bool {
        self.transposed.bit_eq(&other.transposed)
    }
}

impl<T: Copy + Zero + PartialEq> CrsMatrix<T> {
    /// Create from raw arrays, checking the structure
    pub fn new(
        rows: usize,
        cols: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        let m = Self {
            rows,
            cols,
            row_offsets,
            col_indices,
            values,
        };
        m.check()?;
        Ok(m)
    }

    /// Create without checking; used for arrays produced by this crate
    pub(crate) fn from_parts(
        rows: usize,
        cols: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        Self {
            rows,
            cols,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// Compress a dense matrix, dropping zeros
    pub fn from_dense(dense: &DenseMatrix<T>) -> Self {
        let mut row_offsets = Vec::with_capacity(dense.rows() + 1);
        let mut col_indices = vec![];
        let mut values = vec![];
        row_offsets.push(0);
        for i in 0..dense.rows() {
            for (j, v) in dense.row(i).iter().enumerate() {
                if *v != T::zero() {
                    col_indices.push(j);
                    values.push(*v);
                }
            }
            row_offsets.push(col_indices.len());
        }
        Self::from_parts(dense.rows(), dense.cols(), row_offsets, col_indices, values)
    }

    /// Build from `(row, col, value)` triplets. Duplicates are summed.
    pub fn from_triplets(rows: usize, cols: usize, triplets: &[(usize, usize, T)]) -> Result<Self>
    where
        T: std::ops::AddAssign,
    {
        if let Some(&(i, j, _)) = triplets.iter().find(|(i, j, _)| *i >= rows || *j >= cols) {
            return Err(Error::InvalidInput(format!(
                "entry ({i}, {j}) is outside a {rows}x{cols} matrix"
            )));
        }
        let sorted = triplets
            .iter()
            .sorted_by_key(|(i, j, _)| (*i, *j))
            .collect_vec();
        let mut row_offsets = vec![0; rows + 1];
        let mut col_indices = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last = None;
        for &&(i, j, v) in &sorted {
            if last == Some((i, j)) {
                if let Some(value) = values.last_mut() {
                    *value += v;
                }
                continue;
            }
            last = Some((i, j));
            row_offsets[i + 1] += 1;
            col_indices.push(j);
            values.push(v);
        }
        for i in 0..rows {
            row_offsets[i + 1] += row_offsets[i];
        }
        Ok(Self::from_parts(rows, cols, row_offsets, col_indices, values))
    }

    /// Expand into a dense matrix
    pub fn to_dense(&self) -> DenseMatrix<T> {
        let mut dense = DenseMatrix::zeros(self.rows, self.cols);
        for i in 0..self.rows {
            for (j, v) in self.row(i) {
                dense.set(i, j, v);
            }
        }
        dense
    }

    /// Transposed copy
    pub fn transpose(&self) -> Self {
        let mut counts = vec![0; self.cols + 1];
        for &j in &self.col_indices {
            counts[j + 1] += 1;
        }
        for j in 0..self.cols {
            counts[j + 1] += counts[j];
        }
        let row_offsets = counts.clone();
        let mut col_indices = vec![0; self.nnz()];
        let mut values = vec![T::zero(); self.nnz()];
        for i in 0..self.rows {
            for (j, v) in self.row(i) {
                let pos = counts[j];
                col_indices[pos] = i;
                values[pos] = v;
                counts[j] += 1;
            }
        }
        Self::from_parts(self.cols, self.rows, row_offsets, col_indices, values)
    }

    /// Check the structural invariants
    pub fn check(&self) -> Result<()> {
        let fail = |message: String| Err(Error::InvalidInput(message));
        if self.row_offsets.len() != self.rows + 1 {
            return fail(format!(
                "{} row offsets for {} rows",
                self.row_offsets.len(),
                self.rows
            ));
        }
        if self.row_offsets[0] != 0 || self.row_offsets[self.rows] != self.col_indices.len() {
            return fail("row offsets do not span the column indices".into());
        }
        if self.col_indices.len() != self.values.len() {
            return fail("column indices and values differ in length".into());
        }
        for (a, b) in self.row_offsets.iter().tuple_windows() {
            if a > b {
                return fail("row offsets decrease".into());
            }
            let row = &self.col_indices[*a..*b];
            if row.iter().any(|&j| j >= self.cols) {
                return fail(format!("column index out of range for {} columns", self.cols));
            }
            if row.iter().tuple_windows().any(|(x, y)| x >= y) {
                return fail("column indices within a row are not increasing".into());
            }
        }
        Ok(())
    }
}

impl<T: Copy> CrsMatrix<T> {
    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Row offsets
    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    /// Column indices
    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    /// Stored values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of entries in row `i`
    pub fn row_nnz(&self, i: usize) -> usize {
        self.row_offsets[i + 1] - self.row_offsets[i]
    }

    /// Iterate over `(column, value)` of row `i`
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_offsets[i]..self.row_offsets[i + 1];
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }
}

impl<T: Copy + Zero + PartialEq> CcsMatrix<T> {
    /// Create from raw column arrays, checking the structure
    pub fn new(
        rows: usize,
        cols: usize,
        col_offsets: Vec<usize>,
        row_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        Ok(Self {
            transposed: CrsMatrix::new(cols, rows, col_offsets, row_indices, values)?,
        })
    }

    /// Compress a dense matrix, dropping zeros
    pub fn from_dense(dense: &DenseMatrix<T>) -> Self {
        Self {
            transposed: CrsMatrix::from_dense(&dense.transpose()),
        }
    }

    /// Expand into a dense matrix
    pub fn to_dense(&self) -> DenseMatrix<T> {
        self.transposed.to_dense().transpose()
    }

    /// Reinterpret the CRS storage of the transpose as a CCS matrix
    pub fn from_transposed_crs(transposed: CrsMatrix<T>) -> Self {
        Self { transposed }
    }

    /// The CRS storage of the transpose; the arrays are the CCS arrays of `self`
    pub fn as_transposed_crs(&self) -> &CrsMatrix<T> {
        &self.transposed
    }

    /// Check the structural invariants
    pub fn check(&self) -> Result<()> {
        self.transposed.check()
    }
}

impl<T: Copy> CcsMatrix<T> {
    /// Number of rows
    pub fn rows(&self) -> usize {
        self.transposed.cols()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.transposed.rows()
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.transposed.nnz()
    }

    /// Column offsets
    pub fn col_offsets(&self) -> &[usize] {
        self.transposed.row_offsets()
    }

    /// Row indices
    pub fn row_indices(&self) -> &[usize] {
        self.transposed.col_indices()
    }

    /// Stored values
    pub fn values(&self) -> &[T] {
        self.transposed.values()
    }
}
