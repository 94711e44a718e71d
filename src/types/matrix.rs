//! Dense matrices
use crate::{
    error::{Error, Result},
    traits::BitEq,
};
use num::{One, Zero};

/// Dense matrix stored row by row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DenseMatrix<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: Copy> DenseMatrix<T> {
    /// Create a matrix from row-major data
    pub fn new(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidInput(format!(
                "a {rows}x{cols} matrix needs {} values, got {}",
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix by evaluating `f(i, j)` for every entry
    pub fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major data
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Consume the matrix and return its row-major data
    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Entry `(i, j)`
    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.cols + j]
    }

    /// Set entry `(i, j)`
    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.cols + j] = value;
    }

    /// Row `i`
    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Does the data hold exactly `rows * cols` values?
    ///
    /// Always true for matrices built by this module; deserialized matrices may not be.
    pub fn is_consistent(&self) -> bool {
        self.data.len() == self.rows * self.cols
    }

    /// Is the matrix square?
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Transposed copy
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self.get(j, i))
    }
}

impl<T: BitEq> BitEq for DenseMatrix<T> {
    fn bit_eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data.bit_eq(&other.data)
    }
}

impl<T: Copy + Zero> DenseMatrix<T> {
    /// Matrix of zeros
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }
}

impl<T: Copy + Zero + One> DenseMatrix<T> {
    /// Identity matrix
    pub fn identity(n: usize) -> Self {
        Self::from_fn(n, n, |i, j| if i == j { T::one() } else { T::zero() })
    }
}

impl<T: Copy + Zero + std::ops::Mul<Output = T> + std::ops::AddAssign> DenseMatrix<T> {
    /// Naive triple loop product used as the reference for every multiplication task
    pub fn matmul(&self, other: &Self) -> Result<Self> {
        if self.cols != other.rows {
            return Err(Error::InvalidInput(format!(
                "cannot multiply a {}x{} matrix by a {}x{} matrix",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for t in 0..self.cols {
                let a = self.get(i, t);
                for j in 0..other.cols {
                    out.data[i * other.cols + j] += a * other.get(t, j);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(DenseMatrix::new(2, 2, vec![1.0, 2.0, 3.0]).is_err());
        let m = DenseMatrix::new(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(m.row(1), &[4, 5, 6]);
        assert_eq!(m.get(0, 2), 3);
    }

    #[test]
    fn test_transpose() {
        let m = DenseMatrix::new(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let t = m.transpose();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.data(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_matmul() {
        let a = DenseMatrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = DenseMatrix::new(2, 1, vec![5.0, 6.0]).unwrap();
        assert_eq!(a.matmul(&b).unwrap().data(), &[17.0, 39.0]);
        assert_eq!(a.matmul(&DenseMatrix::identity(2)).unwrap(), a);
        assert!(b.matmul(&b).is_err());
    }
}
