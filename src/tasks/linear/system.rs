//! Linear systems and the machinery shared by the solvers
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::ROOT,
    traits::Communicator,
    types::{DenseMatrix, ReduceOp},
};

/// The system `matrix * x = rhs`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearSystem {
    /// Coefficient matrix
    pub matrix: DenseMatrix<f64>,
    /// Right hand side
    pub rhs: Vec<f64>,
}

impl LinearSystem {
    /// Create a system
    pub fn new(matrix: DenseMatrix<f64>, rhs: Vec<f64>) -> Self {
        Self { matrix, rhs }
    }

    /// Number of unknowns
    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// Square, non-empty, with a matching right hand side and finite entries
    pub fn is_well_formed(&self) -> bool {
        self.matrix.is_consistent()
            && self.matrix.is_square()
            && self.matrix.rows() == self.rhs.len()
            && !self.rhs.is_empty()
            && self.matrix.data().iter().chain(&self.rhs).all(|v| v.is_finite())
    }

    /// `|a_ii| > sum_{j != i} |a_ij|` for every row
    pub fn is_strictly_diagonally_dominant(&self) -> bool {
        (0..self.matrix.rows()).all(|i| {
            let row = self.matrix.row(i);
            let off: f64 = row
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, v)| v.abs())
                .sum();
            row[i].abs() > off
        })
    }

    /// `max_i |A_i x - b_i|`
    pub fn residual(&self, x: &[f64]) -> f64 {
        (0..self.size())
            .map(|i| (dot(self.matrix.row(i), x) - self.rhs[i]).abs())
            .fold(0.0, f64::max)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve row `i` for `x_i` with the other unknowns taken from `x`
pub(crate) fn solve_row(row: &[f64], rhs: f64, x: &[f64], i: usize) -> f64 {
    let off: f64 = row
        .iter()
        .zip(x)
        .enumerate()
        .filter(|(j, _)| *j != i)
        .map(|(_, (a, v))| a * v)
        .sum();
    (rhs - off) / row[i]
}

/// A system and the stopping parameters of an iterative method
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterativeInput {
    /// The system
    pub system: LinearSystem,
    /// Residual below which the iteration stops
    pub tolerance: f64,
    /// Iteration cap
    pub max_iterations: usize,
}

impl IterativeInput {
    /// Create the input
    pub fn new(system: LinearSystem, tolerance: f64, max_iterations: usize) -> Self {
        Self {
            system,
            tolerance,
            max_iterations,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.tolerance > 0.0
            && self.max_iterations > 0
            && self.system.is_well_formed()
            && self.system.is_strictly_diagonally_dominant()
    }
}

/// Sweep until `residual` drops below `tolerance`
///
/// `sweep` updates the iterate in place and returns the new residual.
pub(crate) fn iterate(
    x: &mut Vec<f64>,
    initial_residual: f64,
    tolerance: f64,
    max_iterations: usize,
    mut sweep: impl FnMut(&mut Vec<f64>) -> Result<f64>,
) -> Result<usize> {
    let mut residual = initial_residual;
    let mut iterations = 0;
    while residual >= tolerance {
        if iterations == max_iterations {
            return Err(Error::NotConverged {
                iterations,
                residual,
            });
        }
        residual = sweep(x)?;
        iterations += 1;
    }
    tracing::debug!(iterations, residual, "converged");
    Ok(iterations)
}

/// Strictly diagonally dominant test system of size `n`
#[cfg(test)]
pub(crate) fn dominant_system(n: usize) -> LinearSystem {
    let matrix = DenseMatrix::from_fn(n, n, |i, j| {
        if i == j {
            2.0 * n as f64 + 1.0
        } else {
            ((i + 2 * j) % 3) as f64 - 1.0
        }
    });
    let rhs = (0..n).map(|i| i as f64 - 1.5).collect();
    LinearSystem::new(matrix, rhs)
}

/// The rows of a system owned by one rank
#[derive(Debug)]
pub(crate) struct LocalRows {
    pub n: usize,
    pub dist: BlockDistribution,
    pub first: usize,
    pub matrix: Vec<f64>,
    pub rhs: Vec<f64>,
}

impl LocalRows {
    /// Scatter the rows of the root's system
    pub fn scatter<C: Communicator>(comm: &C, system: &LinearSystem) -> Result<Self> {
        let n = comm.broadcast_value(system.size(), ROOT)?;
        let dist = BlockDistribution::new(n, comm.size());
        let matrix = comm.scatterv(system.matrix.data(), dist.scaled(n).counts(), ROOT)?;
        let rhs = comm.scatterv(&system.rhs, dist.counts(), ROOT)?;
        Ok(Self {
            n,
            first: dist.displacement(comm.rank()),
            dist,
            matrix,
            rhs,
        })
    }

    pub fn count(&self) -> usize {
        self.rhs.len()
    }

    /// Local row `i`
    pub fn row(&self, i: usize) -> &[f64] {
        &self.matrix[i * self.n..(i + 1) * self.n]
    }

    /// Residual of the owned rows
    pub fn local_residual(&self, x: &[f64]) -> f64 {
        (0..self.count())
            .map(|i| (dot(self.row(i), x) - self.rhs[i]).abs())
            .fold(0.0, f64::max)
    }

    /// Residual over all ranks
    pub fn residual<C: Communicator>(&self, comm: &C, x: &[f64]) -> Result<f64> {
        comm.all_reduce_scalar(self.local_residual(x), ReduceOp::Max)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn system() -> LinearSystem {
        LinearSystem::new(
            DenseMatrix::new(2, 2, vec![4.0, 1.0, 2.0, 5.0]).unwrap(),
            vec![5.0, 7.0],
        )
    }

    #[test]
    fn test_checks() {
        let s = system();
        assert!(s.is_well_formed());
        assert!(s.is_strictly_diagonally_dominant());
        assert_eq!(s.residual(&[1.0, 1.0]), 0.0);
        assert_eq!(s.residual(&[0.0, 0.0]), 7.0);

        let weak = LinearSystem::new(
            DenseMatrix::new(2, 2, vec![1.0, 1.0, 0.0, 3.0]).unwrap(),
            vec![1.0, 1.0],
        );
        assert!(!weak.is_strictly_diagonally_dominant());

        let mismatched = LinearSystem::new(DenseMatrix::identity(2), vec![1.0]);
        assert!(!mismatched.is_well_formed());
    }

    #[test]
    fn test_iterate_stops() {
        let mut x = vec![1.0];
        let iterations = iterate(&mut x, 1.0, 0.1, 10, |x| {
            x[0] /= 2.0;
            Ok(x[0])
        })
        .unwrap();
        assert_eq!(iterations, 4);
        assert_eq!(x, vec![0.0625]);
    }

    #[test]
    fn test_iterate_gives_up() {
        let mut x = vec![1.0];
        let result = iterate(&mut x, 1.0, 0.1, 3, |_| Ok(1.0));
        assert!(matches!(
            result,
            Err(Error::NotConverged { iterations: 3, .. })
        ));
    }
}
