//! Row striped dense multiplication
use super::{multiply_accumulate, share, share_shape, MatrixPair};
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{DenseMatrix, Scalar, TaskKind},
};

fn compatible<T: Scalar>(input: &MatrixPair<DenseMatrix<T>>) -> bool {
    input.a.cols() == input.b.rows() && input.a.is_consistent() && input.b.is_consistent()
}

fn check_shape<T: Scalar>(
    output: &DenseMatrix<T>,
    shape: [usize; 3],
) -> Result<()> {
    let [m, _, n] = shape;
    if output.rows() != m || output.cols() != n {
        return Err(Error::InvalidInput(format!(
            "product is {}x{}, expected {m}x{n}",
            output.rows(),
            output.cols()
        )));
    }
    Ok(())
}

/// Dense product on a single process
#[derive(Debug)]
pub struct DenseMultiplySeq<T: Scalar> {
    input: MatrixPair<DenseMatrix<T>>,
    output: DenseMatrix<T>,
}

impl<T: Scalar> DenseMultiplySeq<T> {
    /// Create the task
    pub fn new(input: MatrixPair<DenseMatrix<T>>) -> Self {
        Self {
            input,
            output: DenseMatrix::zeros(0, 0),
        }
    }
}

impl<T: Scalar> Task for DenseMultiplySeq<T> {
    type Input = MatrixPair<DenseMatrix<T>>;
    type Output = DenseMatrix<T>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &Self::Input {
        &self.input
    }
    fn output(&self) -> &Self::Output {
        &self.output
    }

    fn validation(&mut self) -> bool {
        compatible(&self.input)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = DenseMatrix::zeros(self.input.a.rows(), self.input.b.cols());
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let (m, k, n) = (self.input.a.rows(), self.input.a.cols(), self.input.b.cols());
        let mut c = vec![T::zero(); m * n];
        multiply_accumulate(&mut c, self.input.a.data(), self.input.b.data(), m, k, n);
        self.output = DenseMatrix::new(m, n, c)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_shape(
            &self.output,
            [self.input.a.rows(), self.input.a.cols(), self.input.b.cols()],
        )
    }
}

/// Dense product with the rows of `a` scattered and `b` broadcast
#[derive(Debug)]
pub struct DenseMultiplyDistributed<'a, C: Communicator, T: Scalar> {
    comm: &'a C,
    input: MatrixPair<DenseMatrix<T>>,
    output: DenseMatrix<T>,
    shape: [usize; 3],
}

impl<'a, C: Communicator, T: Scalar> DenseMultiplyDistributed<'a, C, T> {
    /// Create the task
    pub fn new(comm: &'a C, input: MatrixPair<DenseMatrix<T>>) -> Self {
        Self {
            comm,
            input,
            output: DenseMatrix::zeros(0, 0),
            shape: [0; 3],
        }
    }
}

impl<C: Communicator, T: Scalar> Task for DenseMultiplyDistributed<'_, C, T> {
    type Input = MatrixPair<DenseMatrix<T>>;
    type Output = DenseMatrix<T>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &Self::Input {
        &self.input
    }
    fn output(&self) -> &Self::Output {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || compatible(&self.input))
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.shape = share_shape(
            self.comm,
            [self.input.a.rows(), self.input.a.cols(), self.input.b.cols()],
        )?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let [m, k, n] = self.shape;
        let rows = BlockDistribution::new(m, comm.size());
        let local_rows = rows.count(comm.rank());

        let a = comm.scatterv(self.input.a.data(), rows.scaled(k).counts(), ROOT)?;
        let b = share(comm, self.input.b.data())?;
        tracing::debug!(local_rows, "multiplying row stripe");

        let mut c = vec![T::zero(); local_rows * n];
        multiply_accumulate(&mut c, &a, &b, local_rows, k, n);

        let mut product = comm.gatherv(&c, rows.scaled(n).counts(), ROOT)?;
        comm.broadcast(&mut product, ROOT)?;
        self.output = DenseMatrix::new(m, n, product)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_shape(&self.output, self.shape)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::runner::{run_pipeline, TaskRunner};
    use approx::assert_relative_eq;

    fn pair(m: usize, k: usize, n: usize) -> MatrixPair<DenseMatrix<f64>> {
        MatrixPair::new(
            DenseMatrix::from_fn(m, k, |i, j| (i as f64) - 0.5 * (j as f64) + 1.0),
            DenseMatrix::from_fn(k, n, |i, j| ((i * n + j) % 7) as f64 - 2.0),
        )
    }

    #[test]
    fn test_seq() {
        let input = pair(4, 3, 5);
        let expected = input.a.matmul(&input.b).unwrap();
        let output = run_pipeline(DenseMultiplySeq::new(input)).unwrap();
        assert_eq!(output.rows(), 4);
        assert_eq!(output.cols(), 5);
        for (x, y) in output.data().iter().zip(expected.data()) {
            assert_relative_eq!(x, y, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_incompatible() {
        let input = MatrixPair::new(DenseMatrix::<f64>::zeros(2, 3), DenseMatrix::zeros(2, 3));
        let mut runner = TaskRunner::new(DenseMultiplySeq::new(input));
        assert!(runner.validation().is_err());
    }

    #[test]
    fn test_distributed() {
        for (m, k, n) in [(1, 1, 1), (2, 3, 4), (7, 5, 3), (0, 2, 2)] {
            let input = pair(m, k, n);
            let expected = input.a.matmul(&input.b).unwrap();
            for size in 1..=4 {
                let outputs = LocalUniverse::new(size)
                    .run(|comm| run_pipeline(DenseMultiplyDistributed::new(comm, input.clone())))
                    .unwrap();
                for output in outputs {
                    assert_eq!(output.rows(), m);
                    assert_eq!(output.cols(), n);
                    for (x, y) in output.data().iter().zip(expected.data()) {
                        assert_relative_eq!(x, y, max_relative = 1e-9);
                    }
                }
            }
        }
    }
}
