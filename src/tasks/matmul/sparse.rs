//! Sparse products in compressed row and compressed column storage
//!
//! Rows are multiplied with Gustavson's algorithm: a dense accumulator per output row plus the
//! list of touched columns. Entries that cancel to zero are kept in the structure.
use super::{share, share_shape, MatrixPair};
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{CcsMatrix, CrsMatrix, Scalar, TaskKind},
};

// Output rows as (row lengths, column indices, values).
type Rows<T> = (Vec<usize>, Vec<usize>, Vec<T>);

// Multiply the rows described by `offsets`, `cols` and `vals` with `rhs`.
fn multiply_rows<T: Scalar>(
    offsets: &[usize],
    cols: &[usize],
    vals: &[T],
    rhs: &CrsMatrix<T>,
) -> Rows<T> {
    let n = rhs.cols();
    let mut accumulator = vec![T::zero(); n];
    let mut touched = vec![false; n];
    let mut row_lens = Vec::with_capacity(offsets.len().saturating_sub(1));
    let mut out_cols = vec![];
    let mut out_vals = vec![];
    for w in offsets.windows(2) {
        let mut row_cols = vec![];
        for (&t, &a) in cols[w[0]..w[1]].iter().zip(&vals[w[0]..w[1]]) {
            for (j, b) in rhs.row(t) {
                if !touched[j] {
                    touched[j] = true;
                    row_cols.push(j);
                }
                accumulator[j] += a * b;
            }
        }
        row_cols.sort_unstable();
        row_lens.push(row_cols.len());
        for j in row_cols {
            out_cols.push(j);
            out_vals.push(accumulator[j]);
            accumulator[j] = T::zero();
            touched[j] = false;
        }
    }
    (row_lens, out_cols, out_vals)
}

fn offsets_from_lens(lens: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(lens.len() + 1);
    offsets.push(0);
    offsets.extend(lens.iter().scan(0, |acc, &l| {
        *acc += l;
        Some(*acc)
    }));
    offsets
}

/// Product of two CRS matrices
pub fn crs_multiply<T: Scalar>(lhs: &CrsMatrix<T>, rhs: &CrsMatrix<T>) -> Result<CrsMatrix<T>> {
    if lhs.cols() != rhs.rows() {
        return Err(Error::InvalidInput(format!(
            "cannot multiply a {}x{} matrix by a {}x{} matrix",
            lhs.rows(),
            lhs.cols(),
            rhs.rows(),
            rhs.cols()
        )));
    }
    let (lens, cols, vals) = multiply_rows(lhs.row_offsets(), lhs.col_indices(), lhs.values(), rhs);
    Ok(CrsMatrix::from_parts(
        lhs.rows(),
        rhs.cols(),
        offsets_from_lens(&lens),
        cols,
        vals,
    ))
}

// Rows of `lhs` are distributed in blocks, `rhs` is broadcast. `lhs` and `rhs` are only read on
// the root; every rank returns the full product.
fn distributed_crs_multiply<C: Communicator, T: Scalar>(
    comm: &C,
    lhs: &CrsMatrix<T>,
    rhs: &CrsMatrix<T>,
    [m, k, n]: [usize; 3],
) -> Result<CrsMatrix<T>> {
    let size = comm.size();
    let rank = comm.rank();

    let rhs = CrsMatrix::from_parts(
        k,
        n,
        share(comm, rhs.row_offsets())?,
        share(comm, rhs.col_indices())?,
        share(comm, rhs.values())?,
    );
    let lhs_offsets = share(comm, lhs.row_offsets())?;

    let rows = BlockDistribution::new(m, size);
    let nnz_counts = rows
        .ranges()
        .map(|(_, r)| lhs_offsets[r.end] - lhs_offsets[r.start])
        .collect::<Vec<_>>();
    let local_cols = comm.scatterv(lhs.col_indices(), &nnz_counts, ROOT)?;
    let local_vals = comm.scatterv(lhs.values(), &nnz_counts, ROOT)?;
    let range = rows.range(rank);
    let base = lhs_offsets[range.start];
    let local_offsets = lhs_offsets[range.start..=range.end]
        .iter()
        .map(|o| o - base)
        .collect::<Vec<_>>();
    tracing::debug!(rows = range.len(), nnz = local_cols.len(), "local sparse rows");

    let (lens, cols, vals) = multiply_rows(&local_offsets, &local_cols, &local_vals, &rhs);

    let all_lens = comm.gatherv(&lens, rows.counts(), ROOT)?;
    let out_counts = comm.gatherv(&[cols.len()], &vec![1; size], ROOT)?;
    let mut all_cols = comm.gatherv(&cols, &out_counts, ROOT)?;
    let mut all_vals = comm.gatherv(&vals, &out_counts, ROOT)?;
    let mut offsets = offsets_from_lens(&all_lens);

    comm.broadcast(&mut offsets, ROOT)?;
    comm.broadcast(&mut all_cols, ROOT)?;
    comm.broadcast(&mut all_vals, ROOT)?;
    Ok(CrsMatrix::from_parts(m, n, offsets, all_cols, all_vals))
}

fn empty_crs<T: Scalar>() -> CrsMatrix<T> {
    CrsMatrix::from_parts(0, 0, vec![0], vec![], vec![])
}

fn crs_compatible<T: Scalar>(input: &MatrixPair<CrsMatrix<T>>) -> bool {
    input.a.cols() == input.b.rows() && input.a.check().is_ok() && input.b.check().is_ok()
}

fn ccs_compatible<T: Scalar>(input: &MatrixPair<CcsMatrix<T>>) -> bool {
    input.a.cols() == input.b.rows() && input.a.check().is_ok() && input.b.check().is_ok()
}

macro_rules! task_accessors {
    ($input:ty, $output:ty, $kind:expr) => {
        type Input = $input;
        type Output = $output;

        fn kind(&self) -> TaskKind {
            $kind
        }
        fn input(&self) -> &Self::Input {
            &self.input
        }
        fn output(&self) -> &Self::Output {
            &self.output
        }
    };
}

/// CRS product on a single process
#[derive(Debug)]
pub struct CrsMultiplySeq<T: Scalar> {
    input: MatrixPair<CrsMatrix<T>>,
    output: CrsMatrix<T>,
}

impl<T: Scalar> CrsMultiplySeq<T> {
    /// Create the task
    pub fn new(input: MatrixPair<CrsMatrix<T>>) -> Self {
        Self {
            input,
            output: empty_crs(),
        }
    }
}

impl<T: Scalar> Task for CrsMultiplySeq<T> {
    task_accessors!(MatrixPair<CrsMatrix<T>>, CrsMatrix<T>, TaskKind::Sequential);

    fn validation(&mut self) -> bool {
        crs_compatible(&self.input)
    }

    fn pre_processing(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.output = crs_multiply(&self.input.a, &self.input.b)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        self.output.check()
    }
}

/// CRS product with the rows of `a` distributed
#[derive(Debug)]
pub struct CrsMultiplyDistributed<'a, C: Communicator, T: Scalar> {
    comm: &'a C,
    input: MatrixPair<CrsMatrix<T>>,
    output: CrsMatrix<T>,
    shape: [usize; 3],
}

impl<'a, C: Communicator, T: Scalar> CrsMultiplyDistributed<'a, C, T> {
    /// Create the task
    pub fn new(comm: &'a C, input: MatrixPair<CrsMatrix<T>>) -> Self {
        Self {
            comm,
            input,
            output: empty_crs(),
            shape: [0; 3],
        }
    }
}

impl<C: Communicator, T: Scalar> Task for CrsMultiplyDistributed<'_, C, T> {
    task_accessors!(MatrixPair<CrsMatrix<T>>, CrsMatrix<T>, TaskKind::Distributed);

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || crs_compatible(&self.input))
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.shape = share_shape(
            self.comm,
            [self.input.a.rows(), self.input.a.cols(), self.input.b.cols()],
        )?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.output =
            distributed_crs_multiply(self.comm, &self.input.a, &self.input.b, self.shape)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        self.output.check()
    }
}

/// CCS product on a single process, computed as `(b^T a^T)^T`
#[derive(Debug)]
pub struct CcsMultiplySeq<T: Scalar> {
    input: MatrixPair<CcsMatrix<T>>,
    output: CcsMatrix<T>,
}

impl<T: Scalar> CcsMultiplySeq<T> {
    /// Create the task
    pub fn new(input: MatrixPair<CcsMatrix<T>>) -> Self {
        Self {
            input,
            output: CcsMatrix::from_transposed_crs(empty_crs()),
        }
    }
}

impl<T: Scalar> Task for CcsMultiplySeq<T> {
    task_accessors!(MatrixPair<CcsMatrix<T>>, CcsMatrix<T>, TaskKind::Sequential);

    fn validation(&mut self) -> bool {
        ccs_compatible(&self.input)
    }

    fn pre_processing(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let product = crs_multiply(
            self.input.b.as_transposed_crs(),
            self.input.a.as_transposed_crs(),
        )?;
        self.output = CcsMatrix::from_transposed_crs(product);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        self.output.check()
    }
}

/// CCS product with the columns of `b` distributed
#[derive(Debug)]
pub struct CcsMultiplyDistributed<'a, C: Communicator, T: Scalar> {
    comm: &'a C,
    input: MatrixPair<CcsMatrix<T>>,
    output: CcsMatrix<T>,
    shape: [usize; 3],
}

impl<'a, C: Communicator, T: Scalar> CcsMultiplyDistributed<'a, C, T> {
    /// Create the task
    pub fn new(comm: &'a C, input: MatrixPair<CcsMatrix<T>>) -> Self {
        Self {
            comm,
            input,
            output: CcsMatrix::from_transposed_crs(empty_crs()),
            shape: [0; 3],
        }
    }
}

impl<C: Communicator, T: Scalar> Task for CcsMultiplyDistributed<'_, C, T> {
    task_accessors!(MatrixPair<CcsMatrix<T>>, CcsMatrix<T>, TaskKind::Distributed);

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || ccs_compatible(&self.input))
    }

    fn pre_processing(&mut self) -> Result<()> {
        // Shape of the transposed product b^T a^T
        self.shape = share_shape(
            self.comm,
            [self.input.b.cols(), self.input.b.rows(), self.input.a.rows()],
        )?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let product = distributed_crs_multiply(
            self.comm,
            self.input.b.as_transposed_crs(),
            self.input.a.as_transposed_crs(),
            self.shape,
        )?;
        self.output = CcsMatrix::from_transposed_crs(product);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        self.output.check()
    }
}
