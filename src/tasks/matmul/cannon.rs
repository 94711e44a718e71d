//! Cannon's algorithm on a square process grid
use super::{multiply_accumulate, share_shape, MatrixPair};
use crate::{
    error::{Error, Result},
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{DenseMatrix, Scalar, Tag, TaskKind},
};

const SHIFT_A_TAG: Tag = 200;
const SHIFT_B_TAG: Tag = 201;

// Block layout of a product of padded matrices on a `q x q` grid.
#[derive(Debug, Clone, Copy)]
struct BlockGrid {
    q: usize,
    bm: usize,
    bk: usize,
    bn: usize,
}

impl BlockGrid {
    fn new(q: usize, [m, k, n]: [usize; 3]) -> Self {
        Self {
            q,
            bm: m.div_ceil(q),
            bk: k.div_ceil(q),
            bn: n.div_ceil(q),
        }
    }

    fn a_len(&self) -> usize {
        self.bm * self.bk
    }

    fn b_len(&self) -> usize {
        self.bk * self.bn
    }

    fn c_len(&self) -> usize {
        self.bm * self.bn
    }

    // Grid coordinates of a rank
    fn coords(&self, rank: usize) -> (usize, usize) {
        (rank / self.q, rank % self.q)
    }

    fn rank_at(&self, i: usize, j: usize) -> usize {
        (i % self.q) * self.q + (j % self.q)
    }

    // Blocks of `a` and `b` held by grid position (i, j) after the initial skew.
    fn skewed_blocks<T: Scalar>(
        &self,
        a: &DenseMatrix<T>,
        b: &DenseMatrix<T>,
        i: usize,
        j: usize,
    ) -> (Vec<T>, Vec<T>) {
        let s = (i + j) % self.q;
        (
            block(a, i * self.bm, s * self.bk, self.bm, self.bk),
            block(b, s * self.bk, j * self.bn, self.bk, self.bn),
        )
    }

    // Write block (i, j) of the padded product into `c`, cropping the padding.
    fn place<T: Scalar>(&self, c: &mut DenseMatrix<T>, block: &[T], i: usize, j: usize) {
        for r in 0..self.bm {
            let row = i * self.bm + r;
            if row >= c.rows() {
                break;
            }
            for s in 0..self.bn {
                let col = j * self.bn + s;
                if col >= c.cols() {
                    break;
                }
                c.set(row, col, block[r * self.bn + s]);
            }
        }
    }
}

// Zero padded copy of the `rows x cols` block at (r0, c0).
fn block<T: Scalar>(m: &DenseMatrix<T>, r0: usize, c0: usize, rows: usize, cols: usize) -> Vec<T> {
    let mut out = vec![T::zero(); rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            if r0 + r < m.rows() && c0 + c < m.cols() {
                out[r * cols + c] = m.get(r0 + r, c0 + c);
            }
        }
    }
    out
}

fn compatible<T: Scalar>(input: &MatrixPair<DenseMatrix<T>>) -> bool {
    input.a.cols() == input.b.rows() && input.a.is_consistent() && input.b.is_consistent()
}

/// Cannon's algorithm with a `grid x grid` block decomposition, run on one process
#[derive(Debug)]
pub struct CannonSeq<T: Scalar> {
    input: MatrixPair<DenseMatrix<T>>,
    output: DenseMatrix<T>,
    grid: usize,
}

impl<T: Scalar> CannonSeq<T> {
    /// Create the task
    pub fn new(input: MatrixPair<DenseMatrix<T>>, grid: usize) -> Self {
        Self {
            input,
            output: DenseMatrix::zeros(0, 0),
            grid,
        }
    }
}

impl<T: Scalar> Task for CannonSeq<T> {
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
        self.grid > 0 && compatible(&self.input)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = DenseMatrix::zeros(self.input.a.rows(), self.input.b.cols());
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let MatrixPair { a, b } = &self.input;
        let grid = BlockGrid::new(self.grid, [a.rows(), a.cols(), b.cols()]);
        let q = grid.q;
        let (mut a_blocks, mut b_blocks): (Vec<_>, Vec<_>) = (0..q * q)
            .map(|r| {
                let (i, j) = grid.coords(r);
                grid.skewed_blocks(a, b, i, j)
            })
            .unzip();
        let mut c_blocks = vec![vec![T::zero(); grid.c_len()]; q * q];

        for step in 0..q {
            for r in 0..q * q {
                multiply_accumulate(
                    &mut c_blocks[r],
                    &a_blocks[r],
                    &b_blocks[r],
                    grid.bm,
                    grid.bk,
                    grid.bn,
                );
            }
            if step + 1 < q {
                // A moves one column left, B one row up.
                a_blocks = (0..q * q)
                    .map(|r| {
                        let (i, j) = grid.coords(r);
                        a_blocks[grid.rank_at(i, j + 1)].clone()
                    })
                    .collect();
                b_blocks = (0..q * q)
                    .map(|r| {
                        let (i, j) = grid.coords(r);
                        b_blocks[grid.rank_at(i + 1, j)].clone()
                    })
                    .collect();
            }
        }

        for (r, c) in c_blocks.iter().enumerate() {
            let (i, j) = grid.coords(r);
            grid.place(&mut self.output, c, i, j);
        }
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        if self.output.rows() != self.input.a.rows() || self.output.cols() != self.input.b.cols() {
            return Err(Error::InvalidInput("product has the wrong shape".into()));
        }
        Ok(())
    }
}

/// Cannon's algorithm on the largest square grid that fits into the communicator
///
/// With `q = floor(sqrt(size))` the first `q * q` ranks form the grid; the others stay idle
/// apart from the final broadcast. Matrices are zero padded so that the block dimensions
/// divide evenly.
#[derive(Debug)]
pub struct CannonDistributed<'a, C: Communicator, T: Scalar> {
    comm: &'a C,
    input: MatrixPair<DenseMatrix<T>>,
    output: DenseMatrix<T>,
    shape: [usize; 3],
}

impl<'a, C: Communicator, T: Scalar> CannonDistributed<'a, C, T> {
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

/// Side length of the process grid used for `size` ranks
pub fn grid_side(size: usize) -> usize {
    let mut q = (size as f64).sqrt() as usize;
    while q * q > size {
        q -= 1;
    }
    while (q + 1) * (q + 1) <= size {
        q += 1;
    }
    q.max(1)
}

impl<C: Communicator, T: Scalar> Task for CannonDistributed<'_, C, T> {
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
        let rank = comm.rank();
        let size = comm.size();
        let grid = BlockGrid::new(grid_side(size), self.shape);
        let q = grid.q;
        let active = rank < q * q;
        tracing::debug!(q, active, "cannon grid");

        let counts_for = |len: usize| {
            (0..size)
                .map(|r| if r < q * q { len } else { 0 })
                .collect::<Vec<_>>()
        };

        // The root lays out the skewed blocks in rank order.
        let (a_send, b_send) = if comm.is_root(ROOT) {
            let mut a_send = Vec::with_capacity(q * q * grid.a_len());
            let mut b_send = Vec::with_capacity(q * q * grid.b_len());
            for r in 0..q * q {
                let (i, j) = grid.coords(r);
                let (a, b) = grid.skewed_blocks(&self.input.a, &self.input.b, i, j);
                a_send.extend(a);
                b_send.extend(b);
            }
            (a_send, b_send)
        } else {
            (vec![], vec![])
        };
        let mut a = comm.scatterv(&a_send, &counts_for(grid.a_len()), ROOT)?;
        let mut b = comm.scatterv(&b_send, &counts_for(grid.b_len()), ROOT)?;
        let mut c = vec![T::zero(); if active { grid.c_len() } else { 0 }];

        if active {
            let (i, j) = grid.coords(rank);
            for step in 0..q {
                multiply_accumulate(&mut c, &a, &b, grid.bm, grid.bk, grid.bn);
                if step + 1 < q {
                    a = comm.send_receive(
                        &a,
                        grid.rank_at(i, j + q - 1),
                        grid.rank_at(i, j + 1),
                        SHIFT_A_TAG,
                    )?;
                    b = comm.send_receive(
                        &b,
                        grid.rank_at(i + q - 1, j),
                        grid.rank_at(i + 1, j),
                        SHIFT_B_TAG,
                    )?;
                }
            }
        }

        let blocks = comm.gatherv(&c, &counts_for(grid.c_len()), ROOT)?;
        let [m, _, n] = self.shape;
        let mut product = DenseMatrix::zeros(m, n);
        if comm.is_root(ROOT) {
            for (r, block) in blocks.chunks_exact(grid.c_len().max(1)).enumerate().take(q * q) {
                let (i, j) = grid.coords(r);
                grid.place(&mut product, block, i, j);
            }
        }
        let mut data = product.into_data();
        comm.broadcast(&mut data, ROOT)?;
        self.output = DenseMatrix::new(m, n, data)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        let [m, _, n] = self.shape;
        if self.output.rows() != m || self.output.cols() != n {
            return Err(Error::InvalidInput("product has the wrong shape".into()));
        }
        Ok(())
    }
}
