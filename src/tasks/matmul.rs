//! Matrix multiplication: row striped dense, Cannon's algorithm, CRS and CCS sparse
mod cannon;
mod dense;
mod sparse;

pub use cannon::{grid_side, CannonDistributed, CannonSeq};
pub use dense::{DenseMultiplyDistributed, DenseMultiplySeq};
pub use sparse::{
    crs_multiply, CcsMultiplyDistributed, CcsMultiplySeq, CrsMultiplyDistributed, CrsMultiplySeq,
};

use crate::{error::Result, traits::Communicator, types::Element};

/// The two factors of a product `a * b`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatrixPair<M> {
    /// Left factor
    pub a: M,
    /// Right factor
    pub b: M,
}

impl<M> MatrixPair<M> {
    /// Create a pair
    pub fn new(a: M, b: M) -> Self {
        Self { a, b }
    }
}

/// `c += a * b` for row-major blocks of shape `rows x inner` and `inner x cols`
pub(crate) fn multiply_accumulate<T: num::Num + Copy + std::ops::AddAssign>(
    c: &mut [T],
    a: &[T],
    b: &[T],
    rows: usize,
    inner: usize,
    cols: usize,
) {
    for i in 0..rows {
        for t in 0..inner {
            let a_it = a[i * inner + t];
            if a_it.is_zero() {
                continue;
            }
            let b_row = &b[t * cols..(t + 1) * cols];
            for (c_ij, &b_tj) in c[i * cols..(i + 1) * cols].iter_mut().zip(b_row) {
                *c_ij += a_it * b_tj;
            }
        }
    }
}

// Shape `[m, k, n]` of a product, known on the root and shared with every rank.
pub(crate) fn share_shape<C: Communicator>(comm: &C, shape: [usize; 3]) -> Result<[usize; 3]> {
    let mut buffer = shape.to_vec();
    comm.broadcast(&mut buffer, crate::tasks::ROOT)?;
    Ok([buffer[0], buffer[1], buffer[2]])
}

// Share a whole vector from the root.
pub(crate) fn share<C: Communicator, T: Element>(comm: &C, data: &[T]) -> Result<Vec<T>> {
    let mut buffer = if comm.is_root(crate::tasks::ROOT) {
        data.to_vec()
    } else {
        vec![]
    };
    comm.broadcast(&mut buffer, crate::tasks::ROOT)?;
    Ok(buffer)
}
