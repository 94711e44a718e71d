//! Merging sorted blocks across ranks
use super::{
    key::SortKey,
    local::{keep_high, keep_low, merge},
};
use crate::{error::Result, traits::Communicator, types::Tag};

const EXCHANGE_TAG: Tag = 100;
const TREE_TAG: Tag = 101;

/// How sorted blocks are combined across ranks
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeStrategy {
    /// `size` rounds of compare-split between alternating neighbours
    OddEvenTransposition,
    /// Compare-split along the comparators of Batcher's odd-even merge sort network
    BatcherNetwork,
    /// Pairwise merges along the dimensions of a hypercube towards rank 0
    HypercubeTree,
}

impl MergeStrategy {
    /// Every strategy
    pub const ALL: [MergeStrategy; 3] = [
        MergeStrategy::OddEvenTransposition,
        MergeStrategy::BatcherNetwork,
        MergeStrategy::HypercubeTree,
    ];

    /// Do all blocks need the same length?
    pub fn needs_equal_blocks(&self) -> bool {
        !matches!(self, MergeStrategy::HypercubeTree)
    }
}

// Exchange blocks with `partner` and keep the low or the high half.
fn compare_split<C: Communicator, T: SortKey>(
    comm: &C,
    block: &[T],
    partner: usize,
    keep_lower: bool,
) -> Result<Vec<T>> {
    let other = comm.send_receive(block, partner, partner, EXCHANGE_TAG)?;
    Ok(if keep_lower {
        keep_low(block, &other)
    } else {
        keep_high(block, &other)
    })
}

/// Odd-even transposition sort of equally sized sorted blocks
///
/// After the call the blocks are globally sorted in rank order.
pub fn odd_even_transposition<C: Communicator, T: SortKey>(
    comm: &C,
    mut block: Vec<T>,
) -> Result<Vec<T>> {
    let rank = comm.rank();
    let size = comm.size();
    for phase in 0..size {
        let partner = if (phase + rank) % 2 == 0 {
            rank + 1
        } else if rank > 0 {
            rank - 1
        } else {
            continue;
        };
        if partner >= size {
            continue;
        }
        block = compare_split(comm, &block, partner, rank < partner)?;
    }
    Ok(block)
}

/// Comparators of Batcher's odd-even merge sort on `size` wires
///
/// The network is built for the next power of two; comparators touching a wire `>= size` are
/// dropped, which is equivalent to feeding those wires with values larger than everything else.
pub fn batcher_comparators(size: usize) -> Vec<(usize, usize)> {
    let n = size.next_power_of_two();
    let mut comparators = vec![];
    let mut p = 1;
    while p < n {
        let mut k = p;
        while k >= 1 {
            let mut j = k % p;
            while j + k < n {
                for i in 0..k.min(n - j - k) {
                    if (i + j) / (2 * p) == (i + j + k) / (2 * p) && i + j + k < size {
                        comparators.push((i + j, i + j + k));
                    }
                }
                j += 2 * k;
            }
            k /= 2;
        }
        p *= 2;
    }
    comparators
}

/// Batcher odd-even merge network over equally sized sorted blocks
pub fn batcher_network<C: Communicator, T: SortKey>(comm: &C, mut block: Vec<T>) -> Result<Vec<T>> {
    let rank = comm.rank();
    for (low, high) in batcher_comparators(comm.size()) {
        if rank == low {
            block = compare_split(comm, &block, high, true)?;
        } else if rank == high {
            block = compare_split(comm, &block, low, false)?;
        }
    }
    Ok(block)
}

/// Merge sorted blocks of any length pairwise towards rank 0
///
/// Rank 0 returns the merged data; every other rank returns an empty vector.
pub fn hypercube_tree<C: Communicator, T: SortKey>(comm: &C, mut block: Vec<T>) -> Result<Vec<T>> {
    let rank = comm.rank();
    let size = comm.size();
    let mut step = 1;
    while step < size {
        if rank % (2 * step) == 0 {
            let partner = rank + step;
            if partner < size {
                let other = comm.receive::<T>(partner, TREE_TAG)?;
                block = merge(&block, &other);
            }
        } else {
            comm.send(&block, rank - step, TREE_TAG)?;
            return Ok(vec![]);
        }
        step *= 2;
    }
    Ok(block)
}

/// Merge equally sized (for compare-split strategies) sorted blocks with `strategy`
///
/// On return rank 0 holds, in order, the smallest elements; for compare-split strategies the
/// data is spread over all ranks in rank order, for the tree it sits on rank 0 alone.
pub fn merge_blocks<C: Communicator, T: SortKey>(
    comm: &C,
    block: Vec<T>,
    strategy: MergeStrategy,
) -> Result<Vec<T>> {
    tracing::debug!(?strategy, len = block.len(), "merging blocks");
    match strategy {
        MergeStrategy::OddEvenTransposition => odd_even_transposition(comm, block),
        MergeStrategy::BatcherNetwork => batcher_network(comm, block),
        MergeStrategy::HypercubeTree => hypercube_tree(comm, block),
    }
}
