//! Collective operations built from point-to-point messages
//!
//! Broadcast, scatter, gather and reduce all walk a binomial tree over ranks renumbered
//! relative to the root: rank `v` receives from `v - m`, where `m` is its lowest set bit, and
//! forwards to `v + m'` for every `m' < m`. A subtree therefore always covers a contiguous
//! range of relative ranks, which is what lets scatter and gather ship one contiguous buffer
//! per edge.
//!
//! These are the default bodies of the [Communicator] collectives and also serve the
//! custom collective tasks, which must reproduce the native result exactly.
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    traits::Communicator,
    types::{Element, ReduceOp, Reducible, Tag},
};

const BROADCAST_TAG: Tag = 32_001;
const SCATTER_TAG: Tag = 32_002;
const GATHER_TAG: Tag = 32_003;
const REDUCE_TAG: Tag = 32_004;

fn check_root<C: Communicator + ?Sized>(comm: &C, root: usize) -> Result<()> {
    if root >= comm.size() {
        Err(Error::InvalidRank {
            rank: root,
            size: comm.size(),
        })
    } else {
        Ok(())
    }
}

fn check_counts(counts: &[usize], size: usize) -> Result<()> {
    if counts.len() != size {
        Err(Error::InvalidInput(format!(
            "{} counts given for {size} ranks",
            counts.len()
        )))
    } else {
        Ok(())
    }
}

// Rank renumbering so that the root becomes rank 0.
fn relative(rank: usize, root: usize, size: usize) -> usize {
    (rank + size - root) % size
}

fn absolute(vrank: usize, root: usize, size: usize) -> usize {
    (vrank + root) % size
}

/// Binomial tree broadcast
pub fn broadcast<C: Communicator + ?Sized, T: Element>(
    comm: &C,
    data: &mut Vec<T>,
    root: usize,
) -> Result<()> {
    check_root(comm, root)?;
    let size = comm.size();
    let vrank = relative(comm.rank(), root, size);

    let mut mask = 1;
    while mask < size {
        if vrank & mask != 0 {
            *data = comm.receive(absolute(vrank - mask, root, size), BROADCAST_TAG)?;
            break;
        }
        mask <<= 1;
    }
    mask >>= 1;
    while mask > 0 {
        if vrank + mask < size {
            comm.send(data, absolute(vrank + mask, root, size), BROADCAST_TAG)?;
        }
        mask >>= 1;
    }
    Ok(())
}

/// Binomial tree scatter of variable sized chunks
///
/// Rank `r` receives `counts[r]` elements taken from `sendbuf` at the exclusive prefix sum of
/// `counts`. `sendbuf` is only read on the root.
pub fn scatterv<C: Communicator + ?Sized, T: Element>(
    comm: &C,
    sendbuf: &[T],
    counts: &[usize],
    root: usize,
) -> Result<Vec<T>> {
    check_root(comm, root)?;
    let size = comm.size();
    check_counts(counts, size)?;
    let vrank = relative(comm.rank(), root, size);

    let relative_layout = BlockDistribution::from_counts(
        (0..size)
            .map(|v| counts[absolute(v, root, size)])
            .collect(),
    );

    let mut buffer = if vrank == 0 {
        let layout = BlockDistribution::from_counts(counts.to_vec());
        if sendbuf.len() < layout.total() {
            return Err(Error::BufferTooSmall {
                needed: layout.total(),
                got: sendbuf.len(),
            });
        }
        // Reorder the chunks so that subtrees are contiguous.
        let mut buffer = Vec::with_capacity(layout.total());
        for v in 0..size {
            buffer.extend_from_slice(layout.chunk(sendbuf, absolute(v, root, size)));
        }
        buffer
    } else {
        Vec::new()
    };

    let mut mask = 1;
    while mask < size {
        if vrank & mask != 0 {
            buffer = comm.receive(absolute(vrank - mask, root, size), SCATTER_TAG)?;
            break;
        }
        mask <<= 1;
    }
    mask >>= 1;

    let base = relative_layout.displacement(vrank);
    while mask > 0 {
        let child = vrank + mask;
        if child < size {
            let end = (child + mask).min(size);
            let start = relative_layout.displacement(child) - base;
            let stop = relative_layout.displacement(end) - base;
            comm.send(&buffer[start..stop], absolute(child, root, size), SCATTER_TAG)?;
        }
        mask >>= 1;
    }

    buffer.truncate(relative_layout.count(vrank));
    Ok(buffer)
}

/// Binomial tree gather of variable sized chunks
///
/// The root returns the concatenation of all local buffers in rank order; `counts` is only
/// checked there. Other ranks return an empty vector.
pub fn gatherv<C: Communicator + ?Sized, T: Element>(
    comm: &C,
    local: &[T],
    counts: &[usize],
    root: usize,
) -> Result<Vec<T>> {
    check_root(comm, root)?;
    let size = comm.size();
    let vrank = relative(comm.rank(), root, size);

    let mut buffer = local.to_vec();
    let mut mask = 1;
    while mask < size {
        if vrank & mask == 0 {
            let child = vrank + mask;
            if child < size {
                buffer.extend(comm.receive::<T>(absolute(child, root, size), GATHER_TAG)?);
            }
        } else {
            comm.send(&buffer, absolute(vrank - mask, root, size), GATHER_TAG)?;
            return Ok(Vec::new());
        }
        mask <<= 1;
    }

    check_counts(counts, size)?;
    let layout = BlockDistribution::from_counts(counts.to_vec());
    if layout.total() != buffer.len() {
        return Err(Error::CountMismatch {
            send: buffer.len(),
            recv: layout.total(),
        });
    }
    if root == 0 {
        return Ok(buffer);
    }

    let relative_layout = BlockDistribution::from_counts(
        (0..size)
            .map(|v| counts[absolute(v, root, size)])
            .collect(),
    );
    let mut out = Vec::with_capacity(buffer.len());
    for r in 0..size {
        out.extend_from_slice(relative_layout.chunk(&buffer, relative(r, root, size)));
    }
    Ok(out)
}

/// Binomial tree element-wise reduction
///
/// The root returns the reduced vector, other ranks an empty vector. Every rank must
/// contribute the same number of elements.
pub fn reduce<C: Communicator + ?Sized, T: Reducible>(
    comm: &C,
    local: &[T],
    op: ReduceOp,
    root: usize,
) -> Result<Vec<T>> {
    check_root(comm, root)?;
    let size = comm.size();
    let vrank = relative(comm.rank(), root, size);

    let mut acc = local.to_vec();
    let mut mask = 1;
    while mask < size {
        if vrank & mask == 0 {
            let child = vrank + mask;
            if child < size {
                let other = comm.receive::<T>(absolute(child, root, size), REDUCE_TAG)?;
                if other.len() != acc.len() {
                    return Err(Error::CountMismatch {
                        send: other.len(),
                        recv: acc.len(),
                    });
                }
                op.apply_into(&mut acc, &other);
            }
        } else {
            comm.send(&acc, absolute(vrank - mask, root, size), REDUCE_TAG)?;
            return Ok(Vec::new());
        }
        mask <<= 1;
    }
    Ok(acc)
}

/// Reduction to rank 0 followed by a broadcast
pub fn all_reduce<C: Communicator + ?Sized, T: Reducible>(
    comm: &C,
    local: &[T],
    op: ReduceOp,
) -> Result<Vec<T>> {
    let mut result = reduce(comm, local, op, 0)?;
    broadcast(comm, &mut result, 0)?;
    Ok(result)
}

/// Gather to rank 0 followed by a broadcast
pub fn all_gatherv<C: Communicator + ?Sized, T: Element>(
    comm: &C,
    local: &[T],
    counts: &[usize],
) -> Result<Vec<T>> {
    let mut result = gatherv(comm, local, counts, 0)?;
    broadcast(comm, &mut result, 0)?;
    Ok(result)
}

/// Barrier as an empty reduction followed by an empty broadcast
pub fn barrier<C: Communicator + ?Sized>(comm: &C) -> Result<()> {
    let mut token = reduce::<C, u8>(comm, &[], ReduceOp::Sum, 0)?;
    broadcast(comm, &mut token, 0)
}

/// Scatter with the MPI argument contract
///
/// Every rank receives `recvcount` elements; the root sends `sendcount` elements to each rank
/// from consecutive blocks of `sendbuf`. Counts must agree and the root's buffer must hold
/// `sendcount * size` elements.
pub fn scatter<C: Communicator + ?Sized, T: Element>(
    comm: &C,
    sendbuf: &[T],
    sendcount: usize,
    recvcount: usize,
    root: usize,
) -> Result<Vec<T>> {
    check_root(comm, root)?;
    if sendcount != recvcount {
        return Err(Error::CountMismatch {
            send: sendcount,
            recv: recvcount,
        });
    }
    let size = comm.size();
    if comm.is_root(root) && sendbuf.len() < sendcount * size {
        return Err(Error::BufferTooSmall {
            needed: sendcount * size,
            got: sendbuf.len(),
        });
    }
    tracing::trace!(rank = comm.rank(), root, sendcount, "tree scatter");
    scatterv(comm, sendbuf, &vec![recvcount; size], root)
}

/// Gather with the MPI argument contract
///
/// Every rank sends the first `sendcount` elements of `sendbuf`; the root receives `recvcount`
/// elements from each rank, in rank order.
pub fn gather<C: Communicator + ?Sized, T: Element>(
    comm: &C,
    sendbuf: &[T],
    sendcount: usize,
    recvcount: usize,
    root: usize,
) -> Result<Vec<T>> {
    check_root(comm, root)?;
    if sendcount != recvcount {
        return Err(Error::CountMismatch {
            send: sendcount,
            recv: recvcount,
        });
    }
    if sendbuf.len() < sendcount {
        return Err(Error::BufferTooSmall {
            needed: sendcount,
            got: sendbuf.len(),
        });
    }
    tracing::trace!(rank = comm.rank(), root, sendcount, "tree gather");
    gatherv(comm, &sendbuf[..sendcount], &vec![recvcount; comm.size()], root)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::{LocalUniverse, SingleProcess};

    #[test]
    fn test_relative_ranks() {
        for size in 1..6 {
            for root in 0..size {
                assert_eq!(relative(root, root, size), 0);
                for r in 0..size {
                    assert_eq!(absolute(relative(r, root, size), root, size), r);
                }
            }
        }
    }

    #[test]
    fn test_broadcast_every_root() {
        for size in 1..7 {
            for root in 0..size {
                let results = LocalUniverse::new(size)
                    .run(|comm| {
                        let mut data = if comm.rank() == root {
                            vec![root as i64, 7, 8]
                        } else {
                            vec![]
                        };
                        broadcast(comm, &mut data, root)?;
                        Ok(data)
                    })
                    .unwrap();
                for data in results {
                    assert_eq!(data, vec![root as i64, 7, 8]);
                }
            }
        }
    }

    #[test]
    fn test_scatterv_gatherv_every_root() {
        for size in 1..7 {
            let counts = (0..size).map(|r| (r * 2 + 1) % 4).collect::<Vec<_>>();
            let total: usize = counts.iter().sum();
            let data = (0..total).collect::<Vec<usize>>();
            let layout = BlockDistribution::from_counts(counts.clone());
            for root in 0..size {
                let results = LocalUniverse::new(size)
                    .run(|comm| {
                        let sendbuf = if comm.rank() == root { data.clone() } else { vec![] };
                        let chunk = scatterv(comm, &sendbuf, &counts, root)?;
                        let gathered = gatherv(comm, &chunk, &counts, root)?;
                        Ok((chunk, gathered))
                    })
                    .unwrap();
                for (rank, (chunk, gathered)) in results.into_iter().enumerate() {
                    assert_eq!(chunk, layout.chunk(&data, rank));
                    if rank == root {
                        assert_eq!(gathered, data);
                    } else {
                        assert!(gathered.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_reduce_and_all_reduce() {
        for size in 1..6 {
            let results = LocalUniverse::new(size)
                .run(|comm| {
                    let local = [comm.rank() as i64, 1];
                    let reduced = reduce(comm, &local, ReduceOp::Sum, size - 1)?;
                    let maxed = all_reduce(comm, &local, ReduceOp::Max)?;
                    Ok((reduced, maxed))
                })
                .unwrap();
            let rank_sum = (0..size as i64).sum::<i64>();
            for (rank, (reduced, maxed)) in results.into_iter().enumerate() {
                if rank == size - 1 {
                    assert_eq!(reduced, vec![rank_sum, size as i64]);
                } else {
                    assert!(reduced.is_empty());
                }
                assert_eq!(maxed, vec![size as i64 - 1, 1]);
            }
        }
    }

    #[test]
    fn test_all_gatherv_and_barrier() {
        let results = LocalUniverse::new(4)
            .run(|comm| {
                comm.barrier()?;
                let local = vec![comm.rank() as u32; comm.rank()];
                all_gatherv(comm, &local, &[0, 1, 2, 3])
            })
            .unwrap();
        for gathered in results {
            assert_eq!(gathered, vec![1, 2, 2, 3, 3, 3]);
        }
    }

    #[test]
    fn test_scatter_contract() {
        let results = LocalUniverse::new(3)
            .run(|comm| {
                let sendbuf = (0..6).map(|i| i as f64).collect::<Vec<_>>();
                let mismatch = scatter(comm, &sendbuf, 2, 3, 0).is_err();
                let chunk = scatter(comm, &sendbuf, 2, 2, 1)?;
                Ok((mismatch, chunk))
            })
            .unwrap();
        for (rank, (mismatch, chunk)) in results.into_iter().enumerate() {
            assert!(mismatch);
            assert_eq!(chunk, vec![2.0 * rank as f64, 2.0 * rank as f64 + 1.0]);
        }
    }

    #[test]
    fn test_scatter_checks_root_buffer() {
        let comm = SingleProcess::new();
        assert!(matches!(
            scatter(&comm, &[1, 2], 3, 3, 0),
            Err(Error::BufferTooSmall { needed: 3, got: 2 })
        ));
        assert!(matches!(
            scatter(&comm, &[1, 2], 1, 1, 1),
            Err(Error::InvalidRank { rank: 1, size: 1 })
        ));
        assert_eq!(scatter(&comm, &[1, 2], 1, 1, 0).unwrap(), vec![1]);
    }

    #[test]
    fn test_gather_contract() {
        let results = LocalUniverse::new(3)
            .run(|comm| {
                let sendbuf = vec![comm.rank() as i32; 4];
                gather(comm, &sendbuf, 2, 2, 2)
            })
            .unwrap();
        assert!(results[0].is_empty());
        assert!(results[1].is_empty());
        assert_eq!(results[2], vec![0, 0, 1, 1, 2, 2]);
    }
}
