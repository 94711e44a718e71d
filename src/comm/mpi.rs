//! MPI backend
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    traits::Communicator,
    types::{Element, ReduceOp, Reducible, Tag},
};
use itertools::Itertools;
use mpi::{
    collective::SystemOperation,
    datatype::{Partition, PartitionMut},
    request::WaitGuard,
    traits::{Communicator as MpiCommunicator, CommunicatorCollectives, Destination, Root, Source},
};

/// A [Communicator] backed by an MPI communicator
///
/// All collectives are forwarded to the native MPI implementation.
#[derive(Debug)]
pub struct MpiComm<'a, C: MpiCommunicator> {
    comm: &'a C,
}

impl<'a, C: MpiCommunicator> MpiComm<'a, C> {
    /// Wrap an MPI communicator
    pub fn new(comm: &'a C) -> Self {
        Self { comm }
    }

    /// The wrapped MPI communicator
    pub fn inner(&self) -> &'a C {
        self.comm
    }

    fn check_rank(&self, rank: usize) -> Result<i32> {
        if rank >= self.size() {
            Err(Error::InvalidRank {
                rank,
                size: self.size(),
            })
        } else {
            Ok(rank as i32)
        }
    }
}

fn to_counts(values: &[usize]) -> Vec<i32> {
    values.iter().map(|&x| x as i32).collect_vec()
}

fn operation(op: ReduceOp) -> SystemOperation {
    match op {
        ReduceOp::Sum => SystemOperation::sum(),
        ReduceOp::Product => SystemOperation::product(),
        ReduceOp::Max => SystemOperation::max(),
        ReduceOp::Min => SystemOperation::min(),
    }
}

impl<C: MpiCommunicator> Communicator for MpiComm<'_, C> {
    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }

    fn size(&self) -> usize {
        self.comm.size() as usize
    }

    fn send<T: Element>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()> {
        let dest = self.check_rank(dest)?;
        self.comm.process_at_rank(dest).send_with_tag(data, tag);
        Ok(())
    }

    fn receive<T: Element>(&self, source: usize, tag: Tag) -> Result<Vec<T>> {
        let source = self.check_rank(source)?;
        let (data, _status) = self
            .comm
            .process_at_rank(source)
            .receive_vec_with_tag::<T>(tag);
        Ok(data)
    }

    fn send_receive<T: Element>(
        &self,
        data: &[T],
        dest: usize,
        source: usize,
        tag: Tag,
    ) -> Result<Vec<T>> {
        let dest = self.check_rank(dest)?;
        let source = self.check_rank(source)?;
        let received = mpi::request::scope(|scope| {
            let _guard = WaitGuard::from(
                self.comm
                    .process_at_rank(dest)
                    .immediate_send_with_tag(scope, data, tag),
            );
            let (r, _status) = self
                .comm
                .process_at_rank(source)
                .receive_vec_with_tag::<T>(tag);
            r
        });
        Ok(received)
    }

    fn barrier(&self) -> Result<()> {
        self.comm.barrier();
        Ok(())
    }

    fn broadcast<T: Element>(&self, data: &mut Vec<T>, root: usize) -> Result<()> {
        let root_process = self.comm.process_at_rank(self.check_rank(root)?);
        let mut len = data.len();
        root_process.broadcast_into(&mut len);
        data.resize(len, T::default());
        root_process.broadcast_into(&mut data[..]);
        Ok(())
    }

    fn scatterv<T: Element>(&self, sendbuf: &[T], counts: &[usize], root: usize) -> Result<Vec<T>> {
        let root_process = self.comm.process_at_rank(self.check_rank(root)?);
        if counts.len() != self.size() {
            return Err(Error::CountMismatch {
                send: counts.len(),
                recv: self.size(),
            });
        }
        let mut recvbuf = vec![T::default(); counts[self.rank()]];
        if self.rank() == root {
            let dist = BlockDistribution::from_counts(counts.to_vec());
            if sendbuf.len() < dist.total() {
                return Err(Error::BufferTooSmall {
                    needed: dist.total(),
                    got: sendbuf.len(),
                });
            }
            let send_partition = Partition::new(
                sendbuf,
                to_counts(dist.counts()),
                to_counts(dist.displacements()),
            );
            root_process.scatter_varcount_into_root(&send_partition, &mut recvbuf[..]);
        } else {
            root_process.scatter_varcount_into(&mut recvbuf[..]);
        }
        Ok(recvbuf)
    }

    fn gatherv<T: Element>(&self, local: &[T], counts: &[usize], root: usize) -> Result<Vec<T>> {
        let root_process = self.comm.process_at_rank(self.check_rank(root)?);
        if self.rank() == root {
            if counts.len() != self.size() {
                return Err(Error::CountMismatch {
                    send: counts.len(),
                    recv: self.size(),
                });
            }
            let dist = BlockDistribution::from_counts(counts.to_vec());
            let mut recvbuf = vec![T::default(); dist.total()];
            let mut partition = PartitionMut::new(
                &mut recvbuf[..],
                to_counts(dist.counts()),
                to_counts(dist.displacements()),
            );
            root_process.gather_varcount_into_root(local, &mut partition);
            Ok(recvbuf)
        } else {
            root_process.gather_varcount_into(local);
            Ok(vec![])
        }
    }

    fn all_gatherv<T: Element>(&self, local: &[T], counts: &[usize]) -> Result<Vec<T>> {
        if counts.len() != self.size() {
            return Err(Error::CountMismatch {
                send: counts.len(),
                recv: self.size(),
            });
        }
        let dist = BlockDistribution::from_counts(counts.to_vec());
        let mut recvbuf = vec![T::default(); dist.total()];
        let mut partition = PartitionMut::new(
            &mut recvbuf[..],
            to_counts(dist.counts()),
            to_counts(dist.displacements()),
        );
        self.comm.all_gather_varcount_into(local, &mut partition);
        Ok(recvbuf)
    }

    fn reduce<T: Reducible>(&self, local: &[T], op: ReduceOp, root: usize) -> Result<Vec<T>> {
        let root_process = self.comm.process_at_rank(self.check_rank(root)?);
        if self.rank() == root {
            let mut result = vec![T::default(); local.len()];
            root_process.reduce_into_root(local, &mut result[..], operation(op));
            Ok(result)
        } else {
            root_process.reduce_into(local, operation(op));
            Ok(vec![])
        }
    }

    fn all_reduce<T: Reducible>(&self, local: &[T], op: ReduceOp) -> Result<Vec<T>> {
        let mut result = vec![T::default(); local.len()];
        self.comm
            .all_reduce_into(local, &mut result[..], operation(op));
        Ok(result)
    }
}
