//! Communicators
use crate::{
    collectives,
    error::Result,
    types::{Element, ReduceOp, Reducible, Tag},
};

pub trait Communicator {
    //! A group of ranks that exchange messages
    //!
    //! Only the point-to-point methods are required. The collectives have default bodies
    //! built from point-to-point messages in binomial trees (see [crate::collectives]);
    //! backends with native collectives override them. Every rank of the group must call
    //! the collectives in the same order.

    /// Rank of this process
    fn rank(&self) -> usize;

    /// Number of ranks
    fn size(&self) -> usize;

    /// Send `data` to `dest`
    fn send<T: Element>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()>;

    /// Receive the next message from `source` with `tag`
    fn receive<T: Element>(&self, source: usize, tag: Tag) -> Result<Vec<T>>;

    /// Is this rank the root?
    fn is_root(&self, root: usize) -> bool {
        self.rank() == root
    }

    /// Send `data` to `dest` and receive a message from `source`
    fn send_receive<T: Element>(
        &self,
        data: &[T],
        dest: usize,
        source: usize,
        tag: Tag,
    ) -> Result<Vec<T>> {
        self.send(data, dest, tag)?;
        self.receive(source, tag)
    }

    /// Block until every rank has arrived
    fn barrier(&self) -> Result<()> {
        collectives::barrier(self)
    }

    /// Broadcast `data` from `root`. The length is taken from the root.
    fn broadcast<T: Element>(&self, data: &mut Vec<T>, root: usize) -> Result<()> {
        collectives::broadcast(self, data, root)
    }

    /// Broadcast a single value from `root`
    fn broadcast_value<T: Element>(&self, value: T, root: usize) -> Result<T> {
        let mut buffer = vec![value];
        self.broadcast(&mut buffer, root)?;
        Ok(buffer[0])
    }

    /// Broadcast a flag from `root`
    fn broadcast_flag(&self, flag: bool, root: usize) -> Result<bool> {
        Ok(self.broadcast_value(u8::from(flag), root)? != 0)
    }

    /// Scatter `counts[r]` consecutive elements of `sendbuf` to every rank `r`
    ///
    /// `sendbuf` is only read on the root. `counts` must agree on every rank.
    fn scatterv<T: Element>(&self, sendbuf: &[T], counts: &[usize], root: usize) -> Result<Vec<T>> {
        collectives::scatterv(self, sendbuf, counts, root)
    }

    /// Gather the local buffers of all ranks on `root`, in rank order
    ///
    /// `counts` is only read on the root. Other ranks receive an empty vector.
    fn gatherv<T: Element>(&self, local: &[T], counts: &[usize], root: usize) -> Result<Vec<T>> {
        collectives::gatherv(self, local, counts, root)
    }

    /// Gather the local buffers of all ranks on every rank, in rank order
    fn all_gatherv<T: Element>(&self, local: &[T], counts: &[usize]) -> Result<Vec<T>> {
        collectives::all_gatherv(self, local, counts)
    }

    /// Element-wise reduction onto `root`. Other ranks receive an empty vector.
    fn reduce<T: Reducible>(&self, local: &[T], op: ReduceOp, root: usize) -> Result<Vec<T>> {
        collectives::reduce(self, local, op, root)
    }

    /// Element-wise reduction onto every rank
    fn all_reduce<T: Reducible>(&self, local: &[T], op: ReduceOp) -> Result<Vec<T>> {
        collectives::all_reduce(self, local, op)
    }

    /// Reduction of a single value onto every rank
    fn all_reduce_scalar<T: Reducible>(&self, value: T, op: ReduceOp) -> Result<T> {
        Ok(self.all_reduce(&[value], op)?[0])
    }
}
