//! Single process backend
use crate::{
    error::{Error, Result},
    traits::Communicator,
    types::{Element, Tag},
};
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;

/// Communicator consisting of one rank
///
/// Messages to self are queued; all collectives degenerate to copies.
#[derive(Default)]
pub struct SingleProcess {
    queue: RefCell<VecDeque<(Tag, Box<dyn Any + Send>)>>,
}

impl SingleProcess {
    /// Create new
    pub fn new() -> Self {
        Self::default()
    }

    fn check_rank(rank: usize) -> Result<()> {
        if rank != 0 {
            Err(Error::InvalidRank { rank, size: 1 })
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for SingleProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleProcess")
            .field("queued", &self.queue.borrow().len())
            .finish()
    }
}

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send<T: Element>(&self, data: &[T], dest: usize, tag: Tag) -> Result<()> {
        Self::check_rank(dest)?;
        self.queue
            .borrow_mut()
            .push_back((tag, Box::new(data.to_vec())));
        Ok(())
    }

    fn receive<T: Element>(&self, source: usize, tag: Tag) -> Result<Vec<T>> {
        Self::check_rank(source)?;
        let mut queue = self.queue.borrow_mut();
        let pos = queue
            .iter()
            .position(|(t, _)| *t == tag)
            .ok_or(Error::NoMessage { from: source, tag })?;
        let (_, payload) = queue.remove(pos).ok_or(Error::NoMessage { from: source, tag })?;
        payload
            .downcast::<Vec<T>>()
            .map(|data| *data)
            .map_err(|_| Error::TypeMismatch { from: source, tag })
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn broadcast<T: Element>(&self, _data: &mut Vec<T>, root: usize) -> Result<()> {
        Self::check_rank(root)
    }

    fn gatherv<T: Element>(&self, local: &[T], _counts: &[usize], root: usize) -> Result<Vec<T>> {
        Self::check_rank(root)?;
        Ok(local.to_vec())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::ReduceOp;

    #[test]
    fn test_rank_and_size() {
        let comm = SingleProcess::new();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        assert!(comm.is_root(0));
    }

    #[test]
    fn test_self_messages() {
        let comm = SingleProcess::new();
        comm.send(&[1.0, 2.0], 0, 3).unwrap();
        comm.send(&[4_i32], 0, 4).unwrap();
        assert_eq!(comm.receive::<i32>(0, 4).unwrap(), vec![4]);
        assert!(matches!(
            comm.receive::<i32>(0, 3),
            Err(Error::TypeMismatch { from: 0, tag: 3 })
        ));
        assert!(matches!(
            comm.receive::<f64>(0, 3),
            Err(Error::NoMessage { from: 0, tag: 3 })
        ));
        assert!(comm.send(&[1], 1, 0).is_err());
    }

    #[test]
    fn test_collectives_are_copies() {
        let comm = SingleProcess::new();
        let mut data = vec![1, 2, 3];
        comm.broadcast(&mut data, 0).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(comm.scatterv(&data, &[3], 0).unwrap(), data);
        assert_eq!(comm.gatherv(&data, &[3], 0).unwrap(), data);
        assert_eq!(comm.all_reduce(&data, ReduceOp::Sum).unwrap(), data);
        assert_eq!(comm.all_reduce_scalar(5.0, ReduceOp::Max).unwrap(), 5.0);
        assert!(comm.broadcast_flag(true, 0).unwrap());
    }
}
