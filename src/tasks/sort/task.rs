//! Sorting tasks
use super::{
    key::{is_sorted_by_key, SortKey},
    local::LocalSort,
    merge::{merge_blocks, MergeStrategy},
};
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::TaskKind,
};

fn check_sorted<T: SortKey>(output: &[T], len: usize) -> Result<()> {
    if output.len() != len {
        return Err(Error::InvalidInput(format!(
            "sorted output has {} elements, expected {len}",
            output.len()
        )));
    }
    if !is_sorted_by_key(output) {
        return Err(Error::InvalidInput("output is not sorted".into()));
    }
    Ok(())
}

/// Sort on a single process
#[derive(Debug)]
pub struct SortSeq<T: SortKey> {
    input: Vec<T>,
    output: Vec<T>,
    local_sort: LocalSort,
}

impl<T: SortKey> SortSeq<T> {
    /// Create the task
    pub fn new(input: Vec<T>, local_sort: LocalSort) -> Self {
        Self {
            input,
            output: vec![],
            local_sort,
        }
    }
}

impl<T: SortKey> Task for SortSeq<T> {
    type Input = Vec<T>;
    type Output = Vec<T>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &Vec<T> {
        &self.input
    }
    fn output(&self) -> &Vec<T> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.iter().all(|v| v.is_sortable())
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = self.input.clone();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.local_sort.sort(&mut self.output);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_sorted(&self.output, self.input.len())
    }
}

/// Sort distributed over the ranks of a communicator
///
/// The input is read on rank 0, scattered in blocks, sorted locally, merged across ranks with
/// the chosen strategy, gathered on rank 0 and broadcast so every rank holds the full result.
#[derive(Debug)]
pub struct SortDistributed<'a, C: Communicator, T: SortKey> {
    comm: &'a C,
    input: Vec<T>,
    output: Vec<T>,
    local_sort: LocalSort,
    strategy: MergeStrategy,
    len: usize,
}

impl<'a, C: Communicator, T: SortKey> SortDistributed<'a, C, T> {
    /// Create the task
    pub fn new(comm: &'a C, input: Vec<T>, local_sort: LocalSort, strategy: MergeStrategy) -> Self {
        Self {
            comm,
            input,
            output: vec![],
            local_sort,
            strategy,
            len: 0,
        }
    }
}

impl<C: Communicator, T: SortKey> Task for SortDistributed<'_, C, T> {
    type Input = Vec<T>;
    type Output = Vec<T>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &Vec<T> {
        &self.input
    }
    fn output(&self) -> &Vec<T> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.iter().all(|v| v.is_sortable()))
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.len = self.comm.broadcast_value(self.input.len(), ROOT)?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let size = comm.size();
        if self.len == 0 {
            self.output = vec![];
            return Ok(());
        }
        let dist = BlockDistribution::new(self.len, size);
        let mut block = comm.scatterv(&self.input, dist.counts(), ROOT)?;
        self.local_sort.sort(&mut block);

        let gathered = if self.strategy.needs_equal_blocks() {
            let width = dist.max_count();
            block.resize(width, T::sentinel());
            let block = merge_blocks(comm, block, self.strategy)?;
            let mut all = comm.gatherv(&block, &vec![width; size], ROOT)?;
            // Padding sorts last.
            all.truncate(self.len);
            all
        } else {
            merge_blocks(comm, block, self.strategy)?
        };

        self.output = if comm.is_root(ROOT) {
            gathered
        } else {
            vec![]
        };
        comm.broadcast(&mut self.output, ROOT)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_sorted(&self.output, self.len)
    }
}
