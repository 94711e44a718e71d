//! Scatter, gather and broadcast as tasks built on the tree collectives
//!
//! These tasks exercise [crate::collectives] directly, independent of whatever native
//! collectives the communicator provides, and must reproduce the native results.
use crate::{
    collectives,
    error::{Error, Result},
    tasks::root_decides,
    traits::{Communicator, Task},
    types::{Element, TaskKind},
};

/// Buffer, per-rank count and root of a collective call
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollectiveInput<T> {
    /// Send buffer: the whole buffer on the root for scatter and broadcast, the local chunk for
    /// gather
    pub data: Vec<T>,
    /// Number of elements per rank
    pub count: usize,
    /// Root rank
    pub root: usize,
}

impl<T> CollectiveInput<T> {
    /// Create the input
    pub fn new(data: Vec<T>, count: usize, root: usize) -> Self {
        Self { data, count, root }
    }
}

macro_rules! collective_task {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name<'a, C: Communicator, T: Element> {
            comm: &'a C,
            input: CollectiveInput<T>,
            output: Vec<T>,
        }

        impl<'a, C: Communicator, T: Element> $name<'a, C, T> {
            /// Create the task
            pub fn new(comm: &'a C, input: CollectiveInput<T>) -> Self {
                Self {
                    comm,
                    input,
                    output: vec![],
                }
            }
        }
    };
}

macro_rules! task_accessors {
    ($kind:ident) => {
        type Input = CollectiveInput<T>;
        type Output = Vec<T>;

        fn kind(&self) -> TaskKind {
            TaskKind::$kind
        }
        fn input(&self) -> &CollectiveInput<T> {
            &self.input
        }
        fn output(&self) -> &Vec<T> {
            &self.output
        }
    };
}

fn check_len<T>(output: &[T], expected: usize) -> Result<()> {
    if output.len() == expected {
        Ok(())
    } else {
        Err(Error::CountMismatch {
            send: expected,
            recv: output.len(),
        })
    }
}

collective_task!(
    /// Scatter of `count` elements per rank; each rank's output is its own chunk
    ScatterTask
);

impl<C: Communicator, T: Element> Task for ScatterTask<'_, C, T> {
    task_accessors!(Distributed);

    fn validation(&mut self) -> bool {
        let size = self.comm.size();
        root_decides(self.comm, || self.input.root < size)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output.clear();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let CollectiveInput { data, count, root } = &self.input;
        self.output = collectives::scatter(self.comm, data, *count, *count, *root)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_len(&self.output, self.input.count)
    }
}

collective_task!(
    /// Gather of `count` elements from every rank; the root's result is broadcast
    GatherTask
);

impl<C: Communicator, T: Element> Task for GatherTask<'_, C, T> {
    task_accessors!(Distributed);

    fn validation(&mut self) -> bool {
        let size = self.comm.size();
        root_decides(self.comm, || self.input.root < size)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output.clear();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let CollectiveInput { data, count, root } = &self.input;
        self.output = collectives::gather(self.comm, data, *count, *count, *root)?;
        collectives::broadcast(self.comm, &mut self.output, *root)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_len(&self.output, self.input.count * self.comm.size())
    }
}

collective_task!(
    /// Broadcast of the root's buffer
    BroadcastTask
);

impl<C: Communicator, T: Element> Task for BroadcastTask<'_, C, T> {
    task_accessors!(Distributed);

    fn validation(&mut self) -> bool {
        let size = self.comm.size();
        root_decides(self.comm, || self.input.root < size)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = if self.comm.is_root(self.input.root) {
            self.input.data.clone()
        } else {
            vec![]
        };
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        collectives::broadcast(self.comm, &mut self.output, self.input.root)
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A collective on a single process: every chunk belongs to rank 0
#[derive(Debug)]
pub struct CollectiveSeq<T: Element> {
    input: CollectiveInput<T>,
    output: Vec<T>,
}

impl<T: Element> CollectiveSeq<T> {
    /// Create the task
    pub fn new(input: CollectiveInput<T>) -> Self {
        Self {
            input,
            output: vec![],
        }
    }
}

impl<T: Element> Task for CollectiveSeq<T> {
    task_accessors!(Sequential);

    fn validation(&mut self) -> bool {
        self.input.root == 0 && self.input.data.len() >= self.input.count
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output.clear();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.output = self.input.data[..self.input.count].to_vec();
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_len(&self.output, self.input.count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::partition::BlockDistribution;
    use crate::runner::run_pipeline;
    use std::time::Duration;

    #[test]
    fn test_scatter_matches_native() {
        for size in 1..=4 {
            for root in 0..size {
                let input = CollectiveInput::new((0..3 * size as i32).collect(), 3, root);
                let outputs = LocalUniverse::new(size)
                    .run(|comm| {
                        let custom = run_pipeline(ScatterTask::new(comm, input.clone()))?;
                        let native = comm.scatterv(&input.data, &vec![3; size], root)?;
                        Ok((custom, native))
                    })
                    .unwrap();
                for (rank, (custom, native)) in outputs.into_iter().enumerate() {
                    assert_eq!(custom, native);
                    let layout = BlockDistribution::new(3 * size, size);
                    assert_eq!(custom, layout.chunk(&input.data, rank));
                }
            }
        }
    }

    #[test]
    fn test_scatter_count_too_large() {
        let input = CollectiveInput::new(vec![1.0_f64; 4], 3, 0);
        let result = LocalUniverse::new(2)
            .with_timeout(Duration::from_millis(200))
            .run(|comm| run_pipeline(ScatterTask::new(comm, input.clone())));
        assert!(matches!(
            result,
            Err(Error::BufferTooSmall { needed: 6, got: 4 })
        ));
    }

    #[test]
    fn test_gather() {
        for size in 1..=4 {
            let root = size - 1;
            let outputs = LocalUniverse::new(size)
                .run(|comm| {
                    let rank = comm.rank() as u64;
                    let input = CollectiveInput::new(vec![10 * rank, 10 * rank + 1], 2, root);
                    run_pipeline(GatherTask::new(comm, input))
                })
                .unwrap();
            let expected = (0..size as u64)
                .flat_map(|r| [10 * r, 10 * r + 1])
                .collect::<Vec<_>>();
            for gathered in outputs {
                assert_eq!(gathered, expected);
            }
        }
    }

    #[test]
    fn test_broadcast() {
        let outputs = LocalUniverse::new(3)
            .run(|comm| {
                let data = if comm.rank() == 2 { vec![4_u8, 5, 6] } else { vec![] };
                run_pipeline(BroadcastTask::new(comm, CollectiveInput::new(data, 3, 2)))
            })
            .unwrap();
        assert_eq!(outputs, vec![vec![4, 5, 6]; 3]);
    }

    #[test]
    fn test_invalid_root() {
        let input = CollectiveInput::new(vec![1, 2, 3], 1, 3);
        let result = LocalUniverse::new(3)
            .run(|comm| run_pipeline(BroadcastTask::new(comm, input.clone())));
        assert!(matches!(result, Err(Error::ValidationFailed)));
    }

    #[test]
    fn test_seq() {
        let input = CollectiveInput::new(vec![7, 8, 9], 2, 0);
        let output = run_pipeline(CollectiveSeq::new(input)).unwrap();
        assert_eq!(output, vec![7, 8]);
    }
}
