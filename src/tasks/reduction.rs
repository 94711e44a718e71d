//! Reductions of vectors: a [ReduceOp] over all elements and the dot product
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{ReduceOp, Reducible, TaskKind},
};
use itertools::Itertools;

/// A vector and the operator to fold it with
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReduceInput<T> {
    /// Values to fold
    pub values: Vec<T>,
    /// Operator
    pub op: ReduceOp,
}

impl<T> ReduceInput<T> {
    /// Create the input
    pub fn new(values: Vec<T>, op: ReduceOp) -> Self {
        Self { values, op }
    }
}

/// Fold a vector on a single process
#[derive(Debug)]
pub struct VectorReduceSeq<T: Reducible> {
    input: ReduceInput<T>,
    output: T,
}

impl<T: Reducible> VectorReduceSeq<T> {
    /// Create the task
    pub fn new(input: ReduceInput<T>) -> Self {
        Self {
            input,
            output: T::default(),
        }
    }
}

impl<T: Reducible> Task for VectorReduceSeq<T> {
    type Input = ReduceInput<T>;
    type Output = T;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &ReduceInput<T> {
        &self.input
    }
    fn output(&self) -> &T {
        &self.output
    }

    fn validation(&mut self) -> bool {
        !self.input.values.is_empty()
    }

    fn pre_processing(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.output = self
            .input
            .op
            .fold(&self.input.values)
            .ok_or_else(|| Error::InvalidInput("nothing to reduce".into()))?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fold a vector distributed in blocks
///
/// Every non-empty block is folded locally. The partial results are all-gathered and folded in
/// rank order, so ranks without elements contribute nothing and need no neutral element.
#[derive(Debug)]
pub struct VectorReduceDistributed<'a, C: Communicator, T: Reducible> {
    comm: &'a C,
    input: ReduceInput<T>,
    output: T,
    dist: Option<BlockDistribution>,
}

impl<'a, C: Communicator, T: Reducible> VectorReduceDistributed<'a, C, T> {
    /// Create the task
    pub fn new(comm: &'a C, input: ReduceInput<T>) -> Self {
        Self {
            comm,
            input,
            output: T::default(),
            dist: None,
        }
    }
}

fn op_code(op: ReduceOp) -> u8 {
    match op {
        ReduceOp::Sum => 0,
        ReduceOp::Product => 1,
        ReduceOp::Max => 2,
        ReduceOp::Min => 3,
    }
}

fn op_from_code(code: u8) -> Result<ReduceOp> {
    match code {
        0 => Ok(ReduceOp::Sum),
        1 => Ok(ReduceOp::Product),
        2 => Ok(ReduceOp::Max),
        3 => Ok(ReduceOp::Min),
        _ => Err(Error::InvalidInput(format!("unknown reduction code {code}"))),
    }
}

impl<C: Communicator, T: Reducible> Task for VectorReduceDistributed<'_, C, T> {
    type Input = ReduceInput<T>;
    type Output = T;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &ReduceInput<T> {
        &self.input
    }
    fn output(&self) -> &T {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || !self.input.values.is_empty())
    }

    fn pre_processing(&mut self) -> Result<()> {
        let comm = self.comm;
        let n = comm.broadcast_value(self.input.values.len(), ROOT)?;
        self.input.op = op_from_code(comm.broadcast_value(op_code(self.input.op), ROOT)?)?;
        self.dist = Some(BlockDistribution::new(n, comm.size()));
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let op = self.input.op;
        let dist = self.dist.as_ref().ok_or(Error::NotPreProcessed)?;
        let local = comm.scatterv(&self.input.values, dist.counts(), ROOT)?;
        let partial = op.fold(&local).into_iter().collect_vec();
        let counts = dist.counts().iter().map(|&c| usize::from(c > 0)).collect_vec();
        let partials = comm.all_gatherv(&partial, &counts)?;
        self.output = op
            .fold(&partials)
            .ok_or_else(|| Error::InvalidInput("nothing to reduce".into()))?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Two vectors of equal length
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorPair<T> {
    /// Left operand
    pub a: Vec<T>,
    /// Right operand
    pub b: Vec<T>,
}

impl<T> VectorPair<T> {
    /// Create the pair
    pub fn new(a: Vec<T>, b: Vec<T>) -> Self {
        Self { a, b }
    }

    fn is_valid(&self) -> bool {
        self.a.len() == self.b.len()
    }
}

fn dot<T: Reducible>(a: &[T], b: &[T]) -> T {
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Dot product on a single process
#[derive(Debug)]
pub struct DotProductSeq<T: Reducible> {
    input: VectorPair<T>,
    output: T,
}

impl<T: Reducible> DotProductSeq<T> {
    /// Create the task
    pub fn new(input: VectorPair<T>) -> Self {
        Self {
            input,
            output: T::zero(),
        }
    }
}

impl<T: Reducible> Task for DotProductSeq<T> {
    type Input = VectorPair<T>;
    type Output = T;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &VectorPair<T> {
        &self.input
    }
    fn output(&self) -> &T {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.is_valid()
    }

    fn pre_processing(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.output = dot(&self.input.a, &self.input.b);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Dot product of vectors distributed in blocks, with the partial sums all-reduced
#[derive(Debug)]
pub struct DotProductDistributed<'a, C: Communicator, T: Reducible> {
    comm: &'a C,
    input: VectorPair<T>,
    output: T,
    dist: Option<BlockDistribution>,
}

impl<'a, C: Communicator, T: Reducible> DotProductDistributed<'a, C, T> {
    /// Create the task
    pub fn new(comm: &'a C, input: VectorPair<T>) -> Self {
        Self {
            comm,
            input,
            output: T::zero(),
            dist: None,
        }
    }
}

impl<C: Communicator, T: Reducible> Task for DotProductDistributed<'_, C, T> {
    type Input = VectorPair<T>;
    type Output = T;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &VectorPair<T> {
        &self.input
    }
    fn output(&self) -> &T {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.is_valid())
    }

    fn pre_processing(&mut self) -> Result<()> {
        let n = self.comm.broadcast_value(self.input.a.len(), ROOT)?;
        self.dist = Some(BlockDistribution::new(n, self.comm.size()));
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let dist = self.dist.as_ref().ok_or(Error::NotPreProcessed)?;
        let a = comm.scatterv(&self.input.a, dist.counts(), ROOT)?;
        let b = comm.scatterv(&self.input.b, dist.counts(), ROOT)?;
        self.output = comm.all_reduce_scalar(dot(&a, &b), ReduceOp::Sum)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::runner::{run_pipeline, TaskRunner};
    use approx::assert_relative_eq;
    use paste::paste;

    macro_rules! reduce_tests {
        ($($op:ident => $expected:expr),*) => {
            $(
                paste! {
                    #[test]
                    fn [<test_reduce_ $op:lower>]() {
                        let values = vec![3_i64, -7, 12, 5, -1, 4, 2];
                        let input = ReduceInput::new(values, ReduceOp::$op);
                        assert_eq!(run_pipeline(VectorReduceSeq::new(input.clone())).unwrap(), $expected);
                        for size in 1..=4 {
                            let outputs = LocalUniverse::new(size)
                                .run(|comm| run_pipeline(VectorReduceDistributed::new(comm, input.clone())))
                                .unwrap();
                            assert_eq!(outputs, vec![$expected; size]);
                        }
                    }
                }
            )*
        };
    }

    reduce_tests!(Sum => 18, Product => 10080, Max => 12, Min => -7);

    #[test]
    fn test_reduce_fewer_values_than_ranks() {
        let input = ReduceInput::new(vec![-2.5_f64, 1.0], ReduceOp::Min);
        let outputs = LocalUniverse::new(4)
            .run(|comm| run_pipeline(VectorReduceDistributed::new(comm, input.clone())))
            .unwrap();
        assert_eq!(outputs, vec![-2.5; 4]);
    }

    #[test]
    fn test_reduce_empty_fails_validation() {
        let mut runner = TaskRunner::new(VectorReduceSeq::new(ReduceInput::<i32>::new(
            vec![],
            ReduceOp::Sum,
        )));
        assert!(matches!(runner.validation(), Err(Error::ValidationFailed)));
    }

    #[test]
    fn test_dot_product() {
        let a = (0..100).map(|i| i as f64 * 0.5).collect_vec();
        let b = (0..100).map(|i| 1.0 - i as f64 * 0.01).collect_vec();
        let input = VectorPair::new(a, b);
        let expected = run_pipeline(DotProductSeq::new(input.clone())).unwrap();
        let closed_form: f64 = (0..100).map(|i| 0.5 * i as f64 * (1.0 - 0.01 * i as f64)).sum();
        assert_relative_eq!(expected, closed_form, max_relative = 1e-12);
        for size in 1..=4 {
            let outputs = LocalUniverse::new(size)
                .run(|comm| run_pipeline(DotProductDistributed::new(comm, input.clone())))
                .unwrap();
            for d in outputs {
                assert_relative_eq!(d, expected, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_dot_product_length_mismatch() {
        let mut runner = TaskRunner::new(DotProductSeq::new(VectorPair::new(vec![1, 2], vec![3])));
        assert!(matches!(runner.validation(), Err(Error::ValidationFailed)));
    }
}
