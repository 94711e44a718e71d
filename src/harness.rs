//! Functional test driver
//!
//! A [FuncTestCase] bundles an input with a check on the output. The drivers run a task on
//! one process, on a [LocalUniverse] of a given size, or on every size up to a limit, and
//! verify that
//!
//! - the check accepts the output of every rank,
//! - every rank holds an output bitwise equal to that of rank 0,
//! - each distributed run agrees with the sequential run.
use crate::{
    comm::{LocalComm, LocalUniverse},
    config::Settings,
    error::{Error, Result},
    traits::BitEq,
};

/// A named input together with a check of the output
pub struct FuncTestCase<I, O> {
    /// Name used in log records
    pub name: String,
    /// Input handed to the task on every rank
    pub input: I,
    check: Box<dyn Fn(&I, &O) -> bool + Sync>,
}

impl<I: std::fmt::Debug, O> std::fmt::Debug for FuncTestCase<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncTestCase")
            .field("name", &self.name)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

fn accept_all<I, O>(_: &I, _: &O) -> bool {
    true
}

impl<I: 'static, O: 'static> FuncTestCase<I, O> {
    /// Create a case that accepts every output
    pub fn new(name: impl Into<String>, input: I) -> Self {
        Self {
            name: name.into(),
            input,
            check: Box::new(accept_all::<I, O>),
        }
    }

    /// Set the output check
    pub fn with_check(mut self, check: impl Fn(&I, &O) -> bool + Sync + 'static) -> Self {
        self.check = Box::new(check);
        self
    }
}

impl<I, O> FuncTestCase<I, O> {
    /// Apply the check to `output`
    pub fn check_output(&self, output: &O) -> bool {
        (self.check)(&self.input, output)
    }
}

/// Run the sequential variant and check its output
///
/// `run` builds the task from the input and runs its pipeline, usually
/// `|input| run_pipeline(TaskSeq::new(input))`.
pub fn run_sequential<I: Clone, O>(
    case: &FuncTestCase<I, O>,
    run: impl FnOnce(I) -> Result<O>,
) -> Result<O> {
    let _span = tracing::info_span!("case", name = %case.name, ranks = 0).entered();
    let output = run(case.input.clone())?;
    if case.check_output(&output) {
        Ok(output)
    } else {
        Err(Error::CheckFailed(0))
    }
}

/// Run the distributed variant on `ranks` ranks and return the output of rank 0
///
/// `run` receives the communicator of a rank and a copy of the input, usually
/// `|comm, input| run_pipeline(TaskDistributed::new(comm, input))`.
pub fn run_distributed<I, O, F>(
    case: &FuncTestCase<I, O>,
    universe: &LocalUniverse,
    run: F,
) -> Result<O>
where
    I: Clone + Sync,
    O: BitEq + Send,
    F: Fn(&LocalComm, I) -> Result<O> + Sync,
{
    let _span =
        tracing::info_span!("case", name = %case.name, ranks = universe.size()).entered();
    let outputs = universe.run(|comm| run(comm, case.input.clone()))?;
    for (rank, output) in outputs.iter().enumerate() {
        if !case.check_output(output) {
            return Err(Error::CheckFailed(rank));
        }
    }
    let mut outputs = outputs.into_iter();
    let first = outputs.next().ok_or(Error::CheckFailed(0))?;
    for (rank, output) in outputs.enumerate() {
        if !output.bit_eq(&first) {
            return Err(Error::RankDivergence(rank + 1));
        }
    }
    Ok(first)
}

/// Run the sequential variant and the distributed one on `1..=settings.num_proc` ranks
///
/// Every distributed output must be accepted by `agree` when compared with the sequential
/// output. Returns the sequential output.
pub fn run_process_counts<I, O, S, D>(
    case: &FuncTestCase<I, O>,
    settings: &Settings,
    sequential: S,
    distributed: D,
    agree: impl Fn(&O, &O) -> bool,
) -> Result<O>
where
    I: Clone + Sync,
    O: BitEq + Send,
    S: FnOnce(I) -> Result<O>,
    D: Fn(&LocalComm, I) -> Result<O> + Sync,
{
    let expected = run_sequential(case, sequential)?;
    for ranks in 1..=settings.num_proc {
        let universe = LocalUniverse::with_settings(ranks, settings);
        let output = run_distributed(case, &universe, &distributed)?;
        if !agree(&expected, &output) {
            tracing::error!(name = %case.name, ranks, "sequential and distributed outputs differ");
            return Err(Error::SequentialMismatch { ranks });
        }
    }
    Ok(expected)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runner::run_pipeline;
    use crate::tasks::sort::{LocalSort, MergeStrategy, SortDistributed, SortSeq};
    use crate::traits::Communicator;

    fn sort_case() -> FuncTestCase<Vec<i32>, Vec<i32>> {
        FuncTestCase::new("sort", vec![5, -3, 9, 0, 2, 2, -8])
            .with_check(|input, output: &Vec<i32>| {
                output.len() == input.len() && output.windows(2).all(|w| w[0] <= w[1])
            })
    }

    #[test]
    fn test_process_counts() {
        let settings = Settings {
            num_proc: 3,
            ..Settings::default()
        };
        let sorted = run_process_counts(
            &sort_case(),
            &settings,
            |input| run_pipeline(SortSeq::new(input, LocalSort::Quick)),
            |comm, input| {
                run_pipeline(SortDistributed::new(
                    comm,
                    input,
                    LocalSort::Radix,
                    MergeStrategy::OddEvenTransposition,
                ))
            },
            |a, b| a == b,
        )
        .unwrap();
        assert_eq!(sorted, vec![-8, -3, 0, 2, 2, 5, 9]);
    }

    #[test]
    fn test_check_failure() {
        let case = FuncTestCase::new("reject", 1).with_check(|_, _: &i32| false);
        assert!(matches!(
            run_sequential(&case, |x| Ok(x)),
            Err(Error::CheckFailed(0))
        ));
    }

    #[test]
    fn test_rank_divergence() {
        let case = FuncTestCase::<(), usize>::new("divergent", ());
        let result =
            run_distributed(&case, &LocalUniverse::new(3), |comm, _| Ok(comm.rank() / 2));
        assert!(matches!(result, Err(Error::RankDivergence(2))));
    }

    #[test]
    fn test_signed_zero_divergence() {
        let case = FuncTestCase::<(), f64>::new("signed zero", ());
        let result = run_distributed(&case, &LocalUniverse::new(2), |comm, _| {
            Ok(if comm.rank() == 0 { 0.0 } else { -0.0 })
        });
        assert!(matches!(result, Err(Error::RankDivergence(1))));
    }

    #[test]
    fn test_identical_nan() {
        let case = FuncTestCase::<(), Vec<f64>>::new("nan", ());
        let output =
            run_distributed(&case, &LocalUniverse::new(3), |_, _| Ok(vec![1.0, f64::NAN]))
                .unwrap();
        assert!(output[1].is_nan());
    }

    #[test]
    fn test_sequential_mismatch() {
        let settings = Settings {
            num_proc: 2,
            ..Settings::default()
        };
        let case = FuncTestCase::<(), usize>::new("size", ());
        let result = run_process_counts(
            &case,
            &settings,
            |_| Ok(1),
            |comm, _| Ok(comm.size()),
            |a, b| a == b,
        );
        assert!(matches!(
            result,
            Err(Error::SequentialMismatch { ranks: 2 })
        ));
    }
}
