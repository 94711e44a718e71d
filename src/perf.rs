//! Performance measurement
//!
//! A measurement repeats a task `num_running` times and reports the mean time per run. On a
//! distributed run the reported time is the maximum over the ranks.
use crate::{
    config::Settings,
    error::{Error, Result},
    runner::TaskRunner,
    traits::{Communicator, Task},
    types::ReduceOp,
};
use std::fmt;
use std::time::{Duration, Instant};

/// Repetitions and time limit of a measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfAttributes {
    /// Number of repetitions
    pub num_running: usize,
    /// Largest acceptable mean time
    pub time_limit: Duration,
}

impl PerfAttributes {
    /// Attributes taken from `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            num_running: settings.perf_runs,
            time_limit: settings.perf_max_time,
        }
    }
}

impl Default for PerfAttributes {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// What a measurement timed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfMode {
    /// All four stages
    Pipeline,
    /// The run stage only
    TaskRun,
}

impl PerfMode {
    /// Name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            PerfMode::Pipeline => "pipeline",
            PerfMode::TaskRun => "task_run",
        }
    }
}

impl fmt::Display for PerfMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a measurement, displayed as `name:mode:seconds`
#[derive(Debug, Clone, PartialEq)]
pub struct PerfResults {
    /// Task name
    pub name: String,
    /// What was timed
    pub mode: PerfMode,
    /// Mean time per run in seconds
    pub seconds: f64,
}

impl fmt::Display for PerfResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{:.10}", self.name, self.mode, self.seconds)
    }
}

fn measure<C: Communicator, T: Task>(
    comm: &C,
    attributes: &PerfAttributes,
    mode: PerfMode,
    mut make: impl FnMut() -> T,
) -> Result<PerfResults> {
    if attributes.num_running == 0 {
        return Err(Error::InvalidInput("a measurement needs at least one run".into()));
    }
    let mut name = String::new();
    let mut total = Duration::ZERO;
    for _ in 0..attributes.num_running {
        let mut runner = TaskRunner::new(make());
        name = runner.name().to_string();
        match mode {
            PerfMode::Pipeline => {
                let start = Instant::now();
                runner.run_pipeline()?;
                total += start.elapsed();
            }
            PerfMode::TaskRun => {
                runner.validation()?;
                runner.pre_processing()?;
                let start = Instant::now();
                runner.run()?;
                total += start.elapsed();
                runner.post_processing()?;
            }
        }
    }
    let local = total.as_secs_f64() / attributes.num_running as f64;
    let seconds = comm.all_reduce_scalar(local, ReduceOp::Max)?;
    let results = PerfResults {
        name,
        mode,
        seconds,
    };
    tracing::info!(%results, "performance");

    let limit = attributes.time_limit.as_secs_f64();
    if seconds > limit {
        return Err(Error::TooSlow {
            name: results.name,
            elapsed: seconds,
            limit,
        });
    }
    Ok(results)
}

/// Time all four stages of the tasks built by `make`
///
/// `make` is called once per repetition. Every rank of `comm` has to take part.
pub fn pipeline_run<C: Communicator, T: Task>(
    comm: &C,
    attributes: &PerfAttributes,
    make: impl FnMut() -> T,
) -> Result<PerfResults> {
    measure(comm, attributes, PerfMode::Pipeline, make)
}

/// Time the run stage of the tasks built by `make`
pub fn task_run<C: Communicator, T: Task>(
    comm: &C,
    attributes: &PerfAttributes,
    make: impl FnMut() -> T,
) -> Result<PerfResults> {
    measure(comm, attributes, PerfMode::TaskRun, make)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::{LocalUniverse, SingleProcess};
    use crate::tasks::sort::{LocalSort, MergeStrategy, SortDistributed, SortSeq};

    fn attributes(time_limit: Duration) -> PerfAttributes {
        PerfAttributes {
            num_running: 3,
            time_limit,
        }
    }

    #[test]
    fn test_pipeline_run() {
        let comm = SingleProcess::new();
        let input = (0..1000).rev().collect::<Vec<i64>>();
        let results = pipeline_run(&comm, &attributes(Duration::from_secs(10)), || {
            SortSeq::new(input.clone(), LocalSort::Radix)
        })
        .unwrap();
        assert_eq!(results.name, "SortSeq");
        assert_eq!(results.mode, PerfMode::Pipeline);
        assert!(results.to_string().starts_with("SortSeq:pipeline:"));
    }

    #[test]
    fn test_task_run_distributed() {
        let input = (0..500).map(|i| (i * 7919) % 503).collect::<Vec<u32>>();
        let results = LocalUniverse::new(3)
            .run(|comm| {
                task_run(comm, &attributes(Duration::from_secs(10)), || {
                    SortDistributed::new(
                        comm,
                        input.clone(),
                        LocalSort::Shell,
                        MergeStrategy::HypercubeTree,
                    )
                })
            })
            .unwrap();
        for r in &results {
            assert_eq!(r.seconds, results[0].seconds);
            assert_eq!(r.mode, PerfMode::TaskRun);
        }
    }

    #[test]
    fn test_too_slow() {
        let comm = SingleProcess::new();
        let input = (0..2000).rev().map(f64::from).collect::<Vec<f64>>();
        let result = pipeline_run(&comm, &attributes(Duration::from_nanos(1)), || {
            SortSeq::new(input.clone(), LocalSort::Quick)
        });
        assert!(matches!(result, Err(Error::TooSlow { .. })));
    }
}
