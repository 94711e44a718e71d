//! Monte Carlo integration with a counter-based sample stream
use super::{valid_bounds, Integrand};
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{ReduceOp, TaskKind},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::Range;

/// Integrand, box, sample count and seed
#[derive(Clone)]
pub struct MonteCarloInput {
    /// `(lower, upper)` per dimension
    pub bounds: Vec<(f64, f64)>,
    /// Number of samples
    pub samples: usize,
    /// Seed of the sample stream
    pub seed: u64,
    /// Function to integrate
    pub integrand: Integrand,
}

impl std::fmt::Debug for MonteCarloInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonteCarloInput")
            .field("bounds", &self.bounds)
            .field("samples", &self.samples)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl MonteCarloInput {
    fn valid(&self) -> bool {
        valid_bounds(&self.bounds) && self.samples > 0
    }

    fn volume(&self) -> f64 {
        self.bounds.iter().map(|(a, b)| b - a).product()
    }

    // Sum of the integrand over samples `range`. Sample `k` uses the words starting at
    // `2 * dims * k` of the stream, so any split of the range yields the same samples.
    fn partial_sum(&self, range: Range<usize>) -> f64 {
        let dims = self.bounds.len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_word_pos(2 * dims as u128 * range.start as u128);
        let mut point = vec![0.0; dims];
        let mut sum = 0.0;
        for _ in range {
            for (x, &(a, b)) in point.iter_mut().zip(&self.bounds) {
                *x = a + rng.gen::<f64>() * (b - a);
            }
            sum += (self.integrand)(&point);
        }
        sum
    }
}

fn check_finite(value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("estimate is {value}")))
    }
}

/// Monte Carlo estimate on a single process
#[derive(Debug)]
pub struct MonteCarloSeq {
    input: MonteCarloInput,
    output: f64,
}

impl MonteCarloSeq {
    /// Create the task
    pub fn new(input: MonteCarloInput) -> Self {
        Self { input, output: 0.0 }
    }
}

impl Task for MonteCarloSeq {
    type Input = MonteCarloInput;
    type Output = f64;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &MonteCarloInput {
        &self.input
    }
    fn output(&self) -> &f64 {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.valid()
    }

    fn pre_processing(&mut self) -> Result<()> {
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let sum = self.input.partial_sum(0..self.input.samples);
        self.output = self.input.volume() * sum / self.input.samples as f64;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_finite(self.output)
    }
}

/// Monte Carlo estimate with the samples distributed in blocks
#[derive(Debug)]
pub struct MonteCarloDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: MonteCarloInput,
    output: f64,
}

impl<'a, C: Communicator> MonteCarloDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: MonteCarloInput) -> Self {
        Self {
            comm,
            input,
            output: 0.0,
        }
    }
}

impl<C: Communicator> Task for MonteCarloDistributed<'_, C> {
    type Input = MonteCarloInput;
    type Output = f64;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &MonteCarloInput {
        &self.input
    }
    fn output(&self) -> &f64 {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.valid())
    }

    fn pre_processing(&mut self) -> Result<()> {
        let mut flat = self
            .input
            .bounds
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect::<Vec<_>>();
        self.comm.broadcast(&mut flat, ROOT)?;
        self.input.bounds = flat.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        self.input.samples = self.comm.broadcast_value(self.input.samples, ROOT)?;
        self.input.seed = self.comm.broadcast_value(self.input.seed, ROOT)?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let dist = BlockDistribution::new(self.input.samples, self.comm.size());
        let local = self.input.partial_sum(dist.range(self.comm.rank()));
        let sum = self.comm.all_reduce_scalar(local, ReduceOp::Sum)?;
        self.output = self.input.volume() * sum / self.input.samples as f64;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_finite(self.output)
    }
}
