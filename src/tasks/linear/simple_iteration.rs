//! Simple (Richardson) iteration `x <- x + tau (b - A x)`
use super::system::{dot, iterate, LinearSystem, LocalRows};
use crate::{
    error::{Error, Result},
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::TaskKind,
};

/// A system, the stopping parameters and the relaxation factor
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimpleIterationInput {
    /// The system
    pub system: LinearSystem,
    /// Residual below which the iteration stops
    pub tolerance: f64,
    /// Iteration cap
    pub max_iterations: usize,
    /// Relaxation factor; `1 / max_i a_ii` if not set
    pub tau: Option<f64>,
}

impl SimpleIterationInput {
    /// Create the input with the default relaxation factor
    pub fn new(system: LinearSystem, tolerance: f64, max_iterations: usize) -> Self {
        Self {
            system,
            tolerance,
            max_iterations,
            tau: None,
        }
    }

    /// Set the relaxation factor
    pub fn with_tau(mut self, tau: f64) -> Self {
        self.tau = Some(tau);
        self
    }

    fn max_diagonal(&self) -> f64 {
        (0..self.system.size())
            .map(|i| self.system.matrix.get(i, i))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// The relaxation factor that will be used
    pub fn effective_tau(&self) -> f64 {
        self.tau.unwrap_or_else(|| 1.0 / self.max_diagonal())
    }

    fn is_valid(&self) -> bool {
        if !(self.tolerance > 0.0
            && self.max_iterations > 0
            && self.system.is_well_formed()
            && self.system.is_strictly_diagonally_dominant())
        {
            return false;
        }
        if (0..self.system.size()).any(|i| self.system.matrix.get(i, i) <= 0.0) {
            return false;
        }
        let tau = self.effective_tau();
        tau > 0.0 && tau <= 1.0 / self.max_diagonal()
    }
}

fn relax(row: &[f64], rhs: f64, x: &[f64], i: usize, tau: f64) -> f64 {
    x[i] + tau * (rhs - dot(row, x))
}

/// Simple iteration on a single process
#[derive(Debug)]
pub struct SimpleIterationSeq {
    input: SimpleIterationInput,
    output: Vec<f64>,
}

impl SimpleIterationSeq {
    /// Create the task
    pub fn new(input: SimpleIterationInput) -> Self {
        Self {
            input,
            output: vec![],
        }
    }
}

impl Task for SimpleIterationSeq {
    type Input = SimpleIterationInput;
    type Output = Vec<f64>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &SimpleIterationInput {
        &self.input
    }
    fn output(&self) -> &Vec<f64> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.is_valid()
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = vec![0.0; self.input.system.size()];
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let system = &self.input.system;
        let n = system.size();
        let tau = self.input.effective_tau();
        iterate(
            &mut self.output,
            system.residual(&vec![0.0; n]),
            self.input.tolerance,
            self.input.max_iterations,
            |x| {
                *x = (0..n)
                    .map(|i| relax(system.matrix.row(i), system.rhs[i], x, i, tau))
                    .collect();
                Ok(system.residual(x))
            },
        )?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Simple iteration with the rows distributed in blocks
#[derive(Debug)]
pub struct SimpleIterationDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: SimpleIterationInput,
    output: Vec<f64>,
    rows: Option<LocalRows>,
    tau: f64,
}

impl<'a, C: Communicator> SimpleIterationDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: SimpleIterationInput) -> Self {
        Self {
            comm,
            input,
            output: vec![],
            rows: None,
            tau: 0.0,
        }
    }
}

impl<C: Communicator> Task for SimpleIterationDistributed<'_, C> {
    type Input = SimpleIterationInput;
    type Output = Vec<f64>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &SimpleIterationInput {
        &self.input
    }
    fn output(&self) -> &Vec<f64> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.is_valid())
    }

    fn pre_processing(&mut self) -> Result<()> {
        let comm = self.comm;
        let rows = LocalRows::scatter(comm, &self.input.system)?;
        let tau = if comm.is_root(ROOT) {
            self.input.effective_tau()
        } else {
            0.0
        };
        self.tau = comm.broadcast_value(tau, ROOT)?;
        self.input.tolerance = comm.broadcast_value(self.input.tolerance, ROOT)?;
        self.input.max_iterations = comm.broadcast_value(self.input.max_iterations, ROOT)?;
        self.output = vec![0.0; rows.n];
        self.rows = Some(rows);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let tau = self.tau;
        let rows = self.rows.as_ref().ok_or(Error::NotPreProcessed)?;
        let initial = rows.residual(comm, &self.output)?;
        iterate(
            &mut self.output,
            initial,
            self.input.tolerance,
            self.input.max_iterations,
            |x| {
                let local = (0..rows.count())
                    .map(|i| relax(rows.row(i), rows.rhs[i], x, rows.first + i, tau))
                    .collect::<Vec<_>>();
                *x = comm.all_gatherv(&local, rows.dist.counts())?;
                rows.residual(comm, x)
            },
        )?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}
