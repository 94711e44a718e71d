//! Jacobi iteration
use super::system::{iterate, solve_row, IterativeInput, LocalRows};
use crate::{
    error::{Error, Result},
    tasks::root_decides,
    traits::{Communicator, Task},
    types::TaskKind,
};

/// Jacobi iteration on a single process
#[derive(Debug)]
pub struct JacobiSeq {
    input: IterativeInput,
    output: Vec<f64>,
}

impl JacobiSeq {
    /// Create the task
    pub fn new(input: IterativeInput) -> Self {
        Self {
            input,
            output: vec![],
        }
    }
}

impl Task for JacobiSeq {
    type Input = IterativeInput;
    type Output = Vec<f64>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &IterativeInput {
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
        iterate(
            &mut self.output,
            system.residual(&vec![0.0; n]),
            self.input.tolerance,
            self.input.max_iterations,
            |x| {
                *x = (0..n)
                    .map(|i| solve_row(system.matrix.row(i), system.rhs[i], x, i))
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

/// Jacobi iteration with the rows distributed in blocks
///
/// The new iterate is all-gathered after every sweep, so every rank performs the same
/// arithmetic as [JacobiSeq] on its own rows.
#[derive(Debug)]
pub struct JacobiDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: IterativeInput,
    output: Vec<f64>,
    rows: Option<LocalRows>,
}

impl<'a, C: Communicator> JacobiDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: IterativeInput) -> Self {
        Self {
            comm,
            input,
            output: vec![],
            rows: None,
        }
    }
}

impl<C: Communicator> Task for JacobiDistributed<'_, C> {
    type Input = IterativeInput;
    type Output = Vec<f64>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &IterativeInput {
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
        self.input.tolerance = comm.broadcast_value(self.input.tolerance, crate::tasks::ROOT)?;
        self.input.max_iterations =
            comm.broadcast_value(self.input.max_iterations, crate::tasks::ROOT)?;
        self.output = vec![0.0; rows.n];
        self.rows = Some(rows);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let rows = self.rows.as_ref().ok_or(Error::NotPreProcessed)?;
        let initial = rows.residual(comm, &self.output)?;
        iterate(
            &mut self.output,
            initial,
            self.input.tolerance,
            self.input.max_iterations,
            |x| {
                let local = (0..rows.count())
                    .map(|i| solve_row(rows.row(i), rows.rhs[i], x, rows.first + i))
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
