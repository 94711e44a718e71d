//! Gauss-Seidel iteration
use super::system::{iterate, solve_row, IterativeInput, LocalRows};
use crate::{
    error::{Error, Result},
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::TaskKind,
};

/// Gauss-Seidel iteration on a single process
#[derive(Debug)]
pub struct GaussSeidelSeq {
    input: IterativeInput,
    output: Vec<f64>,
}

impl GaussSeidelSeq {
    /// Create the task
    pub fn new(input: IterativeInput) -> Self {
        Self {
            input,
            output: vec![],
        }
    }
}

impl Task for GaussSeidelSeq {
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
                for i in 0..n {
                    x[i] = solve_row(system.matrix.row(i), system.rhs[i], x, i);
                }
                Ok(system.residual(x))
            },
        )?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Gauss-Seidel iteration with the rows distributed in blocks
///
/// Within a sweep the blocks are updated in rank order: each rank relaxes its rows with the
/// newest values and broadcasts them before the next rank starts. The iterates are those of
/// [GaussSeidelSeq].
#[derive(Debug)]
pub struct GaussSeidelDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: IterativeInput,
    output: Vec<f64>,
    rows: Option<LocalRows>,
}

impl<'a, C: Communicator> GaussSeidelDistributed<'a, C> {
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

impl<C: Communicator> Task for GaussSeidelDistributed<'_, C> {
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
        self.input.tolerance = comm.broadcast_value(self.input.tolerance, ROOT)?;
        self.input.max_iterations = comm.broadcast_value(self.input.max_iterations, ROOT)?;
        self.output = vec![0.0; rows.n];
        self.rows = Some(rows);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let rank = comm.rank();
        let rows = self.rows.as_ref().ok_or(Error::NotPreProcessed)?;
        let initial = rows.residual(comm, &self.output)?;
        iterate(
            &mut self.output,
            initial,
            self.input.tolerance,
            self.input.max_iterations,
            |x| {
                for owner in 0..comm.size() {
                    let range = rows.dist.range(owner);
                    if range.is_empty() {
                        continue;
                    }
                    if owner == rank {
                        for i in 0..rows.count() {
                            let global = rows.first + i;
                            x[global] = solve_row(rows.row(i), rows.rhs[i], x, global);
                        }
                    }
                    let mut block = x[range.clone()].to_vec();
                    comm.broadcast(&mut block, owner)?;
                    x[range].copy_from_slice(&block);
                }
                rows.residual(comm, x)
            },
        )?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        Ok(())
    }
}
