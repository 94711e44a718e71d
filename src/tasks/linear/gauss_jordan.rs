//! Gauss-Jordan elimination with partial pivoting
//!
//! Rows are never swapped. Each column picks the unused row with the largest magnitude entry
//! (the lowest such row on ties) and eliminates that column from every other row.
use super::system::{LinearSystem, LocalRows};
use crate::{
    error::{Error, Result},
    tasks::root_decides,
    traits::{Communicator, Task},
    types::TaskKind,
};
use itertools::Itertools;

/// Pivots with a smaller magnitude make the matrix count as singular
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// Subtract the multiple of `pivot` that zeroes column `k` of `row`
///
/// Both slices start at column `k`.
fn eliminate(row: &mut [f64], pivot: &[f64]) {
    let factor = row[0] / pivot[0];
    for (r, p) in row.iter_mut().zip(pivot) {
        *r -= factor * p;
    }
}

/// Best pivot candidate `(magnitude, row)` among `rows` in column `k`
fn best_candidate<'a>(
    rows: impl Iterator<Item = (usize, &'a [f64])>,
    k: usize,
) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for (i, row) in rows {
        let value = row[k].abs();
        if best.map_or(true, |(b, _)| value > b) {
            best = Some((value, i));
        }
    }
    best
}

fn check_pivot(value: f64, column: usize) -> Result<()> {
    if value < PIVOT_TOLERANCE {
        tracing::debug!(column, value, "vanishing pivot");
        Err(Error::SingularMatrix { column })
    } else {
        Ok(())
    }
}

/// Gauss-Jordan elimination on a single process
#[derive(Debug)]
pub struct GaussJordanSeq {
    input: LinearSystem,
    output: Vec<f64>,
}

impl GaussJordanSeq {
    /// Create the task
    pub fn new(input: LinearSystem) -> Self {
        Self {
            input,
            output: vec![],
        }
    }
}

impl Task for GaussJordanSeq {
    type Input = LinearSystem;
    type Output = Vec<f64>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &LinearSystem {
        &self.input
    }
    fn output(&self) -> &Vec<f64> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.is_well_formed()
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = vec![0.0; self.input.size()];
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let n = self.input.size();
        let width = n + 1;
        let mut augmented = (0..n)
            .flat_map(|i| {
                self.input
                    .matrix
                    .row(i)
                    .iter()
                    .copied()
                    .chain([self.input.rhs[i]])
            })
            .collect_vec();
        let mut used = vec![false; n];
        let mut pivots = vec![0; n];

        for k in 0..n {
            let (value, p) = best_candidate(
                augmented
                    .chunks(width)
                    .enumerate()
                    .filter(|(i, _)| !used[*i]),
                k,
            )
            .ok_or(Error::SingularMatrix { column: k })?;
            check_pivot(value, k)?;
            used[p] = true;
            pivots[k] = p;

            let pivot = augmented[p * width + k..(p + 1) * width].to_vec();
            for (i, row) in augmented.chunks_mut(width).enumerate() {
                if i != p {
                    eliminate(&mut row[k..], &pivot);
                }
            }
        }

        for (k, &p) in pivots.iter().enumerate() {
            self.output[k] = augmented[p * width + n] / augmented[p * width + k];
        }
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        if self.output.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(Error::InvalidInput("solution is not finite".into()))
        }
    }
}

/// Gauss-Jordan elimination with the rows distributed in blocks
///
/// For every column the ranks share their best candidate, the owner of the chosen pivot row
/// broadcasts it, and every rank eliminates the column from its own rows. The arithmetic is
/// that of [GaussJordanSeq].
#[derive(Debug)]
pub struct GaussJordanDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: LinearSystem,
    output: Vec<f64>,
    rows: Option<LocalRows>,
}

impl<'a, C: Communicator> GaussJordanDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: LinearSystem) -> Self {
        Self {
            comm,
            input,
            output: vec![],
            rows: None,
        }
    }
}

impl<C: Communicator> Task for GaussJordanDistributed<'_, C> {
    type Input = LinearSystem;
    type Output = Vec<f64>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &LinearSystem {
        &self.input
    }
    fn output(&self) -> &Vec<f64> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.is_well_formed())
    }

    fn pre_processing(&mut self) -> Result<()> {
        let rows = LocalRows::scatter(self.comm, &self.input)?;
        self.output = vec![0.0; rows.n];
        self.rows = Some(rows);
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let rows = self.rows.as_ref().ok_or(Error::NotPreProcessed)?;
        let n = rows.n;
        let width = n + 1;
        let count = rows.count();
        let mut augmented = (0..count)
            .flat_map(|i| rows.row(i).iter().copied().chain([rows.rhs[i]]))
            .collect_vec();
        let mut used = vec![false; count];
        let mut columns = vec![0.0; count];
        let candidate_counts = rows
            .dist
            .counts()
            .iter()
            .map(|&c| if c > 0 { 2 } else { 0 })
            .collect_vec();
        let solved_counts = rows.dist.scaled(2);

        for k in 0..n {
            let local = best_candidate(
                augmented
                    .chunks(width)
                    .enumerate()
                    .filter(|(i, _)| !used[*i])
                    .map(|(i, row)| (rows.first + i, row)),
                k,
            );
            let candidates = match local {
                Some((value, row)) => [value, row as f64],
                None => [-1.0, 0.0],
            };
            let share = if count > 0 { &candidates[..] } else { &[][..] };
            let all = comm.all_gatherv(share, &candidate_counts)?;
            let (value, p) =
                best_candidate_pairs(&all).ok_or(Error::SingularMatrix { column: k })?;
            check_pivot(value, k)?;

            let owner = rows
                .dist
                .owner(p)
                .ok_or_else(|| Error::InvalidInput(format!("pivot row {p} has no owner")))?;
            let mut pivot = if owner == comm.rank() {
                let local_row = p - rows.first;
                used[local_row] = true;
                columns[local_row] = k as f64;
                augmented[local_row * width + k..(local_row + 1) * width].to_vec()
            } else {
                vec![]
            };
            comm.broadcast(&mut pivot, owner)?;

            for (i, row) in augmented.chunks_mut(width).enumerate() {
                if rows.first + i != p {
                    eliminate(&mut row[k..], &pivot);
                }
            }
        }

        let solved = (0..count)
            .flat_map(|i| {
                let k = columns[i] as usize;
                [columns[i], augmented[i * width + n] / augmented[i * width + k]]
            })
            .collect_vec();
        let all = comm.all_gatherv(&solved, solved_counts.counts())?;
        for (k, value) in all.iter().tuples() {
            self.output[*k as usize] = *value;
        }
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        if self.output.iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(Error::InvalidInput("solution is not finite".into()))
        }
    }
}

/// Best of the `(magnitude, row)` pairs shared by the ranks; ranks without rows send nothing
fn best_candidate_pairs(pairs: &[f64]) -> Option<(f64, usize)> {
    let mut best: Option<(f64, usize)> = None;
    for (&value, &row) in pairs.iter().tuples() {
        if value >= 0.0 && best.map_or(true, |(b, _)| value > b) {
            best = Some((value, row as usize));
        }
    }
    best
}
