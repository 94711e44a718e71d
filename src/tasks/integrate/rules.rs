//! Product trapezoid and Simpson rules
use super::{valid_bounds, Integrand};
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{ReduceOp, TaskKind},
};
use std::ops::Range;

/// One-dimensional rule applied along every axis
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuadratureRule {
    /// Composite trapezoid rule
    Trapezoid,
    /// Composite Simpson rule; needs an even number of steps
    Simpson,
}

impl QuadratureRule {
    /// Weight of node `i` out of `0..=steps`, without the step length factor
    fn weight(self, i: usize, steps: usize) -> f64 {
        match self {
            QuadratureRule::Trapezoid => {
                if i == 0 || i == steps {
                    0.5
                } else {
                    1.0
                }
            }
            QuadratureRule::Simpson => {
                let w = if i == 0 || i == steps {
                    1.0
                } else if i % 2 == 1 {
                    4.0
                } else {
                    2.0
                };
                w / 3.0
            }
        }
    }

    fn accepts(self, steps: usize) -> bool {
        match self {
            QuadratureRule::Trapezoid => steps >= 1,
            QuadratureRule::Simpson => steps >= 2 && steps % 2 == 0,
        }
    }
}

/// Integrand, box and resolution
#[derive(Clone)]
pub struct QuadratureInput {
    /// `(lower, upper)` per dimension
    pub bounds: Vec<(f64, f64)>,
    /// Number of intervals along every axis
    pub steps: usize,
    /// Function to integrate
    pub integrand: Integrand,
}

impl std::fmt::Debug for QuadratureInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadratureInput")
            .field("bounds", &self.bounds)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

impl QuadratureInput {
    fn node_count(&self) -> Option<usize> {
        let per_axis = self.steps.checked_add(1)?;
        u32::try_from(self.bounds.len())
            .ok()
            .and_then(|d| per_axis.checked_pow(d))
    }

    fn valid(&self, rule: QuadratureRule) -> bool {
        valid_bounds(&self.bounds) && rule.accepts(self.steps) && self.node_count().is_some()
    }

    // Weighted sum over the nodes with linear index in `nodes`.
    fn partial_sum(&self, rule: QuadratureRule, nodes: Range<usize>) -> f64 {
        let steps = self.steps;
        let h = self
            .bounds
            .iter()
            .map(|(a, b)| (b - a) / steps as f64)
            .collect::<Vec<_>>();
        let mut point = vec![0.0; self.bounds.len()];
        let mut sum = 0.0;
        for node in nodes {
            let mut rest = node;
            let mut weight = 1.0;
            for (d, &(a, _)) in self.bounds.iter().enumerate() {
                let i = rest % (steps + 1);
                rest /= steps + 1;
                point[d] = a + i as f64 * h[d];
                weight *= rule.weight(i, steps) * h[d];
            }
            sum += weight * (self.integrand)(&point);
        }
        sum
    }
}

fn check_finite(value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("integral evaluated to {value}")))
    }
}

/// Quadrature on a single process
#[derive(Debug)]
pub struct QuadratureSeq {
    input: QuadratureInput,
    output: f64,
    rule: QuadratureRule,
}

impl QuadratureSeq {
    /// Create the task
    pub fn new(input: QuadratureInput, rule: QuadratureRule) -> Self {
        Self {
            input,
            output: 0.0,
            rule,
        }
    }
}

impl Task for QuadratureSeq {
    type Input = QuadratureInput;
    type Output = f64;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &QuadratureInput {
        &self.input
    }
    fn output(&self) -> &f64 {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.valid(self.rule)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = 0.0;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let nodes = self.input.node_count().unwrap_or(0);
        self.output = self.input.partial_sum(self.rule, 0..nodes);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_finite(self.output)
    }
}

/// Quadrature with the node index space distributed in blocks
///
/// Every rank builds the nodes of its own block; the integrand is a plain function pointer
/// so all ranks can evaluate it. The partial sums are all-reduced.
#[derive(Debug)]
pub struct QuadratureDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: QuadratureInput,
    output: f64,
    rule: QuadratureRule,
}

impl<'a, C: Communicator> QuadratureDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: QuadratureInput, rule: QuadratureRule) -> Self {
        Self {
            comm,
            input,
            output: 0.0,
            rule,
        }
    }
}

impl<C: Communicator> Task for QuadratureDistributed<'_, C> {
    type Input = QuadratureInput;
    type Output = f64;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &QuadratureInput {
        &self.input
    }
    fn output(&self) -> &f64 {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.valid(self.rule))
    }

    fn pre_processing(&mut self) -> Result<()> {
        // Only the root's box and resolution count.
        let mut flat = self
            .input
            .bounds
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect::<Vec<_>>();
        self.comm.broadcast(&mut flat, ROOT)?;
        self.input.bounds = flat.chunks_exact(2).map(|c| (c[0], c[1])).collect();
        self.input.steps = self.comm.broadcast_value(self.input.steps, ROOT)?;
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let nodes = self.input.node_count().unwrap_or(0);
        let dist = BlockDistribution::new(nodes, self.comm.size());
        let local = self
            .input
            .partial_sum(self.rule, dist.range(self.comm.rank()));
        self.output = self.comm.all_reduce_scalar(local, ReduceOp::Sum)?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_finite(self.output)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::runner::{run_pipeline, TaskRunner};
    use approx::assert_relative_eq;

    fn square(x: &[f64]) -> f64 {
        x[0] * x[0]
    }

    fn cubic(x: &[f64]) -> f64 {
        x[0] * x[0] * x[0] - 2.0 * x[0]
    }

    fn product(x: &[f64]) -> f64 {
        x.iter().product()
    }

    fn input(bounds: Vec<(f64, f64)>, steps: usize, integrand: Integrand) -> QuadratureInput {
        QuadratureInput {
            bounds,
            steps,
            integrand,
        }
    }

    #[test]
    fn test_trapezoid_linear_is_exact() {
        let out = run_pipeline(QuadratureSeq::new(
            input(vec![(0.0, 3.0)], 1, |x| 2.0 * x[0] + 1.0),
            QuadratureRule::Trapezoid,
        ))
        .unwrap();
        assert_relative_eq!(out, 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_simpson_cubic_is_exact() {
        let out = run_pipeline(QuadratureSeq::new(
            input(vec![(-1.0, 2.0)], 2, cubic),
            QuadratureRule::Simpson,
        ))
        .unwrap();
        // x^4/4 - x^2 from -1 to 2
        assert_relative_eq!(out, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn test_trapezoid_converges() {
        let coarse = run_pipeline(QuadratureSeq::new(
            input(vec![(0.0, 2.0)], 10, square),
            QuadratureRule::Trapezoid,
        ))
        .unwrap();
        let fine = run_pipeline(QuadratureSeq::new(
            input(vec![(0.0, 2.0)], 1000, square),
            QuadratureRule::Trapezoid,
        ))
        .unwrap();
        assert!((fine - 8.0 / 3.0).abs() < (coarse - 8.0 / 3.0).abs());
        assert_relative_eq!(fine, 8.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_three_dimensions() {
        let out = run_pipeline(QuadratureSeq::new(
            input(vec![(0.0, 1.0), (0.0, 2.0), (1.0, 3.0)], 4, product),
            QuadratureRule::Simpson,
        ))
        .unwrap();
        // (1/2) * 2 * 4
        assert_relative_eq!(out, 4.0, epsilon = 1e-10);
    }

    #[test]
    fn test_validation() {
        for (bounds, steps, rule) in [
            (vec![], 4, QuadratureRule::Trapezoid),
            (vec![(1.0, 0.0)], 4, QuadratureRule::Trapezoid),
            (vec![(0.0, 1.0)], 0, QuadratureRule::Trapezoid),
            (vec![(0.0, 1.0)], 3, QuadratureRule::Simpson),
            (vec![(0.0, f64::INFINITY)], 4, QuadratureRule::Simpson),
        ] {
            let task = QuadratureSeq::new(input(bounds, steps, square), rule);
            let mut runner = TaskRunner::new(task);
            assert!(matches!(runner.validation(), Err(Error::ValidationFailed)));
        }
    }

    #[test]
    fn test_distributed_matches_seq() {
        for rule in [QuadratureRule::Trapezoid, QuadratureRule::Simpson] {
            let case = input(vec![(0.0, 1.0), (-1.0, 1.0)], 20, |x| (x[0] * x[1]).exp());
            let expected = run_pipeline(QuadratureSeq::new(case.clone(), rule)).unwrap();
            for size in 1..=4 {
                let outputs = LocalUniverse::new(size)
                    .run(|comm| run_pipeline(QuadratureDistributed::new(comm, case.clone(), rule)))
                    .unwrap();
                for out in &outputs {
                    assert_relative_eq!(*out, expected, max_relative = 1e-12);
                    assert_eq!(out.to_bits(), outputs[0].to_bits());
                }
            }
        }
    }
}
