//! Global minimization of a one-dimensional function with Strongin's information algorithm
//!
//! Trials are kept sorted by abscissa. Each interval `(x_{i-1}, x_i)` is rated by
//!
//! `R_i = m d + (z_i - z_{i-1})^2 / (m d) - 2 (z_i + z_{i-1})`, `d = x_i - x_{i-1}`,
//!
//! where `m = r M` estimates the Lipschitz constant from the largest observed slope `M`. The
//! best rated interval receives the next trial at
//! `(x_i + x_{i-1}) / 2 - (z_i - z_{i-1}) / (2 m)`. The search ends once the best rated
//! interval is shorter than `eps`. Hitting the iteration cap ends it as well, with the best
//! trial found so far.
use crate::{
    error::{Error, Result},
    tasks::{root_decides, ROOT},
    traits::{BitEq, Communicator, Task},
    types::TaskKind,
};
use itertools::Itertools;

/// Objective function
pub type Objective = fn(f64) -> f64;

/// Search interval and parameters
#[derive(Clone, Copy)]
pub struct OptimizeInput {
    /// Lower bound of the search interval
    pub lower: f64,
    /// Upper bound of the search interval
    pub upper: f64,
    /// Reliability parameter; must exceed one
    pub reliability: f64,
    /// Interval length at which the search stops
    pub eps: f64,
    /// Iteration cap
    pub max_iterations: usize,
    /// The function to minimize
    pub objective: Objective,
}

impl std::fmt::Debug for OptimizeInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizeInput")
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .field("reliability", &self.reliability)
            .field("eps", &self.eps)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl OptimizeInput {
    /// Create the input with reliability 2, accuracy `1e-4` and at most 10000 iterations
    pub fn new(lower: f64, upper: f64, objective: Objective) -> Self {
        Self {
            lower,
            upper,
            reliability: 2.0,
            eps: 1e-4,
            max_iterations: 10_000,
            objective,
        }
    }

    /// Set the reliability parameter
    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = reliability;
        self
    }

    /// Set the accuracy
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Set the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn is_valid(&self) -> bool {
        self.lower.is_finite()
            && self.upper.is_finite()
            && self.lower < self.upper
            && self.reliability > 1.0
            && self.eps > 0.0
            && self.max_iterations > 0
    }
}

/// Best trial of a search
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Minimum {
    /// Abscissa
    pub x: f64,
    /// Function value
    pub value: f64,
    /// Number of function evaluations
    pub trials: usize,
}

impl BitEq for Minimum {
    fn bit_eq(&self, other: &Self) -> bool {
        self.x.bit_eq(&other.x) && self.value.bit_eq(&other.value) && self.trials == other.trials
    }
}

/// Sorted trial points `(x, z)`
#[derive(Debug, Default)]
struct Trials {
    points: Vec<(f64, f64)>,
}

impl Trials {
    fn insert(&mut self, x: f64, z: f64) {
        let at = self.points.partition_point(|&(px, _)| px < x);
        self.points.insert(at, (x, z));
    }

    fn lipschitz(&self, reliability: f64) -> f64 {
        let slope = self
            .points
            .iter()
            .tuple_windows()
            .map(|((x0, z0), (x1, z1))| ((z1 - z0) / (x1 - x0)).abs())
            .fold(0.0, f64::max);
        if slope > 0.0 {
            reliability * slope
        } else {
            1.0
        }
    }

    /// Intervals `i` (between points `i - 1` and `i`) by decreasing rating
    ///
    /// Equal ratings keep the left interval first.
    fn ranked(&self, m: f64) -> Vec<usize> {
        let ratings = self
            .points
            .iter()
            .tuple_windows()
            .map(|((x0, z0), (x1, z1))| {
                let d = x1 - x0;
                m * d + (z1 - z0) * (z1 - z0) / (m * d) - 2.0 * (z1 + z0)
            })
            .collect_vec();
        let mut order = (1..self.points.len()).collect_vec();
        order.sort_by(|&a, &b| ratings[b - 1].total_cmp(&ratings[a - 1]));
        order
    }

    fn next_point(&self, i: usize, m: f64) -> f64 {
        let (x0, z0) = self.points[i - 1];
        let (x1, z1) = self.points[i];
        let x = 0.5 * (x0 + x1) - (z1 - z0) / (2.0 * m);
        x.clamp(x0, x1)
    }

    fn width(&self, i: usize) -> f64 {
        self.points[i].0 - self.points[i - 1].0
    }

    fn best(&self) -> Minimum {
        let (x, value) = self
            .points
            .iter()
            .copied()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((f64::NAN, f64::NAN));
        Minimum {
            x,
            value,
            trials: self.points.len(),
        }
    }
}

/// Run the search with up to `width` new trials per iteration
///
/// `evaluate` receives the new abscissae in rating order and returns their `(x, z)` pairs.
fn search(
    input: &OptimizeInput,
    width: usize,
    mut evaluate: impl FnMut(&[f64]) -> Result<Vec<(f64, f64)>>,
) -> Result<Minimum> {
    let f = input.objective;
    let mut trials = Trials::default();
    trials.insert(input.lower, f(input.lower));
    trials.insert(input.upper, f(input.upper));

    for iteration in 0..input.max_iterations {
        let m = trials.lipschitz(input.reliability);
        let ranked = trials.ranked(m);
        if trials.width(ranked[0]) < input.eps {
            tracing::debug!(iteration, trials = trials.points.len(), "accuracy reached");
            return Ok(trials.best());
        }
        let xs = ranked
            .iter()
            .take(width)
            .map(|&i| trials.next_point(i, m))
            .collect_vec();
        for (x, z) in evaluate(&xs)? {
            trials.insert(x, z);
        }
    }
    let best = trials.best();
    tracing::warn!(
        iterations = input.max_iterations,
        x = best.x,
        "iteration cap reached"
    );
    Ok(best)
}

/// Strongin's algorithm on a single process
#[derive(Debug)]
pub struct StronginSeq {
    input: OptimizeInput,
    output: Minimum,
}

impl StronginSeq {
    /// Create the task
    pub fn new(input: OptimizeInput) -> Self {
        Self {
            input,
            output: Minimum::default(),
        }
    }
}

impl Task for StronginSeq {
    type Input = OptimizeInput;
    type Output = Minimum;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &OptimizeInput {
        &self.input
    }
    fn output(&self) -> &Minimum {
        &self.output
    }

    fn validation(&mut self) -> bool {
        self.input.is_valid()
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output = Minimum::default();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let f = self.input.objective;
        self.output = search(&self.input, 1, |xs| {
            Ok(xs.iter().map(|&x| (x, f(x))).collect())
        })?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_minimum(&self.input, &self.output)
    }
}

fn check_minimum(input: &OptimizeInput, output: &Minimum) -> Result<()> {
    if output.x >= input.lower && output.x <= input.upper {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "minimum at {} lies outside [{}, {}]",
            output.x, input.lower, input.upper
        )))
    }
}

/// Strongin's algorithm evaluating one trial per rank and iteration
///
/// The `P` best rated intervals receive a trial each, rank `k` evaluating the `k`-th. The
/// trials are all-gathered, so every rank keeps the same trial set. The objective must be the
/// same function on every rank; the numeric parameters are taken from the root.
#[derive(Debug)]
pub struct StronginDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: OptimizeInput,
    output: Minimum,
}

impl<'a, C: Communicator> StronginDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: OptimizeInput) -> Self {
        Self {
            comm,
            input,
            output: Minimum::default(),
        }
    }
}

impl<C: Communicator> Task for StronginDistributed<'_, C> {
    type Input = OptimizeInput;
    type Output = Minimum;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &OptimizeInput {
        &self.input
    }
    fn output(&self) -> &Minimum {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || self.input.is_valid())
    }

    fn pre_processing(&mut self) -> Result<()> {
        let comm = self.comm;
        let mut params = vec![
            self.input.lower,
            self.input.upper,
            self.input.reliability,
            self.input.eps,
        ];
        comm.broadcast(&mut params, ROOT)?;
        if let [lower, upper, reliability, eps] = params[..] {
            self.input.lower = lower;
            self.input.upper = upper;
            self.input.reliability = reliability;
            self.input.eps = eps;
        }
        self.input.max_iterations = comm.broadcast_value(self.input.max_iterations, ROOT)?;
        self.output = Minimum::default();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let f = self.input.objective;
        let size = comm.size();
        let rank = comm.rank();
        self.output = search(&self.input, size, |xs| {
            let mine = xs.get(rank).map(|&x| [x, f(x)]);
            let counts = (0..size)
                .map(|p| if p < xs.len() { 2 } else { 0 })
                .collect_vec();
            let local = mine.as_ref().map_or(&[][..], |pair| &pair[..]);
            let all = comm.all_gatherv(local, &counts)?;
            Ok(all.into_iter().tuples().collect())
        })?;
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_minimum(&self.input, &self.output)
    }
}
