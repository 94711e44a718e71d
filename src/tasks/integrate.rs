//! Numerical integration over boxes: product quadrature rules and Monte Carlo
mod monte_carlo;
mod rules;

pub use monte_carlo::{MonteCarloDistributed, MonteCarloInput, MonteCarloSeq};
pub use rules::{QuadratureDistributed, QuadratureInput, QuadratureRule, QuadratureSeq};

/// Function of a point in `bounds.len()` dimensions
pub type Integrand = fn(&[f64]) -> f64;

// Every bound is finite and non-empty.
fn valid_bounds(bounds: &[(f64, f64)]) -> bool {
    !bounds.is_empty()
        && bounds
            .iter()
            .all(|&(a, b)| a.is_finite() && b.is_finite() && a < b)
}
