//! Linear solvers: Jacobi, Gauss-Seidel, simple iteration and Gauss-Jordan elimination
//!
//! The iterative methods start from zero and stop once the residual
//! `max_i |A_i x - b_i|` drops below the tolerance.
mod gauss_jordan;
mod gauss_seidel;
mod jacobi;
mod simple_iteration;
mod system;

pub use gauss_jordan::{GaussJordanDistributed, GaussJordanSeq, PIVOT_TOLERANCE};
pub use gauss_seidel::{GaussSeidelDistributed, GaussSeidelSeq};
pub use jacobi::{JacobiDistributed, JacobiSeq};
pub use simple_iteration::{SimpleIterationDistributed, SimpleIterationInput, SimpleIterationSeq};
pub use system::{IterativeInput, LinearSystem};
