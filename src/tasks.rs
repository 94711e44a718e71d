//! Algorithms, each as a sequential and a distributed [Task](crate::traits::Task)
//!
//! Distributed tasks read their input on rank 0. Other ranks may be constructed with any
//! input (usually a copy); it is ignored. After `run` every rank holds the same output.
pub mod collective;
pub mod hull;
pub mod image;
pub mod integrate;
pub mod linear;
pub mod matmul;
pub mod optimize;
pub mod reduction;
pub mod sort;

use crate::traits::Communicator;

/// Rank that reads the input and assembles the output
pub const ROOT: usize = 0;

/// Evaluate `check` on the root and share the verdict
///
/// Communication failures count as a negative verdict.
pub(crate) fn root_decides<C: Communicator>(comm: &C, check: impl FnOnce() -> bool) -> bool {
    let verdict = comm.is_root(ROOT) && check();
    match comm.broadcast_flag(verdict, ROOT) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "could not share the validation verdict");
            false
        }
    }
}
