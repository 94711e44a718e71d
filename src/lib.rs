//! SPMD task lifecycle, communicators and distributed algorithms
//!
//! Every algorithm is a [Task](traits::Task) in a sequential and a distributed variant. The
//! distributed variants take a [Communicator](traits::Communicator): a [SingleProcess], a
//! [LocalUniverse] simulating several ranks with threads, or, with the `mpi` feature, an
//! [MpiComm] wrapping an MPI communicator.
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod collectives;
pub mod comm;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
mod io;
pub mod partition;
pub mod perf;
pub mod runner;
pub mod tasks;
pub mod traits;
pub mod types;

#[cfg(feature = "mpi")]
pub use comm::MpiComm;
pub use comm::{LocalComm, LocalUniverse, SingleProcess};
pub use error::{Error, Result};
pub use partition::BlockDistribution;
pub use runner::{run_pipeline, TaskRunner};

