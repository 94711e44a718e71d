//! Communicator backends

mod local;
#[cfg(feature = "mpi")]
mod mpi;
mod single;

pub use local::{LocalComm, LocalUniverse};
#[cfg(feature = "mpi")]
pub use mpi::MpiComm;
pub use single::SingleProcess;
