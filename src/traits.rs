//! Traits

mod bit_eq;
mod communicator;
#[cfg(feature = "serde")]
mod io;
mod task;

pub use bit_eq::BitEq;
pub use communicator::Communicator;
#[cfg(feature = "serde")]
pub use io::{RONExport, RONImport};
pub use task::Task;
