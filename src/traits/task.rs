//! Task lifecycle
use crate::{error::Result, types::TaskKind};

pub trait Task {
    //! A single algorithm run through four ordered stages
    //!
    //! The stages are called once each, in the order [Task::validation],
    //! [Task::pre_processing], [Task::run], [Task::post_processing].
    //! [crate::runner::TaskRunner] enforces the order.

    /// Input type
    type Input;
    /// Output type
    type Output;

    /// Sequential or distributed variant
    fn kind(&self) -> TaskKind;

    /// The input the task was created with
    fn input(&self) -> &Self::Input;

    /// The output; meaningful once [Task::run] has succeeded
    fn output(&self) -> &Self::Output;

    /// Check the input. Returns `false` for input the algorithm cannot handle.
    fn validation(&mut self) -> bool;

    /// Prepare partitions and buffers
    fn pre_processing(&mut self) -> Result<()>;

    /// Compute the output
    fn run(&mut self) -> Result<()>;

    /// Check the output
    fn post_processing(&mut self) -> Result<()>;
}
