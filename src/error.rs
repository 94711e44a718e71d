//! Error types

use crate::types::{Stage, Tag};
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by tasks, communicators, fixtures and the test harness
#[derive(Error, Debug)]
pub enum Error {
    /// A rank outside of the communicator was addressed
    #[error("invalid rank {rank} for a communicator of size {size}")]
    InvalidRank {
        /// The offending rank
        rank: usize,
        /// Communicator size
        size: usize,
    },

    /// No matching message arrived in time
    #[error("rank {rank} timed out waiting for a message from rank {from} with tag {tag}")]
    Timeout {
        /// Waiting rank
        rank: usize,
        /// Expected source
        from: usize,
        /// Expected tag
        tag: Tag,
    },

    /// A receive was posted that can never be matched
    #[error("no message from rank {from} with tag {tag} is pending")]
    NoMessage {
        /// Expected source
        from: usize,
        /// Expected tag
        tag: Tag,
    },

    /// The peers of a rank are gone
    #[error("rank {0} lost its connection to the communicator")]
    Disconnected(usize),

    /// A message carried a different element type than the receiver expected
    #[error("message from rank {from} with tag {tag} has an unexpected element type")]
    TypeMismatch {
        /// Source of the message
        from: usize,
        /// Tag of the message
        tag: Tag,
    },

    /// Send and receive counts of a collective disagree
    #[error("send count {send} does not match receive count {recv}")]
    CountMismatch {
        /// Send count
        send: usize,
        /// Receive count
        recv: usize,
    },

    /// A buffer is too small for the requested operation
    #[error("buffer too small: {needed} elements needed, {got} provided")]
    BufferTooSmall {
        /// Required number of elements
        needed: usize,
        /// Available number of elements
        got: usize,
    },

    /// A rank of the in-process universe panicked
    #[error("rank {0} panicked")]
    RankPanicked(usize),

    /// The validation stage rejected the input
    #[error("validation failed")]
    ValidationFailed,

    /// A lifecycle stage was invoked out of order
    #[error("stage {attempted} cannot run while the task is in stage {current}")]
    StageOrder {
        /// Stage the task is in
        current: Stage,
        /// Stage that was requested
        attempted: Stage,
    },

    /// The run stage found no state from pre-processing
    #[error("run called before pre-processing")]
    NotPreProcessed,

    /// Elimination met a vanishing pivot
    #[error("matrix is singular (pivot in column {column} vanishes)")]
    SingularMatrix {
        /// Column of the failed pivot
        column: usize,
    },

    /// An iterative method ran out of iterations
    #[error("no convergence after {iterations} iterations (residual {residual:e})")]
    NotConverged {
        /// Number of iterations performed
        iterations: usize,
        /// Residual reached
        residual: f64,
    },

    /// Input that passed validation is unusable at run time
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The test case rejected the output of a rank
    #[error("output check failed on rank {0}")]
    CheckFailed(usize),

    /// Two ranks produced different outputs
    #[error("output on rank {0} differs from the output on rank 0")]
    RankDivergence(usize),

    /// A distributed run disagrees with the sequential variant
    #[error("output on {ranks} ranks differs from the sequential output")]
    SequentialMismatch {
        /// Number of ranks of the failing run
        ranks: usize,
    },

    /// A performance run exceeded its time limit
    #[error("{name} took {elapsed:.6}s, limit is {limit:.6}s")]
    TooSlow {
        /// Measured task
        name: String,
        /// Measured time in seconds
        elapsed: f64,
        /// Time limit in seconds
        limit: f64,
    },

    /// A fixture file is malformed
    #[error("fixture line {line}: {message}")]
    Fixture {
        /// One-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// An environment variable holds an unusable value
    #[error("environment variable {name} has invalid value {value:?}")]
    Config {
        /// Variable name
        name: String,
        /// Variable value
        value: String,
    },

    /// I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// RON parse failure
    #[cfg(feature = "serde")]
    #[error(transparent)]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization failure
    #[cfg(feature = "serde")]
    #[error(transparent)]
    Ron(#[from] ron::Error),
}
