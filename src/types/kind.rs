//! Task kinds and lifecycle stages
use std::fmt;

/// Variant of a task
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TaskKind {
    /// Runs on a single process without communication
    Sequential,
    /// Runs on every rank of a communicator
    Distributed,
}

impl TaskKind {
    /// Short name used in test and performance reports
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Sequential => "seq",
            TaskKind::Distributed => "mpi",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle stage a task has completed
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Constructed, nothing run yet
    Created,
    /// Validation passed
    Validated,
    /// Pre-processing done
    PreProcessed,
    /// Run done
    Ran,
    /// Post-processing done
    PostProcessed,
    /// A stage failed; the task cannot continue
    Failed,
}

impl Stage {
    /// The stage that may follow this one
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Created => Some(Stage::Validated),
            Stage::Validated => Some(Stage::PreProcessed),
            Stage::PreProcessed => Some(Stage::Ran),
            Stage::Ran => Some(Stage::PostProcessed),
            Stage::PostProcessed | Stage::Failed => None,
        }
    }

    /// Name of the stage
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Created => "created",
            Stage::Validated => "validation",
            Stage::PreProcessed => "pre_processing",
            Stage::Ran => "run",
            Stage::PostProcessed => "post_processing",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
