//! Driver enforcing the task lifecycle
use crate::{
    error::{Error, Result},
    traits::Task,
    types::Stage,
};

/// Runs the stages of a [Task] in order, each at most once
///
/// A stage called out of order fails with [Error::StageOrder]. A failed stage leaves the runner
/// in [Stage::Failed], after which every stage is refused.
#[derive(Debug)]
pub struct TaskRunner<T: Task> {
    task: T,
    stage: Stage,
    name: String,
}

fn short_type_name<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl<T: Task> TaskRunner<T> {
    /// Wrap a task that has not run any stage yet
    pub fn new(task: T) -> Self {
        Self::named(task, short_type_name::<T>())
    }

    /// Wrap a task and use `name` in log records
    pub fn named(task: T, name: impl Into<String>) -> Self {
        Self {
            task,
            stage: Stage::Created,
            name: name.into(),
        }
    }

    /// Name used in log records and performance reports
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last completed stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The wrapped task
    pub fn task(&self) -> &T {
        &self.task
    }

    /// Unwrap the task
    pub fn into_task(self) -> T {
        self.task
    }

    /// The output of the task; only meaningful after [TaskRunner::run]
    pub fn output(&self) -> &T::Output {
        self.task.output()
    }

    fn advance(&mut self, attempted: Stage, f: impl FnOnce(&mut T) -> Result<()>) -> Result<()> {
        if self.stage.next() != Some(attempted) {
            return Err(Error::StageOrder {
                current: self.stage,
                attempted,
            });
        }
        let _span = tracing::debug_span!(
            "stage",
            task = %self.name,
            kind = %self.task.kind(),
            stage = %attempted
        )
        .entered();
        match f(&mut self.task) {
            Ok(()) => {
                tracing::trace!("stage complete");
                self.stage = attempted;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "stage failed");
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    /// Run [Task::validation]
    pub fn validation(&mut self) -> Result<()> {
        self.advance(Stage::Validated, |t| {
            if t.validation() {
                Ok(())
            } else {
                Err(Error::ValidationFailed)
            }
        })
    }

    /// Run [Task::pre_processing]
    pub fn pre_processing(&mut self) -> Result<()> {
        self.advance(Stage::PreProcessed, T::pre_processing)
    }

    /// Run [Task::run]
    pub fn run(&mut self) -> Result<()> {
        self.advance(Stage::Ran, T::run)
    }

    /// Run [Task::post_processing]
    pub fn post_processing(&mut self) -> Result<()> {
        self.advance(Stage::PostProcessed, T::post_processing)
    }

    /// Run all four stages and return the output
    pub fn run_pipeline(&mut self) -> Result<&T::Output> {
        let _span = tracing::info_span!("task", task = %self.name).entered();
        self.validation()?;
        self.pre_processing()?;
        self.run()?;
        self.post_processing()?;
        Ok(self.task.output())
    }
}

/// Run all stages of `task` and return its output
pub fn run_pipeline<T: Task>(task: T) -> Result<T::Output>
where
    T::Output: Clone,
{
    let mut runner = TaskRunner::new(task);
    runner.run_pipeline().cloned()
}
