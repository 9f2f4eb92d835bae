//! Task types (§4.6)

use le_core::CoreError;

/// Priority class. Classes are scanned top-to-bottom on every worker wakeup;
/// `Realtime` is the only class with deadline ordering, the rest are FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPriority {
    Realtime,
    High,
    Normal,
    Low,
}

/// Outcome reported to a task's completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Cancelled,
    Failed(String),
}

/// Unit of work submitted to the scheduler. Implemented by any `FnMut`
/// closure that returns a `CoreError` on failure, the same collaborator
/// shape as `le_pipeline::Stage`.
pub trait Task: Send {
    fn run(&mut self) -> Result<(), CoreError>;
}

impl<F> Task for F
where
    F: FnMut() -> Result<(), CoreError> + Send,
{
    fn run(&mut self) -> Result<(), CoreError> {
        self()
    }
}

/// Invoked exactly once with the task's final status.
pub trait CompletionCallback: Send {
    fn on_complete(&mut self, status: TaskStatus);
}

impl<F> CompletionCallback for F
where
    F: FnMut(TaskStatus) + Send,
{
    fn on_complete(&mut self, status: TaskStatus) {
        self(status)
    }
}
