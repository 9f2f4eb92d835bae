//! le-scheduler: shared background task pool for LibEtude (C6, §4.6)
//!
//! Four priority classes (`Realtime`, `High`, `Normal`, `Low`), a
//! deadline-ordered realtime queue with past-deadline cancellation, and a
//! pool of worker threads scanning classes top-to-bottom.

mod queue;
mod scheduler;
mod task;
mod worker;

pub use scheduler::{SchedulerStats, TaskScheduler};
pub use task::{CompletionCallback, TaskPriority, TaskStatus};
