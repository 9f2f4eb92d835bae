//! Worker loop (§4.6)
//!
//! Each worker scans the four classes top-to-bottom via `TaskQueues::pop`,
//! runs the first available task, and reports its outcome. Idle workers
//! wait on the wake condvar with a bounded poll interval so a realtime
//! task's deadline is still checked even when nothing new is submitted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use le_core::Services;
use parking_lot::{Condvar, Mutex};

use crate::queue::{Entry, TaskQueues};
use crate::task::TaskStatus;

/// Poll interval for an idle worker: bounds how stale a realtime deadline
/// check can be when no task has been submitted or woken it.
const IDLE_POLL: Duration = Duration::from_millis(20);

pub(crate) struct Bookkeeping {
    pub statuses: HashMap<u64, TaskStatus>,
    pub cancel_requested: std::collections::HashSet<u64>,
}

impl Bookkeeping {
    pub fn new() -> Self {
        Self {
            statuses: HashMap::new(),
            cancel_requested: HashSet::new(),
        }
    }
}

pub(crate) struct WorkerShared {
    pub queues: Arc<TaskQueues>,
    pub bookkeeping: Arc<Mutex<Bookkeeping>>,
    pub wake: Arc<Condvar>,
    pub wake_lock: Arc<Mutex<()>>,
    pub shutdown: Arc<AtomicBool>,
    pub paused: Arc<AtomicBool>,
    pub services: Services,
    pub completed: Arc<std::sync::atomic::AtomicU64>,
    pub cancelled: Arc<std::sync::atomic::AtomicU64>,
    pub failed: Arc<std::sync::atomic::AtomicU64>,
}

fn report(shared: &WorkerShared, mut entry: Entry, status: TaskStatus) {
    shared
        .bookkeeping
        .lock()
        .statuses
        .insert(entry.id, status.clone());
    match &status {
        TaskStatus::Completed => {
            shared.completed.fetch_add(1, Ordering::Relaxed);
        }
        TaskStatus::Cancelled => {
            shared.cancelled.fetch_add(1, Ordering::Relaxed);
        }
        TaskStatus::Failed(reason) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            log::warn!("task {} failed: {reason}", entry.id);
        }
        TaskStatus::Queued | TaskStatus::Running => {}
    }
    if let Some(cb) = entry.on_complete.as_mut() {
        cb.on_complete(status);
    }
}

pub(crate) fn run_worker(shared: Arc<WorkerShared>) {
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }
        if shared.paused.load(Ordering::Acquire) {
            let mut guard = shared.wake_lock.lock();
            shared.wake.wait_for(&mut guard, IDLE_POLL);
            continue;
        }

        let now_ns = shared.services.clock.now_ns();
        let mut expired = Vec::new();
        let popped = shared.queues.pop(now_ns, &mut expired);

        for entry in expired {
            report(&shared, entry, TaskStatus::Cancelled);
        }

        match popped {
            Some(entry) => {
                let was_cancelled = shared
                    .bookkeeping
                    .lock()
                    .cancel_requested
                    .remove(&entry.id);
                if was_cancelled {
                    report(&shared, entry, TaskStatus::Cancelled);
                    continue;
                }

                shared
                    .bookkeeping
                    .lock()
                    .statuses
                    .insert(entry.id, TaskStatus::Running);

                let mut entry = entry;
                let result = entry.task.run();
                let status = match result {
                    Ok(()) => TaskStatus::Completed,
                    Err(e) => TaskStatus::Failed(e.to_string()),
                };
                report(&shared, entry, status);
            }
            None => {
                let mut guard = shared.wake_lock.lock();
                shared.wake.wait_for(&mut guard, IDLE_POLL);
            }
        }
    }
}
