//! Task scheduler (C6, §4.6)
//!
//! One shared pool serving every stream context, grounded on the same
//! worker-pool-over-a-shared-queue shape as `rf-engine::DiskReaderPool`,
//! generalized to four priority classes and a deadline-ordered realtime
//! queue (`crate::queue::TaskQueues`).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use le_core::{CoreError, CoreResult, Services};
use parking_lot::{Condvar, Mutex};

use crate::queue::{Entry, TaskQueues};
use crate::task::{CompletionCallback, TaskPriority, TaskStatus};
use crate::worker::{self, Bookkeeping, WorkerShared};

/// Snapshot of lifetime task counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    pub tasks_submitted: u64,
    pub tasks_completed: u64,
    pub tasks_cancelled: u64,
    pub tasks_failed: u64,
}

/// Shared background pool. `submit`/`cancel`/`status` are safe to call
/// concurrently with worker execution; `pause`/`resume` affect every
/// worker (a "per-worker active flag" they all share, per §4.6).
pub struct TaskScheduler {
    queues: Arc<TaskQueues>,
    bookkeeping: Arc<Mutex<Bookkeeping>>,
    wake: Arc<Condvar>,
    wake_lock: Arc<Mutex<()>>,
    shutdown: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    services: Services,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    submitted: Arc<AtomicU64>,
    completed: Arc<AtomicU64>,
    cancelled: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl TaskScheduler {
    /// Spawn `num_workers` threads immediately; the pool runs until
    /// `shutdown` is called or the scheduler is dropped.
    pub fn new(num_workers: usize, services: Services) -> CoreResult<Self> {
        if num_workers == 0 {
            return Err(CoreError::InvalidArgument(
                "num_workers must be > 0".into(),
            ));
        }

        let scheduler = Self {
            queues: Arc::new(TaskQueues::new()),
            bookkeeping: Arc::new(Mutex::new(Bookkeeping::new())),
            wake: Arc::new(Condvar::new()),
            wake_lock: Arc::new(Mutex::new(())),
            shutdown: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::with_capacity(num_workers)),
            services,
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
            submitted: Arc::new(AtomicU64::new(0)),
            completed: Arc::new(AtomicU64::new(0)),
            cancelled: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        };

        let mut workers = scheduler.workers.lock();
        for i in 0..num_workers {
            let shared = Arc::new(WorkerShared {
                queues: scheduler.queues.clone(),
                bookkeeping: scheduler.bookkeeping.clone(),
                wake: scheduler.wake.clone(),
                wake_lock: scheduler.wake_lock.clone(),
                shutdown: scheduler.shutdown.clone(),
                paused: scheduler.paused.clone(),
                services: scheduler.services.clone(),
                completed: scheduler.completed.clone(),
                cancelled: scheduler.cancelled.clone(),
                failed: scheduler.failed.clone(),
            });
            match std::thread::Builder::new()
                .name(format!("le-scheduler-worker-{i}"))
                .spawn(move || worker::run_worker(shared))
            {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    log::error!("failed to spawn scheduler worker {i}: {e}");
                }
            }
        }
        drop(workers);

        Ok(scheduler)
    }

    /// Submit a task. Returns the new task id, or `0` if the scheduler has
    /// already been shut down.
    pub fn submit(
        &self,
        priority: TaskPriority,
        deadline_ns: Option<u64>,
        task: impl FnMut() -> Result<(), CoreError> + Send + 'static,
        on_complete: Option<Box<dyn CompletionCallback>>,
    ) -> u64 {
        if self.shutdown.load(Ordering::Acquire) {
            return 0;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.bookkeeping
            .lock()
            .statuses
            .insert(id, TaskStatus::Queued);
        self.submitted.fetch_add(1, Ordering::Relaxed);

        self.queues.push(Entry {
            id,
            priority,
            deadline_ns,
            submitted_seq: seq,
            task: Box::new(task),
            on_complete,
        });

        self.wake.notify_one();
        id
    }

    /// Best-effort cancellation: flags the task if it hasn't started yet.
    /// If a worker has already dequeued and begun running it, this has no
    /// effect — it merely records the request.
    pub fn cancel(&self, id: u64) {
        let mut bk = self.bookkeeping.lock();
        if matches!(
            bk.statuses.get(&id),
            Some(TaskStatus::Completed) | Some(TaskStatus::Cancelled) | Some(TaskStatus::Failed(_))
        ) {
            return;
        }
        bk.cancel_requested.insert(id);
    }

    /// Advisory: the last status recorded for `id`, or `None` if unknown.
    pub fn status(&self, id: u64) -> Option<TaskStatus> {
        self.bookkeeping.lock().statuses.get(&id).cloned()
    }

    /// Stop every worker from dequeuing new tasks. Tasks already running
    /// are not interrupted.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> usize {
        self.queues.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            tasks_submitted: self.submitted.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Relaxed),
            tasks_cancelled: self.cancelled.load(Ordering::Relaxed),
            tasks_failed: self.failed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting new tasks and join every worker thread.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_all();
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
