//! Per-class queues (§4.6)
//!
//! Four classes, scanned top-to-bottom on every pop: `Realtime` (a binary
//! heap ordered by ascending deadline, ties broken by submission order),
//! then `High`, `Normal`, `Low` (plain FIFO). A past-deadline head task in
//! `Realtime` is evicted and reported `Cancelled` before the scan falls
//! through to the next class.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use parking_lot::Mutex;

use crate::task::{CompletionCallback, Task, TaskPriority};

pub(crate) struct Entry {
    pub id: u64,
    pub priority: TaskPriority,
    pub deadline_ns: Option<u64>,
    pub submitted_seq: u64,
    pub task: Box<dyn Task>,
    pub on_complete: Option<Box<dyn CompletionCallback>>,
}

impl Entry {
    fn rt_key(&self) -> (u64, u64) {
        (self.deadline_ns.unwrap_or(u64::MAX), self.submitted_seq)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.rt_key() == other.rt_key()
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rt_key().cmp(&other.rt_key())
    }
}

pub(crate) struct TaskQueues {
    realtime: Mutex<BinaryHeap<Reverse<Entry>>>,
    high: Mutex<VecDeque<Entry>>,
    normal: Mutex<VecDeque<Entry>>,
    low: Mutex<VecDeque<Entry>>,
}

impl TaskQueues {
    pub fn new() -> Self {
        Self {
            realtime: Mutex::new(BinaryHeap::new()),
            high: Mutex::new(VecDeque::new()),
            normal: Mutex::new(VecDeque::new()),
            low: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, entry: Entry) {
        match entry.priority {
            TaskPriority::Realtime => self.realtime.lock().push(Reverse(entry)),
            TaskPriority::High => self.high.lock().push_back(entry),
            TaskPriority::Normal => self.normal.lock().push_back(entry),
            TaskPriority::Low => self.low.lock().push_back(entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.realtime.lock().is_empty()
            && self.high.lock().is_empty()
            && self.normal.lock().is_empty()
            && self.low.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.realtime.lock().len()
            + self.high.lock().len()
            + self.normal.lock().len()
            + self.low.lock().len()
    }

    /// Pop the next runnable task. `expired` collects realtime entries
    /// evicted because their deadline had already passed when scanned; the
    /// caller reports those `Cancelled` after releasing every queue lock.
    pub fn pop(&self, now_ns: u64, expired: &mut Vec<Entry>) -> Option<Entry> {
        {
            let mut rt = self.realtime.lock();
            while let Some(Reverse(top)) = rt.peek() {
                if top.deadline_ns.is_some_and(|d| d < now_ns) {
                    let Reverse(entry) = rt.pop().expect("peek just observed a head");
                    expired.push(entry);
                } else {
                    break;
                }
            }
            if let Some(Reverse(entry)) = rt.pop() {
                return Some(entry);
            }
        }
        if let Some(entry) = self.high.lock().pop_front() {
            return Some(entry);
        }
        if let Some(entry) = self.normal.lock().pop_front() {
            return Some(entry);
        }
        self.low.lock().pop_front()
    }
}
