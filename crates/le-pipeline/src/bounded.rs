//! Generic bounded queue over mutex + two condvars.
//!
//! Both the chunk ring (C2) and the task scheduler (C6) need "block the
//! caller up to a timeout, wake promptly on push/pop/stop" semantics. This
//! type is the shared primitive so neither call site has to reason about
//! lock ordering or spurious-wakeup handling on its own — the design note
//! on "reimplementing the same mutex+condvar dance per queue" (§9).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

struct Inner<T> {
    items: VecDeque<T>,
    capacity: usize,
    detached: bool,
}

pub enum BoundedPush<T> {
    Ok,
    Full(T),
}

pub struct BoundedChannel<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    stopped: AtomicBool,
}

impl<T> BoundedChannel<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity),
                capacity,
                detached: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Enqueue without blocking. Returns the item back on `Full`.
    pub fn try_push(&self, item: T) -> BoundedPush<T> {
        let mut inner = self.inner.lock();
        if inner.items.len() >= inner.capacity {
            return BoundedPush::Full(item);
        }
        inner.items.push_back(item);
        drop(inner);
        self.not_empty.notify_one();
        BoundedPush::Ok
    }

    /// Wait up to `timeout` for an item. `None` on timeout or after `stop()`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                drop(inner);
                self.not_full.notify_one();
                return Some(item);
            }
            if self.stopped.load(Ordering::Acquire) {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.not_empty.wait_for(&mut inner, deadline - now);
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn clear_stopped(&self) {
        self.stopped.store(false, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn drain(&self) -> Vec<T> {
        let mut inner = self.inner.lock();
        let drained = inner.items.drain(..).collect();
        drop(inner);
        self.not_full.notify_all();
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    pub fn space(&self) -> usize {
        let inner = self.inner.lock();
        inner.capacity - inner.items.len()
    }

    pub fn set_detached(&self, detached: bool) {
        self.inner.lock().detached = detached;
    }

    pub fn resize(&self, new_capacity: usize) -> Result<(), ()> {
        let mut inner = self.inner.lock();
        if !inner.detached || !inner.items.is_empty() {
            return Err(());
        }
        inner.capacity = new_capacity;
        inner.items = VecDeque::with_capacity(new_capacity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_fifo_order() {
        let chan: BoundedChannel<u32> = BoundedChannel::new(4);
        assert!(matches!(chan.try_push(1), BoundedPush::Ok));
        assert!(matches!(chan.try_push(2), BoundedPush::Ok));
        assert_eq!(chan.pop_timeout(Duration::from_millis(10)), Some(1));
        assert_eq!(chan.pop_timeout(Duration::from_millis(10)), Some(2));
    }

    #[test]
    fn full_returns_item() {
        let chan: BoundedChannel<u32> = BoundedChannel::new(1);
        assert!(matches!(chan.try_push(1), BoundedPush::Ok));
        match chan.try_push(2) {
            BoundedPush::Full(v) => assert_eq!(v, 2),
            BoundedPush::Ok => panic!("expected Full"),
        }
    }

    #[test]
    fn stop_unblocks_pop() {
        let chan: BoundedChannel<u32> = BoundedChannel::new(1);
        chan.stop();
        assert_eq!(chan.pop_timeout(Duration::from_millis(50)), None);
    }
}
