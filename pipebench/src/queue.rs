use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::Error;

struct State<T> {
    items: VecDeque<T>,
    open: bool,
}

/// An unbounded FIFO mailbox with an explicit open/close lifecycle.
///
/// `push` never blocks.  `pop` blocks until an item shows up or the queue is
/// closed; a closed, empty queue answers `None` to every current and future
/// `pop`.  Items are stored by value, so whichever thread pops an item owns it
/// outright until it pushes it somewhere else.
pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> WorkQueue<T> {
    /// Create a queue that is already open.
    pub fn new() -> Self {
        WorkQueue {
            state: Mutex::new(State {
                items: VecDeque::new(),
                open: true,
            }),
            cond: Condvar::new(),
        }
    }

    pub fn open(&self) {
        let mut state = self.state.lock();
        state.open = true;
        self.cond.notify_all();
    }

    /// Close the queue and wake every blocked `pop` so it can see the close.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.open = false;
        self.cond.notify_all();
    }

    pub fn push(&self, item: T) -> Result<(), Error> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(Error::QueueClosed);
        }
        state.items.push_back(item);
        self.cond.notify_one();
        Ok(())
    }

    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if !state.open {
                return None;
            }
            self.cond.wait(&mut state);
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Tear the queue down.  Anything still queued is an accounting bug in
    /// whoever fed the queue, so it is reported rather than dropped.
    pub fn destroy(self) -> Result<(), Error> {
        let pending = self.len();
        if pending > 0 {
            return Err(Error::QueueNotEmpty(pending));
        }
        Ok(())
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for WorkQueue<T> {
    fn drop(&mut self) {
        let pending = self.state.get_mut().items.len();
        if pending > 0 {
            tracing::error!(pending, "work queue dropped with pending items");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn fifo_order() {
        let q = WorkQueue::new();
        for i in 0..5 {
            q.push(i).unwrap();
        }
        q.close();
        let got: Vec<i32> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(vec![0, 1, 2, 3, 4], got);
    }

    #[test]
    fn closed_queue_still_drains() {
        let q = WorkQueue::new();
        q.push(1).unwrap();
        q.close();
        assert!(!q.is_open());
        assert_eq!(Some(1), q.pop());
        assert_eq!(None, q.pop());
        assert_eq!(None, q.pop());
    }

    #[test]
    fn push_to_closed_queue_fails() {
        let q = WorkQueue::new();
        q.close();
        assert!(matches!(q.push(1), Err(Error::QueueClosed)));
        assert!(q.is_empty());
    }

    #[test]
    fn reopen_accepts_pushes() {
        let q = WorkQueue::new();
        q.close();
        q.open();
        q.push(1).unwrap();
        assert_eq!(1, q.len());
        assert_eq!(Some(1), q.pop());
    }

    #[test]
    fn destroy_non_empty_fails() {
        let q = WorkQueue::new();
        q.push(1).unwrap();
        q.push(2).unwrap();
        assert!(matches!(q.destroy(), Err(Error::QueueNotEmpty(2))));
    }

    #[test]
    fn destroy_empty_succeeds() {
        let q: WorkQueue<u32> = WorkQueue::new();
        q.close();
        assert!(q.destroy().is_ok());
    }

    #[test]
    fn close_wakes_blocked_poppers() {
        let q: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::new());
        let mut threads = Vec::new();
        for _ in 0..4 {
            let q = Arc::clone(&q);
            threads.push(thread::spawn(move || q.pop()));
        }
        thread::sleep(Duration::from_millis(20));
        q.close();
        for t in threads {
            assert_eq!(None, t.join().unwrap());
        }
    }

    #[test]
    fn concurrent_pops_see_each_item_once() {
        let q: Arc<WorkQueue<u32>> = Arc::new(WorkQueue::new());
        let mut threads = Vec::new();
        for _ in 0..8 {
            let q = Arc::clone(&q);
            threads.push(thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(x) = q.pop() {
                    got.push(x);
                }
                got
            }));
        }
        for i in 0..10_000 {
            q.push(i).unwrap();
        }
        q.close();
        let mut all: Vec<u32> = threads
            .into_iter()
            .flat_map(|t| t.join().unwrap())
            .collect();
        all.sort();
        assert_eq!((0..10_000).collect::<Vec<_>>(), all);
    }
}
