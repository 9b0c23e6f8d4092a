use crate::base::RequestId;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct QueueState {
    items: VecDeque<RequestId>,
    // tickets of the blocked callers, in arrival order
    waiting: VecDeque<u64>,
    next_ticket: u64,
    last_modified: Instant,
}

impl QueueState {
    fn push(&mut self, id: RequestId) {
        self.items.push_back(id);
        self.last_modified = Instant::now();
    }

    fn abandon(&mut self, ticket: u64) {
        if let Some(pos) = self.waiting.iter().position(|t| *t == ticket) {
            self.waiting.remove(pos);
        }
    }
}

/// A bounded queue of running requests which remembers when it was last touched.
///
/// Callers blocked in `put` are admitted strictly in arrival order: each one draws
/// a ticket and may only enter once its ticket heads the waiting line, whatever
/// order the condition variable wakes them up in.
#[derive(Debug)]
pub struct TimedBlockingQueue {
    capacity: usize,
    state: Mutex<QueueState>,
    not_full: Condvar,
}

impl TimedBlockingQueue {
    pub fn new(capacity: usize) -> Self {
        TimedBlockingQueue {
            capacity,
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                waiting: VecDeque::new(),
                next_ticket: 0,
                last_modified: Instant::now(),
            }),
            not_full: Condvar::new(),
        }
    }

    /// Inserts `id`, waiting for room up to `timeout` (`None` waits forever).
    pub fn put(&self, id: RequestId, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.state.lock();
        if state.waiting.is_empty() && state.items.len() < self.capacity {
            state.push(id);
            return true;
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting.push_back(ticket);
        loop {
            if state.waiting.front() == Some(&ticket) && state.items.len() < self.capacity {
                state.waiting.pop_front();
                state.push(id);
                if !state.waiting.is_empty() && state.items.len() < self.capacity {
                    // the next in line may fit as well
                    self.not_full.notify_all();
                }
                return true;
            }
            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        state.abandon(ticket);
                        // the head of the line may have changed
                        self.not_full.notify_all();
                        return false;
                    }
                    self.not_full.wait_until(&mut state, deadline);
                }
                None => self.not_full.wait(&mut state),
            }
        }
    }

    /// Removes `id` if it is queued, waking up the waiting callers.
    pub fn remove(&self, id: RequestId) -> bool {
        let mut state = self.state.lock();
        match state.items.iter().position(|item| *item == id) {
            Some(pos) => {
                state.items.remove(pos);
                state.last_modified = Instant::now();
                if !state.waiting.is_empty() {
                    self.not_full.notify_all();
                }
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.state.lock().items.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting.len()
    }

    pub fn last_modified(&self) -> Instant {
        self.state.lock().last_modified
    }

    /// Marks the queue as recently used without changing its content.
    pub fn touch(&self) {
        self.state.lock().last_modified = Instant::now();
    }

    /// Whether the queue holds nothing and has not been touched for longer than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        let state = self.state.lock();
        state.items.is_empty() && state.waiting.is_empty() && state.last_modified.elapsed() > max_age
    }
}
