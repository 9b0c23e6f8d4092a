use super::{PriorityProvider, ThreadBlocker};
use crate::base::{Request, RequestId};
use crate::logging;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Position of a blocked request in the wait queue.
/// Tokens sort by priority descending, then by arrival sequence ascending,
/// so the smallest token is the next one to be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitToken {
    priority: i32,
    sequence: u64,
}

impl WaitToken {
    pub fn new(priority: i32, sequence: u64) -> Self {
        WaitToken { priority, sequence }
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Ord for WaitToken {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for WaitToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// one-shot release signal of a blocked request
#[derive(Debug, Default)]
struct ReleaseSignal {
    released: Mutex<bool>,
    cond: Condvar,
}

impl ReleaseSignal {
    fn release(&self) {
        *self.released.lock() = true;
        self.cond.notify_one();
    }

    fn wait(&self, timeout: Option<Duration>) -> bool {
        let mut released = self.released.lock();
        match timeout {
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while !*released {
                    if self.cond.wait_until(&mut released, deadline).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while !*released {
                    self.cond.wait(&mut released);
                }
            }
        }
        *released
    }
}

#[derive(Debug)]
struct Waiter {
    request: RequestId,
    signal: Arc<ReleaseSignal>,
}

#[derive(Debug, Default)]
struct PriorityState {
    running: HashSet<RequestId>,
    queue: BTreeMap<WaitToken, Waiter>,
    next_sequence: u64,
}

/// Bounds the number of running requests to `max_running_requests`, the
/// requests in excess wait and are admitted by priority, then by arrival order.
pub struct PriorityThreadBlocker {
    max_running_requests: usize,
    priority_provider: Arc<dyn PriorityProvider>,
    state: Mutex<PriorityState>,
}

impl fmt::Debug for PriorityThreadBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityThreadBlocker")
            .field("max_running_requests", &self.max_running_requests)
            .field("state", &self.state)
            .finish()
    }
}

impl PriorityThreadBlocker {
    pub fn new(max_running_requests: usize, priority_provider: Arc<dyn PriorityProvider>) -> Self {
        PriorityThreadBlocker {
            max_running_requests,
            priority_provider,
            state: Mutex::new(PriorityState::default()),
        }
    }

    pub fn max_running_requests(&self) -> usize {
        self.max_running_requests
    }

    // Hands the free slots to the first waiters in line. The slot is taken on
    // behalf of the waiter before it wakes up, so no newcomer can steal it.
    fn release_waiters(&self, state: &mut PriorityState) {
        while state.running.len() < self.max_running_requests {
            match pop_first(&mut state.queue) {
                Some((token, waiter)) => {
                    logging::trace!(
                        "[PriorityThreadBlocker] Releasing request {}, priority {}",
                        waiter.request,
                        token.priority
                    );
                    state.running.insert(waiter.request);
                    waiter.signal.release();
                }
                None => break,
            }
        }
    }
}

fn pop_first(queue: &mut BTreeMap<WaitToken, Waiter>) -> Option<(WaitToken, Waiter)> {
    let token = *queue.keys().next()?;
    queue.remove(&token).map(|waiter| (token, waiter))
}

impl ThreadBlocker for PriorityThreadBlocker {
    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        let id = request.id();
        let mut state = self.state.lock();
        if state.running.len() < self.max_running_requests {
            state.running.insert(id);
            return true;
        }

        let token = WaitToken::new(
            self.priority_provider.priority(request),
            state.next_sequence,
        );
        state.next_sequence += 1;
        let signal = Arc::new(ReleaseSignal::default());
        state.queue.insert(
            token,
            Waiter {
                request: id,
                signal: Arc::clone(&signal),
            },
        );
        drop(state);

        if signal.wait(timeout) {
            return true;
        }

        let mut state = self.state.lock();
        if state.queue.remove(&token).is_some() {
            logging::debug!(
                "[PriorityThreadBlocker] Request {} timed out waiting for a slot, priority {}",
                id,
                token.priority
            );
            return false;
        }
        // A release popped the token between the timeout and the lock above,
        // the slot it reserved belongs to this request.
        logging::debug!(
            "[PriorityThreadBlocker] Request {} released right after timing out, admitting it",
            id
        );
        state.running.insert(id);
        self.release_waiters(&mut state);
        true
    }

    fn request_complete(&self, request: &Request) {
        let mut state = self.state.lock();
        if state.running.remove(&request.id()) {
            self.release_waiters(&mut state);
        }
    }

    fn running_requests_count(&self) -> usize {
        self.state.lock().running.len()
    }

    fn waiting_requests_count(&self) -> usize {
        self.state.lock().queue.len()
    }
}
