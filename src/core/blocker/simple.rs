use super::{ThreadBlocker, TimedBlockingQueue};
use crate::base::Request;
use std::time::Duration;

/// A bounded FIFO: at most `queue_size` requests run at once, the others are
/// admitted in the order they arrived.
#[derive(Debug)]
pub struct SimpleThreadBlocker {
    queue: TimedBlockingQueue,
}

impl SimpleThreadBlocker {
    pub fn new(queue_size: usize) -> Self {
        SimpleThreadBlocker {
            queue: TimedBlockingQueue::new(queue_size),
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queue.capacity()
    }
}

impl ThreadBlocker for SimpleThreadBlocker {
    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        self.queue.put(request.id(), timeout)
    }

    fn request_complete(&self, request: &Request) {
        self.queue.remove(request.id());
    }

    fn running_requests_count(&self) -> usize {
        self.queue.len()
    }

    fn waiting_requests_count(&self) -> usize {
        self.queue.waiting_count()
    }
}
