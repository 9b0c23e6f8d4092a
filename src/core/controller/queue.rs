use crate::base::{Request, RequestId};
use crate::blocker::TimedBlockingQueue;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Bounded FIFO queues keyed by a client identity (address, cookie...),
/// each key getting `queue_size` slots of its own.
#[derive(Debug)]
pub struct QueueController {
    queue_size: usize,
    queues: DashMap<String, Arc<TimedBlockingQueue>>,
    // the queue each admitted request sits in, until it completes
    admitted: DashMap<RequestId, Arc<TimedBlockingQueue>>,
}

impl QueueController {
    pub fn new(queue_size: usize) -> Self {
        QueueController {
            queue_size,
            queues: DashMap::new(),
            admitted: DashMap::new(),
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    fn queue_for(&self, key: &str) -> Arc<TimedBlockingQueue> {
        if let Some(queue) = self.queues.get(key) {
            // touched under the shard lock, `cleanup` cannot drop it in between
            queue.touch();
            return Arc::clone(queue.value());
        }
        let queue_size = self.queue_size;
        let queue = self
            .queues
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(TimedBlockingQueue::new(queue_size)));
        Arc::clone(queue.value())
    }

    pub fn request_incoming(&self, key: &str, request: &Request, timeout: Option<Duration>) -> bool {
        let queue = self.queue_for(key);
        if queue.put(request.id(), timeout) {
            self.admitted.insert(request.id(), queue);
            true
        } else {
            false
        }
    }

    pub fn request_complete(&self, request: &Request) {
        if let Some((id, queue)) = self.admitted.remove(&request.id()) {
            queue.remove(id);
        }
    }

    /// Drops the queues that are empty and untouched for more than `max_age`,
    /// returns how many were dropped.
    pub fn cleanup(&self, max_age: Duration) -> usize {
        let before = self.queues.len();
        self.queues.retain(|_, queue| !queue.is_stale(max_age));
        before.saturating_sub(self.queues.len())
    }

    pub fn queues_count(&self) -> usize {
        self.queues.len()
    }

    pub fn contains_queue(&self, key: &str) -> bool {
        self.queues.contains_key(key)
    }

    /// Running requests of the queue for `key`, if it exists.
    pub fn queue_len(&self, key: &str) -> Option<usize> {
        self.queues.get(key).map(|queue| queue.len())
    }

    pub fn running_requests_count(&self) -> usize {
        self.admitted.len()
    }
}
