use super::{queue_priority, FlowController};
use crate::base::Request;
use crate::blocker::ThreadBlocker;
use std::time::Duration;

/// Bounds the number of requests running in the whole service.
#[derive(Debug)]
pub struct GlobalFlowController {
    queue_size: usize,
    blocker: Box<dyn ThreadBlocker>,
}

impl GlobalFlowController {
    pub fn new(queue_size: usize, blocker: Box<dyn ThreadBlocker>) -> Self {
        GlobalFlowController { queue_size, blocker }
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }
}

impl FlowController for GlobalFlowController {
    fn name(&self) -> String {
        format!("GlobalFlowController({})", self.queue_size)
    }

    fn priority(&self) -> i32 {
        queue_priority(self.queue_size)
    }

    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        self.blocker.request_incoming(request, timeout)
    }

    fn request_complete(&self, request: &Request) {
        self.blocker.request_complete(request);
    }

    fn running_requests_count(&self) -> usize {
        self.blocker.running_requests_count()
    }
}
