use super::FlowController;
use crate::base::{RejectError, RejectType, Request};
use crate::{logging, utils};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TIMEOUT_MSG: &str =
    "Requested timeout out while waiting to be executed, please lower your request rate";

/// ControllerChain holds the flow controllers, sorted by ascending `priority()`,
/// and the time budget a request has to get through all of them.
#[derive(Debug, Default)]
pub struct ControllerChain {
    controllers: Vec<Arc<dyn FlowController>>,
    // `None` waits forever
    timeout: Option<Duration>,
    blocked_requests: AtomicUsize,
    running_requests: AtomicUsize,
}

impl ControllerChain {
    pub fn new(timeout: Option<Duration>) -> Self {
        ControllerChain {
            timeout,
            ..Default::default()
        }
    }

    /// add_controller is non-thread safe, the chain is built before it is shared.
    pub fn add_controller(&mut self, controller: Arc<dyn FlowController>) {
        self.controllers.push(controller);
        // stable, controllers with the same priority keep their insertion order
        self.controllers.sort_by_key(|c| c.priority());
    }

    pub fn controllers(&self) -> &[Arc<dyn FlowController>] {
        &self.controllers
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Requests currently waiting in one of the controllers.
    pub fn blocked_requests(&self) -> usize {
        self.blocked_requests.load(Ordering::SeqCst)
    }

    /// Requests admitted and not exited yet.
    pub fn running_requests(&self) -> usize {
        self.running_requests.load(Ordering::SeqCst)
    }

    /// The entrance of the chain. Every controller is asked in turn, with what
    /// is left of the time budget. On rejection, all the controllers have
    /// already been told the request is complete.
    pub fn entry(self: &Arc<Self>, request: Arc<Request>) -> Result<Admission, RejectError> {
        let start = Instant::now();
        self.blocked_requests.fetch_add(1, Ordering::SeqCst);
        let result = self.acquire(&request, start);
        self.blocked_requests.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.running_requests.fetch_add(1, Ordering::SeqCst);
                let delay = start.elapsed();
                logging::trace!(
                    "[ControllerChain] Request {} admitted after {:?}",
                    request.id(),
                    delay
                );
                Ok(Admission {
                    chain: Arc::clone(self),
                    request,
                    delay,
                    exited: false,
                })
            }
            Err(err) => {
                self.release(&request);
                Err(err)
            }
        }
    }

    fn acquire(&self, request: &Request, start: Instant) -> Result<(), RejectError> {
        for controller in &self.controllers {
            let timeout = match self.timeout {
                Some(budget) => match utils::remaining(start, budget) {
                    Some(left) => Some(left),
                    None => return Err(self.reject(request, controller.as_ref())),
                },
                None => None,
            };
            if !controller.request_incoming(request, timeout) {
                return Err(self.reject(request, controller.as_ref()));
            }
        }
        Ok(())
    }

    fn reject(&self, request: &Request, controller: &dyn FlowController) -> RejectError {
        let name = controller.name();
        logging::debug!(
            "[ControllerChain] Request {} timed out in {}, timeout {:?}",
            request.id(),
            name,
            self.timeout
        );
        RejectError::new_with_cause(RejectType::Timeout, TIMEOUT_MSG.into(), name)
    }

    // every controller is told, whether it admitted the request or not
    fn release(&self, request: &Request) {
        for controller in &self.controllers {
            controller.request_complete(request);
        }
    }
}

/// A request that made it through the chain. Exiting, explicitly or by dropping
/// it, releases every slot the request holds.
#[derive(Debug)]
pub struct Admission {
    chain: Arc<ControllerChain>,
    request: Arc<Request>,
    delay: Duration,
    exited: bool,
}

impl Admission {
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Time spent waiting for admission.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn exit(mut self) {
        self.complete();
    }

    fn complete(&mut self) {
        if self.exited {
            return;
        }
        self.exited = true;
        self.chain.release(&self.request);
        self.chain.running_requests.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.complete();
    }
}
