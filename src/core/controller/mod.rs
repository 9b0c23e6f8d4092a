//! Flow controllers decide whether, and when, a request gets to run.
//! A `ControllerChain` consults them in order of `priority()`.

mod chain;
mod global;
mod ip;
mod ows;
pub mod queue;
mod user;

pub use chain::*;
pub use global::*;
pub use ip::*;
pub use ows::*;
pub use queue::QueueController;
pub use user::*;

use crate::base::Request;
use std::fmt;
use std::time::Duration;

pub trait FlowController: Send + Sync + fmt::Debug {
    /// Used in log and reject messages.
    fn name(&self) -> String;
    /// Controllers with lower values are consulted first.
    fn priority(&self) -> i32;
    /// Blocks until the request can run, or the timeout (`None` waits forever) expires.
    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool;
    /// Called once for every request the controller could have been asked about,
    /// whatever `request_incoming` returned, or even if it was never called.
    fn request_complete(&self, request: &Request);
    fn running_requests_count(&self) -> usize;
}

// queue controllers sort by their queue size, the most restrictive ones go first
pub(crate) fn queue_priority(queue_size: usize) -> i32 {
    queue_size.min(i32::MAX as usize) as i32
}
