//! Admission primitives: a `ThreadBlocker` admits a request into a bounded
//! set of running requests, or parks the calling thread until it can.

mod priority;
mod priority_provider;
mod simple;
pub mod timed_queue;

pub use priority::*;
pub use priority_provider::*;
pub use simple::*;
pub use timed_queue::TimedBlockingQueue;

use crate::base::Request;
use std::fmt;
use std::time::Duration;

pub trait ThreadBlocker: Send + Sync + fmt::Debug {
    /// Admits `request`, blocking the calling thread while the running set is full.
    /// `None` waits forever. Returns `false` if no slot freed up in time.
    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool;
    /// Releases the slot held by `request`, if any.
    /// Safe to call for requests that were never admitted.
    fn request_complete(&self, request: &Request);
    fn running_requests_count(&self) -> usize;
    fn waiting_requests_count(&self) -> usize;
}
