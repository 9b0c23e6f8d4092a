use super::{queue_priority, FlowController};
use crate::base::Request;
use crate::blocker::ThreadBlocker;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Selects requests by service, operation and output format.
/// Matching ignores case and an unset part matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwsRequestMatcher {
    pub service: Option<String>,
    pub operation: Option<String>,
    pub output_format: Option<String>,
}

impl OwsRequestMatcher {
    pub fn new(
        service: Option<String>,
        operation: Option<String>,
        output_format: Option<String>,
    ) -> Self {
        OwsRequestMatcher {
            service,
            operation,
            output_format,
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        matches_part(&self.service, request.service())
            && matches_part(&self.operation, request.operation())
            && matches_part(&self.output_format, request.output_format())
    }
}

fn matches_part(expected: &Option<String>, actual: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => actual.map_or(false, |actual| actual.eq_ignore_ascii_case(expected)),
    }
}

impl fmt::Display for OwsRequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = vec![
            self.service.as_deref(),
            self.operation.as_deref(),
            self.output_format.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            write!(f, "*")
        } else {
            write!(f, "{}", parts.join("."))
        }
    }
}

/// Bounds the number of running requests selected by an `OwsRequestMatcher`.
#[derive(Debug)]
pub struct OwsFlowController {
    matcher: OwsRequestMatcher,
    queue_size: usize,
    blocker: Box<dyn ThreadBlocker>,
}

impl OwsFlowController {
    pub fn new(matcher: OwsRequestMatcher, queue_size: usize, blocker: Box<dyn ThreadBlocker>) -> Self {
        OwsFlowController {
            matcher,
            queue_size,
            blocker,
        }
    }

    pub fn matcher(&self) -> &OwsRequestMatcher {
        &self.matcher
    }
}

impl FlowController for OwsFlowController {
    fn name(&self) -> String {
        format!("OwsFlowController({}, {})", self.matcher, self.queue_size)
    }

    fn priority(&self) -> i32 {
        queue_priority(self.queue_size)
    }

    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        if self.matcher.matches(request) {
            self.blocker.request_incoming(request, timeout)
        } else {
            true
        }
    }

    fn request_complete(&self, request: &Request) {
        if self.matcher.matches(request) {
            self.blocker.request_complete(request);
        }
    }

    fn running_requests_count(&self) -> usize {
        self.blocker.running_requests_count()
    }
}
