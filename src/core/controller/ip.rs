use super::{queue_priority, FlowController, QueueController};
use crate::base::{Request, X_FORWARDED_FOR};
use crate::blocker::{SimpleThreadBlocker, ThreadBlocker};
use std::time::Duration;

/// Client address of the request: the first `X-Forwarded-For` entry when a
/// proxy set one, the peer address otherwise, `""` when neither is known.
pub fn remote_address(request: &Request) -> String {
    let forwarded = request
        .header(X_FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());
    match forwarded {
        Some(first) => first.to_string(),
        None => request.remote_addr().trim().to_string(),
    }
}

/// One bounded queue per client address.
#[derive(Debug)]
pub struct IpFlowController {
    queues: QueueController,
}

impl IpFlowController {
    pub fn new(queue_size: usize) -> Self {
        IpFlowController {
            queues: QueueController::new(queue_size),
        }
    }

    pub fn queues(&self) -> &QueueController {
        &self.queues
    }
}

impl FlowController for IpFlowController {
    fn name(&self) -> String {
        format!("IpFlowController({})", self.queues.queue_size())
    }

    fn priority(&self) -> i32 {
        queue_priority(self.queues.queue_size())
    }

    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        self.queues
            .request_incoming(&remote_address(request), request, timeout)
    }

    fn request_complete(&self, request: &Request) {
        self.queues.request_complete(request);
    }

    fn running_requests_count(&self) -> usize {
        self.queues.running_requests_count()
    }
}

/// A bounded queue for the requests coming from one given address,
/// the other requests are not concerned.
#[derive(Debug)]
pub struct SingleIpFlowController {
    ip: String,
    blocker: SimpleThreadBlocker,
}

impl SingleIpFlowController {
    pub fn new<S: Into<String>>(ip: S, queue_size: usize) -> Self {
        SingleIpFlowController {
            ip: ip.into(),
            blocker: SimpleThreadBlocker::new(queue_size),
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    fn applies_to(&self, request: &Request) -> bool {
        remote_address(request) == self.ip
    }
}

impl FlowController for SingleIpFlowController {
    fn name(&self) -> String {
        format!("SingleIpFlowController({}, {})", self.ip, self.blocker.queue_size())
    }

    fn priority(&self) -> i32 {
        queue_priority(self.blocker.queue_size())
    }

    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        if self.applies_to(request) {
            self.blocker.request_incoming(request, timeout)
        } else {
            true
        }
    }

    fn request_complete(&self, request: &Request) {
        self.blocker.request_complete(request);
    }

    fn running_requests_count(&self) -> usize {
        self.blocker.running_requests_count()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::RequestBuilder;
    use crate::utils::sleep_for_ms;
    use std::sync::Arc;

    #[test]
    fn address_resolution() {
        let request = RequestBuilder::new("10.0.0.1").build();
        assert_eq!(remote_address(&request), "10.0.0.1");
        let request = RequestBuilder::new("10.0.0.1")
            .with_header("X-Forwarded-For", " 192.168.1.5 , 10.0.0.1")
            .build();
        assert_eq!(remote_address(&request), "192.168.1.5");
        let request = RequestBuilder::new("10.0.0.1")
            .with_header("X-Forwarded-For", " ")
            .build();
        assert_eq!(remote_address(&request), "10.0.0.1");
        assert_eq!(remote_address(&RequestBuilder::new("").build()), "");
    }

    #[test]
    fn per_ip_isolation() {
        let controller = Arc::new(IpFlowController::new(1));
        let a1 = RequestBuilder::new("10.0.0.1").build();
        let b1 = RequestBuilder::new("10.0.0.2").build();
        assert!(controller.request_incoming(&a1, Some(Duration::from_millis(50))));
        assert!(controller.request_incoming(&b1, Some(Duration::from_millis(50))));
        assert_eq!(controller.running_requests_count(), 2);

        let a2 = RequestBuilder::new("10.0.0.1").build();
        assert!(!controller.request_incoming(&a2, Some(Duration::from_millis(50))));
        controller.request_complete(&a2);

        let waiter = {
            let controller = Arc::clone(&controller);
            std::thread::spawn(move || {
                let a3 = RequestBuilder::new("10.0.0.1").build();
                controller.request_incoming(&a3, Some(Duration::from_secs(5)))
            })
        };
        sleep_for_ms(20);
        controller.request_complete(&a1);
        assert!(waiter.join().unwrap());
        // the other address kept its slot all along
        assert_eq!(controller.queues().queue_len("10.0.0.2"), Some(1));
    }

    #[test]
    fn forwarded_clients_are_distinct() {
        let controller = IpFlowController::new(1);
        let r1 = RequestBuilder::new("10.0.0.100")
            .with_header("X-Forwarded-For", "1.1.1.1")
            .build();
        let r2 = RequestBuilder::new("10.0.0.100")
            .with_header("X-Forwarded-For", "2.2.2.2")
            .build();
        assert!(controller.request_incoming(&r1, Some(Duration::from_millis(10))));
        assert!(controller.request_incoming(&r2, Some(Duration::from_millis(10))));
    }

    #[test]
    fn single_ip_only() {
        let controller = SingleIpFlowController::new("10.0.0.1", 1);
        let other1 = RequestBuilder::new("10.0.0.2").build();
        let other2 = RequestBuilder::new("10.0.0.2").build();
        assert!(controller.request_incoming(&other1, Some(Duration::from_millis(10))));
        assert!(controller.request_incoming(&other2, Some(Duration::from_millis(10))));
        assert_eq!(controller.running_requests_count(), 0);

        let r1 = RequestBuilder::new("10.0.0.1").build();
        let r2 = RequestBuilder::new("10.0.0.1").build();
        assert!(controller.request_incoming(&r1, Some(Duration::from_millis(10))));
        assert!(!controller.request_incoming(&r2, Some(Duration::from_millis(10))));
        controller.request_complete(&other1);
        controller.request_complete(&r2);
        assert_eq!(controller.running_requests_count(), 1);
        controller.request_complete(&r1);
        assert_eq!(controller.running_requests_count(), 0);
    }
}
