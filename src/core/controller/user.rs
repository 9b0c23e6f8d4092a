use super::{queue_priority, FlowController, QueueController};
use crate::base::{Request, DEFAULT_COOKIE_NAME};
use crate::config::{DEFAULT_USER_MAX_AGE_MS, DEFAULT_USER_MAX_QUEUES};
use crate::{logging, utils};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Identifies users by a cookie, issuing a new random identity to the clients
/// which do not carry one yet.
#[derive(Debug, Clone)]
pub struct CookieKeyGenerator {
    cookie_name: String,
}

impl Default for CookieKeyGenerator {
    fn default() -> Self {
        CookieKeyGenerator::new(DEFAULT_COOKIE_NAME)
    }
}

impl CookieKeyGenerator {
    pub fn new<S: Into<String>>(cookie_name: S) -> Self {
        CookieKeyGenerator {
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn user_key(&self, request: &Request) -> String {
        match request.cookie(&self.cookie_name) {
            Some(key) if !utils::is_blank(&key) => key,
            _ => {
                let key = Uuid::new_v4().to_string();
                request.add_response_cookie(format!("{}={}; Path=/", self.cookie_name, key));
                key
            }
        }
    }
}

/// One bounded queue per user. Clients ignoring cookies get a fresh identity, and
/// thus a fresh queue, on every request: empty queues untouched for longer than
/// `max_age` are evicted, more eagerly once there are more than `max_queues` of them.
#[derive(Debug)]
pub struct UserConcurrentFlowController {
    queues: QueueController,
    key_generator: CookieKeyGenerator,
    max_queues: usize,
    max_age: Duration,
    last_cleanup: Mutex<Instant>,
}

impl UserConcurrentFlowController {
    pub fn new(queue_size: usize) -> Self {
        Self::with_limits(
            queue_size,
            DEFAULT_USER_MAX_QUEUES,
            Duration::from_millis(DEFAULT_USER_MAX_AGE_MS),
        )
    }

    pub fn with_limits(queue_size: usize, max_queues: usize, max_age: Duration) -> Self {
        UserConcurrentFlowController {
            queues: QueueController::new(queue_size),
            key_generator: CookieKeyGenerator::default(),
            max_queues,
            max_age,
            last_cleanup: Mutex::new(Instant::now()),
        }
    }

    pub fn with_key_generator(mut self, key_generator: CookieKeyGenerator) -> Self {
        self.key_generator = key_generator;
        self
    }

    pub fn queues(&self) -> &QueueController {
        &self.queues
    }

    pub fn max_queues(&self) -> usize {
        self.max_queues
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn cleanup_if_needed(&self) {
        // another thread is already on it
        let mut last_cleanup = match self.last_cleanup.try_lock() {
            Some(last_cleanup) => last_cleanup,
            None => return,
        };
        let since = last_cleanup.elapsed();
        let crowded = self.queues.queues_count() > self.max_queues && since > self.max_age / 10;
        if crowded || since > self.max_age {
            let removed = self.queues.cleanup(self.max_age);
            *last_cleanup = Instant::now();
            logging::debug!(
                "[UserConcurrentFlowController] Evicted {} stale queues, {} left",
                removed,
                self.queues.queues_count()
            );
        }
    }
}

impl FlowController for UserConcurrentFlowController {
    fn name(&self) -> String {
        format!("UserConcurrentFlowController({})", self.queues.queue_size())
    }

    fn priority(&self) -> i32 {
        queue_priority(self.queues.queue_size())
    }

    fn request_incoming(&self, request: &Request, timeout: Option<Duration>) -> bool {
        self.cleanup_if_needed();
        let key = self.key_generator.user_key(request);
        self.queues.request_incoming(&key, request, timeout)
    }

    fn request_complete(&self, request: &Request) {
        self.queues.request_complete(request);
    }

    fn running_requests_count(&self) -> usize {
        self.queues.running_requests_count()
    }
}
