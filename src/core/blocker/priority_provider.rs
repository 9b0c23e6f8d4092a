use crate::base::Request;
use crate::logging;

/// Assigns an admission priority to a request, higher values are served first.
pub trait PriorityProvider: Send + Sync {
    fn priority(&self, request: &Request) -> i32;
}

/// Reads the priority from an HTTP header, falling back to a default
/// when the header is missing or is not an integer.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpHeaderPriorityProvider {
    header_name: String,
    default_priority: i32,
}

impl HttpHeaderPriorityProvider {
    pub fn new<S: Into<String>>(header_name: S, default_priority: i32) -> Self {
        HttpHeaderPriorityProvider {
            header_name: header_name.into(),
            default_priority,
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn default_priority(&self) -> i32 {
        self.default_priority
    }
}

impl PriorityProvider for HttpHeaderPriorityProvider {
    fn priority(&self, request: &Request) -> i32 {
        match request.header(&self.header_name) {
            Some(value) => value.trim().parse::<i32>().unwrap_or_else(|_| {
                logging::debug!(
                    "[HttpHeaderPriorityProvider] Invalid priority {:?} in header {}, using default {}",
                    value,
                    self.header_name,
                    self.default_priority
                );
                self.default_priority
            }),
            None => self.default_priority,
        }
    }
}
