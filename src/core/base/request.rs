use super::constant::*;
use crate::logging;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a request, used for slot membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn next() -> Self {
        RequestId(NEXT_REQUEST_ID.fetch_add(1, Ordering::SeqCst))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One in-flight service call, as seen by the flow controllers.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    remote_addr: String,
    headers: HeaderMap,
    service: Option<String>,
    operation: Option<String>,
    output_format: Option<String>,
    // `Set-Cookie` values to be sent back with the response
    response_cookies: Mutex<Vec<String>>,
}

impl Request {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the header, if it is present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn service(&self) -> Option<&str> {
        self.service.as_deref()
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn output_format(&self) -> Option<&str> {
        self.output_format.as_deref()
    }

    /// Looks a cookie up in every `Cookie` header of the request.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim().to_string())
    }

    pub fn add_response_cookie(&self, cookie: String) {
        self.response_cookies.lock().push(cookie);
    }

    pub fn response_cookies(&self) -> Vec<String> {
        self.response_cookies.lock().clone()
    }

    pub fn take_response_cookies(&self) -> Vec<String> {
        std::mem::take(&mut *self.response_cookies.lock())
    }
}

pub struct RequestBuilder {
    remote_addr: String,
    headers: HeaderMap,
    service: Option<String>,
    operation: Option<String>,
    output_format: Option<String>,
}

impl RequestBuilder {
    pub fn new<S: Into<String>>(remote_addr: S) -> Self {
        RequestBuilder {
            remote_addr: remote_addr.into(),
            headers: HeaderMap::new(),
            service: None,
            operation: None,
            output_format: None,
        }
    }

    /// `build()` would consume RequestBuilder
    pub fn build(self) -> Request {
        Request {
            id: RequestId::next(),
            remote_addr: self.remote_addr,
            headers: self.headers,
            service: self.service,
            operation: self.operation,
            output_format: self.output_format,
            response_cookies: Mutex::new(Vec::new()),
        }
    }

    pub fn with_remote_addr<S: Into<String>>(mut self, remote_addr: S) -> Self {
        self.remote_addr = remote_addr.into();
        self
    }

    /// Appends a header, invalid names or values are dropped with a warning.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => logging::warn!(
                "[RequestBuilder] Ignoring invalid header, name {:?}, value {:?}",
                name,
                value
            ),
        }
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_service<S: Into<String>>(mut self, service: S) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_operation<S: Into<String>>(mut self, operation: S) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_output_format<S: Into<String>>(mut self, output_format: S) -> Self {
        self.output_format = Some(output_format.into());
        self
    }
}
