//! This crate provides the [controlflow](../controlflow) admission middleware for [Tower](https://docs.rs/tower).
//!
//! Every request goes through `ControlFlow::admit` on the blocking thread pool before
//! reaching the inner service. Rejected requests are answered right away with
//! `403 Forbidden` (blacklisted address) or `503 Service Unavailable` (timeout).
//! Admitted requests hold their slots until the inner service produced a response.

use controlflow::api::ControlFlow;
use controlflow::base::{Request, RequestBuilder, DELAY_HEADER, SET_COOKIE};
use controlflow::logging;
use http::header::HeaderValue;
use percent_encoding::percent_decode_str;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds the request seen by the flow controllers out of the HTTP request.
pub type Extractor<B> = fn(&http::Request<B>) -> Request;

/// Reads the peer address from the `SocketAddr` request extension, and the OWS
/// coordinates from the `service`, `request` and `outputFormat` query parameters
/// (parameter names are case insensitive).
pub fn default_extractor<B>(req: &http::Request<B>) -> Request {
    let remote_addr = req
        .extensions()
        .get::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default();
    let mut builder = RequestBuilder::new(remote_addr).with_headers(req.headers().clone());
    for (key, value) in query_pairs(req.uri().query().unwrap_or_default()) {
        if key.eq_ignore_ascii_case("service") {
            builder = builder.with_service(value);
        } else if key.eq_ignore_ascii_case("request") {
            builder = builder.with_operation(value);
        } else if key.eq_ignore_ascii_case("outputformat") {
            builder = builder.with_output_format(value);
        }
    }
    builder.build()
}

fn query_pairs(query: &str) -> impl Iterator<Item = (String, String)> + '_ {
    query.split('&').filter(|pair| !pair.is_empty()).map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode(key), decode(value))
    })
}

fn decode(component: &str) -> String {
    let component = component.replace('+', " ");
    percent_decode_str(&component).decode_utf8_lossy().into_owned()
}

/// The control flow middleware service in tower.
pub struct ControlFlowService<S, B> {
    pub(crate) inner: S,
    pub(crate) control_flow: Arc<ControlFlow>,
    pub(crate) extractor: Extractor<B>,
}

// rustc cannot derive `Clone` trait for function pointers correctly,
// implement it by hands
impl<S, B> Clone for ControlFlowService<S, B>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            control_flow: Arc::clone(&self.control_flow),
            extractor: self.extractor,
        }
    }
}

impl<S, B> ControlFlowService<S, B> {
    pub fn new(inner: S, control_flow: Arc<ControlFlow>) -> Self {
        Self {
            inner,
            control_flow,
            extractor: default_extractor::<B>,
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor<B>) -> Self {
        self.extractor = extractor;
        self
    }
}

fn status_response<T: Default>(status: http::StatusCode) -> http::Response<T> {
    let mut response = http::Response::new(T::default());
    *response.status_mut() = status;
    response
}

impl<S, B, ResBody> Service<http::Request<B>> for ControlFlowService<S, B>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    <S as Service<http::Request<B>>>::Future: Send,
    <S as Service<http::Request<B>>>::Error: Into<BoxError>,
    B: Send + 'static,
    ResBody: Default + Send + 'static,
{
    type Response = http::Response<ResBody>;
    type Error = BoxError;
    #[allow(clippy::type_complexity)]
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let request = Arc::new((self.extractor)(&req));
        let control_flow = Arc::clone(&self.control_flow);
        // the service polled ready is the one to call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            // admission parks the thread, keep it off the async workers
            let admitted = {
                let request = Arc::clone(&request);
                tokio::task::spawn_blocking(move || control_flow.admit(request)).await?
            };
            let admission = match admitted {
                Ok(admission) => admission,
                Err(reject) => {
                    logging::debug!("[ControlFlowService] {}", reject);
                    return Ok(status_response(reject.status_code()));
                }
            };
            // an error drops the admission, which releases the slots as well
            let mut response = inner.call(req).await.map_err(Into::into)?;
            let headers = response.headers_mut();
            for cookie in request.take_response_cookies() {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        headers.append(SET_COOKIE, value);
                    }
                    Err(_) => logging::warn!("[ControlFlowService] Invalid cookie {:?}", cookie),
                }
            }
            headers.insert(
                DELAY_HEADER,
                HeaderValue::from(admission.delay().as_millis() as u64),
            );
            admission.exit();
            Ok(response)
        })
    }
}

/// The [`tower::Layer`](https://docs.rs/tower/latest/tower/trait.Layer.html) wrapper for [`ControlFlowService`].
pub struct ControlFlowLayer<B> {
    pub(crate) control_flow: Arc<ControlFlow>,
    pub(crate) extractor: Extractor<B>,
}

// seems rustc cannot derive `Clone` trait for us,
// implement it by hands
impl<B> Clone for ControlFlowLayer<B> {
    fn clone(&self) -> Self {
        Self {
            control_flow: Arc::clone(&self.control_flow),
            extractor: self.extractor,
        }
    }
}

impl<B> ControlFlowLayer<B> {
    pub fn new(control_flow: Arc<ControlFlow>) -> Self {
        Self {
            control_flow,
            extractor: default_extractor::<B>,
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor<B>) -> Self {
        self.extractor = extractor;
        self
    }
}

impl<S, B> Layer<S> for ControlFlowLayer<B> {
    type Service = ControlFlowService<S, B>;

    fn layer(&self, service: S) -> Self::Service {
        ControlFlowService::new(service, Arc::clone(&self.control_flow)).with_extractor(self.extractor)
    }
}
