//! Per-request routing context.
//!
//! # Responsibilities
//! - Expose the request, path parameters and per-request data to handlers
//! - Hold the response under construction
//! - Carry the active failure while failure-handlers and error-handlers run
//! - Record the control signal (`next` / `fail`) a handler raises
//!
//! # Design Decisions
//! - Handlers never move the cursor themselves; they leave a signal that the
//!   dispatcher reads after the handler returns
//! - The first `fail` within one handler invocation wins

use axum::body::Bytes;
use axum::http::{Extensions, HeaderMap, Method, Request, StatusCode, Uri};

use crate::dispatch::failure::Failure;
use crate::dispatch::response::ResponseWriter;
use crate::http::X_REQUEST_ID;
use crate::routing::BoxError;

/// What a handler asked for before returning.
#[derive(Debug)]
pub(crate) enum Signal {
    Next,
    Fail(Failure),
}

/// Everything a handler can see and change while a request is dispatched.
#[derive(Debug)]
pub struct RoutingContext {
    request: Request<Bytes>,
    params: Vec<(String, String)>,
    response: ResponseWriter,
    failure: Option<Failure>,
    signal: Option<Signal>,
    data: Extensions,
}

impl RoutingContext {
    pub(crate) fn new(request: Request<Bytes>) -> Self {
        Self {
            request,
            params: Vec::new(),
            response: ResponseWriter::default(),
            failure: None,
            signal: None,
            data: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Full request path, before any sub-router prefix is stripped.
    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// Request ID assigned by the HTTP layer, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
    }

    /// Path parameter bound by the route currently executing.
    ///
    /// Parameters bound by a mount route are visible to the sub-router's
    /// routes. On duplicate names the innermost binding wins.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn response(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    /// Per-request data shared between handlers.
    pub fn data(&self) -> &Extensions {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Extensions {
        &mut self.data
    }

    /// Continue with the next handler (or failure-handler while failing).
    pub fn next(&mut self) {
        if self.signal.is_none() {
            self.signal = Some(Signal::Next);
        }
    }

    /// Fail the request with `status` and no error.
    pub fn fail(&mut self, status: StatusCode) {
        self.raise(Failure::status(status));
    }

    /// Fail the request with `status`, carrying `error` to failure-handlers.
    pub fn fail_with(&mut self, status: StatusCode, error: impl Into<BoxError>) {
        self.raise(Failure::with_error(status, error));
    }

    fn raise(&mut self, failure: Failure) {
        match &self.signal {
            Some(Signal::Fail(first)) => {
                tracing::debug!(first = %first, ignored = %failure, "Request already failed");
            }
            _ => self.signal = Some(Signal::Fail(failure)),
        }
    }

    /// The failure being handled, if the request is failing.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Status code of the active failure.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.failure.as_ref().map(Failure::status_code)
    }

    /// Message of the active failure's error.
    pub fn failure_message(&self) -> Option<String> {
        self.failure.as_ref().and_then(Failure::message)
    }

    pub(crate) fn enter_route(&mut self, params: &[(String, String)]) {
        self.params.clear();
        self.params.extend_from_slice(params);
    }

    pub(crate) fn set_failure(&mut self, failure: Failure) {
        self.failure = Some(failure);
    }

    pub(crate) fn take_signal(&mut self) -> Option<Signal> {
        self.signal.take()
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.response.is_ended()
    }

    pub(crate) fn response_ref(&self) -> &ResponseWriter {
        &self.response
    }

    pub(crate) fn into_response_writer(self) -> ResponseWriter {
        self.response
    }
}
