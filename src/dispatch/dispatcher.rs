//! Request dispatcher: matching, handler chains and failure propagation.
//!
//! # Responsibilities
//! - Match a request against a frozen router tree
//! - Run handlers in order, advancing only on `next()`
//! - On a fault, search failure-handlers from the failing route onward
//! - Fall back to the top-level error-handler, then to a default response
//! - Log and count every outcome, including abandoned requests
//!
//! # Design Decisions
//! - A panic in any handler is caught and treated as an uncaught error
//! - A handler that returns without a signal stalls the chain; the dispatcher
//!   fails the request instead of leaving the client hanging
//! - A fault in a failure-handler keeps the original failure and skips
//!   straight to the error-handler

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::http::{Request, Response, StatusCode};
use futures_util::FutureExt;

use crate::dispatch::context::{RoutingContext, Signal};
use crate::dispatch::failure::{DispatchError, Failure, FaultKind};
use crate::observability::metrics;
use crate::routing::{Handler, MatchedRoute, Matches, Route, Router};

/// Body of the default response for unrecovered failures.
pub const INTERNAL_SERVER_ERROR_BODY: &str = "Internal Server Error";

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A handler ended the response.
    Handled,
    /// A failure-handler ended the response.
    Recovered,
    /// The top-level error-handler ended the response.
    ErrorHandled,
    /// The default failure response was sent.
    DefaultError,
    /// No route matched, or the chain ran out.
    NotFound,
    /// A path matched but no route accepted the method.
    MethodNotAllowed,
    /// The request was dropped before a response was produced.
    Abandoned,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::Recovered => "recovered",
            Outcome::ErrorHandled => "error_handled",
            Outcome::DefaultError => "default_error",
            Outcome::NotFound => "not_found",
            Outcome::MethodNotAllowed => "method_not_allowed",
            Outcome::Abandoned => "abandoned",
        }
    }
}

/// Result of invoking one handler.
enum Step {
    Ended,
    Next,
    Fault { kind: FaultKind, failure: Failure },
}

/// Runs the routing protocol for each request against one frozen router.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Dispatch one request and produce its response.
    ///
    /// Dropping the returned future abandons the request: no further handler
    /// or error-handler runs.
    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<Body> {
        let started = Instant::now();
        let mut ctx = RoutingContext::new(request);
        let mut guard = AbandonGuard::new(&ctx, started);

        let outcome = self.run(&mut ctx).await;
        guard.complete();

        let status = ctx.response_ref().status();
        tracing::debug!(
            request_id = ctx.request_id().unwrap_or("-"),
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            outcome = outcome.as_str(),
            "Request dispatched"
        );
        metrics::record_dispatch(outcome, status, started);

        ctx.into_response_writer().into_response()
    }

    /// Dispatch until `closed` resolves. Returns `None` if the request was
    /// abandoned first; error-handlers are not invoked for it.
    pub async fn dispatch_until<C>(&self, request: Request<Bytes>, closed: C) -> Option<Response<Body>>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            () = closed => None,
            response = self.dispatch(request) => Some(response),
        }
    }

    async fn run(&self, ctx: &mut RoutingContext) -> Outcome {
        let method = ctx.method().clone();
        let path = ctx.path().to_string();

        let matched = match self.router.matches(&method, &path) {
            Matches::Found(matched) => matched,
            Matches::MethodMismatch => return self.unmatched(ctx, StatusCode::METHOD_NOT_ALLOWED).await,
            Matches::NoMatch => return self.unmatched(ctx, StatusCode::NOT_FOUND).await,
        };

        let mut route = 0;
        let mut index = 0;
        loop {
            let Some(handler) = seek(&matched, &mut route, &mut index, |r| &r.handlers) else {
                tracing::debug!(path = %path, "Handler chain exhausted without a response");
                return self.unmatched(ctx, StatusCode::NOT_FOUND).await;
            };

            ctx.enter_route(&matched[route].params);
            match invoke(handler, ctx, FaultKind::HandlerFault).await {
                Step::Ended => return Outcome::Handled,
                Step::Next => index += 1,
                Step::Fault { kind, failure } => {
                    tracing::debug!(
                        request_id = ctx.request_id().unwrap_or("-"),
                        route = %matched[route].route.pattern(),
                        kind = %kind,
                        failure = %failure,
                        "Handler failed"
                    );
                    metrics::record_fault(kind);
                    return self.fail(ctx, &matched, route, failure).await;
                }
            }
        }
    }

    /// FAILING: walk failure-handlers from `route` onward, then fall back.
    async fn fail(
        &self,
        ctx: &mut RoutingContext,
        matched: &[MatchedRoute<'_>],
        mut route: usize,
        failure: Failure,
    ) -> Outcome {
        ctx.set_failure(failure);

        let mut index = 0;
        while let Some(handler) = seek(matched, &mut route, &mut index, |r| &r.failure_handlers) {
            ctx.enter_route(&matched[route].params);
            match invoke(handler, ctx, FaultKind::FailureHandlerFault).await {
                Step::Ended => return Outcome::Recovered,
                Step::Next => index += 1,
                Step::Fault { kind, failure } => {
                    tracing::warn!(
                        request_id = ctx.request_id().unwrap_or("-"),
                        route = %matched[route].route.pattern(),
                        fault = %failure,
                        "Failure handler failed; skipping remaining failure handlers"
                    );
                    metrics::record_fault(kind);
                    break;
                }
            }
        }

        self.fall_back(ctx).await
    }

    /// Error-handler of the top-level router, once, then the default response.
    async fn fall_back(&self, ctx: &mut RoutingContext) -> Outcome {
        let status = ctx
            .status_code()
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.invoke_error_handler(ctx, status).await {
            return Outcome::ErrorHandled;
        }

        tracing::warn!(
            request_id = ctx.request_id().unwrap_or("-"),
            status = status.as_u16(),
            failure = ?ctx.failure(),
            "Unhandled failure"
        );
        end_default(ctx, status, INTERNAL_SERVER_ERROR_BODY);
        Outcome::DefaultError
    }

    /// No route (or no remaining handler) for the request. Failure-handlers
    /// are not consulted.
    async fn unmatched(&self, ctx: &mut RoutingContext, status: StatusCode) -> Outcome {
        metrics::record_fault(FaultKind::Unmatched);
        ctx.set_failure(Failure::status(status));

        if !self.invoke_error_handler(ctx, status).await {
            end_default(ctx, status, status.canonical_reason().unwrap_or_default());
        }

        if status == StatusCode::METHOD_NOT_ALLOWED {
            Outcome::MethodNotAllowed
        } else {
            Outcome::NotFound
        }
    }

    /// Returns true if an error-handler ended the response.
    async fn invoke_error_handler(&self, ctx: &mut RoutingContext, status: StatusCode) -> bool {
        let Some(handler) = self.router.error_handler_for(status) else {
            return false;
        };

        match invoke(handler, ctx, FaultKind::ErrorHandlerFault).await {
            Step::Ended => true,
            Step::Next => {
                tracing::warn!(status = status.as_u16(), "Error handler called next; nothing follows it");
                false
            }
            Step::Fault { kind, failure } => {
                tracing::warn!(status = status.as_u16(), fault = %failure, "Error handler failed");
                metrics::record_fault(kind);
                false
            }
        }
    }
}

/// Move the cursor to the next existing handler at or after
/// (`route`, `index`), crossing into later routes as needed.
fn seek<'m, 'r: 'm>(
    matched: &'m [MatchedRoute<'r>],
    route: &mut usize,
    index: &mut usize,
    chain: impl Fn(&'r Route) -> &'r Vec<Box<dyn Handler>>,
) -> Option<&'r dyn Handler> {
    while let Some(current) = matched.get(*route) {
        if let Some(handler) = chain(current.route).get(*index) {
            return Some(handler.as_ref());
        }
        *route += 1;
        *index = 0;
    }
    None
}

/// Run one handler, translating its result and signal into a [`Step`].
/// `fault_kind` classifies an uncaught error or panic.
async fn invoke(handler: &dyn Handler, ctx: &mut RoutingContext, fault_kind: FaultKind) -> Step {
    let result = AssertUnwindSafe(handler.call(ctx)).catch_unwind().await;
    let signal = ctx.take_signal();

    if ctx.is_ended() {
        if let Ok(Err(error)) = &result {
            tracing::warn!(error = %error, "Handler failed after the response ended");
        }
        return Step::Ended;
    }

    let explicit_kind = match fault_kind {
        FaultKind::HandlerFault => FaultKind::ExplicitFail,
        other => other,
    };

    match (result, signal) {
        (Err(panic), _) => Step::Fault {
            kind: fault_kind,
            failure: Failure::uncaught(DispatchError::Panicked(panic_message(panic))),
        },
        (Ok(_), Some(Signal::Fail(failure))) => Step::Fault {
            kind: explicit_kind,
            failure,
        },
        (Ok(Err(error)), _) => Step::Fault {
            kind: fault_kind,
            failure: Failure::uncaught(error),
        },
        (Ok(Ok(())), Some(Signal::Next)) => Step::Next,
        (Ok(Ok(())), None) => Step::Fault {
            kind: fault_kind,
            failure: Failure::uncaught(DispatchError::Stalled),
        },
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Replace whatever was written with a plain-text default response.
fn end_default(ctx: &mut RoutingContext, status: StatusCode, body: &'static str) {
    let response = ctx.response();
    response.reset();
    if response.set_status(status).end_with(body).is_err() {
        tracing::debug!(status = status.as_u16(), "Response already ended");
    }
}

/// Logs and counts requests dropped before a response was produced.
struct AbandonGuard {
    request_id: Option<String>,
    path: String,
    started: Instant,
    completed: bool,
}

impl AbandonGuard {
    fn new(ctx: &RoutingContext, started: Instant) -> Self {
        Self {
            request_id: ctx.request_id().map(str::to_string),
            path: ctx.path().to_string(),
            started,
            completed: false,
        }
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        if !self.completed {
            tracing::info!(
                request_id = self.request_id.as_deref().unwrap_or("-"),
                path = %self.path,
                "Request abandoned before a response was produced"
            );
            metrics::record_abandoned(self.started);
        }
    }
}
