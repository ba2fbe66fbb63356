//! Handler abstraction shared by handlers, failure-handlers and error-handlers.
//!
//! A handler receives the request's [`RoutingContext`] and signals what comes
//! next through it: end the response, call `next()`, or `fail(..)`. Returning
//! `Err` is an uncaught fault and fails the request with status 500.

use std::future::Future;
use std::pin::Pin;

use crate::dispatch::RoutingContext;

/// Type-erased error returned by handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of every handler.
pub type HandlerResult = Result<(), BoxError>;

/// Boxed future borrowing the routing context.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A step in a handler, failure-handler or error-handler chain.
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut RoutingContext) -> BoxFuture<'a, HandlerResult>;
}

/// Adapts a synchronous closure.
pub(crate) struct SyncFn<F>(pub(crate) F);

impl<F> Handler for SyncFn<F>
where
    F: Fn(&mut RoutingContext) -> HandlerResult + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RoutingContext) -> BoxFuture<'a, HandlerResult> {
        // Run inside the future so a panic surfaces when it is polled.
        Box::pin(async move { (self.0)(ctx) })
    }
}

/// Adapts a closure returning a boxed future.
pub(crate) struct AsyncFn<F>(pub(crate) F);

impl<F> Handler for AsyncFn<F>
where
    F: for<'a> Fn(&'a mut RoutingContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RoutingContext) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { (self.0)(ctx).await })
    }
}
