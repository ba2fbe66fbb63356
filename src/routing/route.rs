//! A single route: pattern, method filter and its two handler chains.

use std::fmt;

use axum::http::Method;

use crate::dispatch::RoutingContext;
use crate::routing::handler::{AsyncFn, BoxFuture, Handler, HandlerResult, SyncFn};
use crate::routing::matcher::PathPattern;
use crate::routing::router::Router;

/// A path pattern bound to ordered handlers and ordered failure-handlers.
///
/// Built through [`Router::route`] / [`Router::route_any`]; every builder
/// method returns `&mut Route` for chaining:
///
/// ```
/// use failure_router::Router;
/// use axum::http::StatusCode;
///
/// let mut router = Router::new();
/// router
///     .route("/")
///     .handler(|ctx| {
///         ctx.fail(StatusCode::IM_A_TEAPOT);
///         Ok(())
///     })
///     .failure_handler(|ctx| {
///         let status = ctx.status_code().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
///         ctx.response().set_status(status).end()?;
///         Ok(())
///     });
/// ```
pub struct Route {
    pattern: PathPattern,
    methods: Vec<Method>,
    pub(crate) handlers: Vec<Box<dyn Handler>>,
    pub(crate) failure_handlers: Vec<Box<dyn Handler>>,
    pub(crate) sub_router: Option<Router>,
}

impl Route {
    pub(crate) fn new(pattern: PathPattern) -> Self {
        Self {
            pattern,
            methods: Vec::new(),
            handlers: Vec::new(),
            failure_handlers: Vec::new(),
            sub_router: None,
        }
    }

    /// Restrict the route to `method`. May be called repeatedly; an empty set
    /// accepts every method.
    pub fn method(&mut self, method: Method) -> &mut Self {
        if !self.methods.contains(&method) {
            self.methods.push(method);
        }
        self
    }

    /// Append a synchronous handler.
    pub fn handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut RoutingContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(SyncFn(handler)));
        self
    }

    /// Append a handler that awaits.
    pub fn async_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut RoutingContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(AsyncFn(handler)));
        self
    }

    /// Append a synchronous failure-handler.
    pub fn failure_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut RoutingContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.failure_handlers.push(Box::new(SyncFn(handler)));
        self
    }

    /// Append a failure-handler that awaits.
    pub fn async_failure_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut RoutingContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.failure_handlers.push(Box::new(AsyncFn(handler)));
        self
    }

    /// Delegate everything under this route's prefix to `router`.
    ///
    /// The pattern must end in `/*` and the route must carry no handlers of
    /// its own; both are checked by [`Router::validate`].
    pub fn sub_router(&mut self, router: Router) -> &mut Self {
        self.sub_router = Some(router);
        self
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn accepts(&self, method: &Method) -> bool {
        self.methods.is_empty() || self.methods.contains(method)
    }

    pub fn is_mount(&self) -> bool {
        self.sub_router.is_some()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("methods", &self.methods)
            .field("handlers", &self.handlers.len())
            .field("failure_handlers", &self.failure_handlers.len())
            .field("sub_router", &self.sub_router)
            .finish()
    }
}
