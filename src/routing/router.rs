//! Route storage, lookup and error-handler registration.
//!
//! # Responsibilities
//! - Store routes in insertion order
//! - Collect every route matching a request, descending into sub-routers
//! - Hold status-keyed error-handlers
//! - Validate wiring before the router is sealed
//!
//! # Design Decisions
//! - Immutable once frozen (shared via Arc, no locks on the hot path)
//! - O(n) scan per router level (acceptable for typical route counts)
//! - Explicit NoMatch / MethodMismatch rather than a silent default

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use thiserror::Error;

use crate::dispatch::RoutingContext;
use crate::routing::handler::{AsyncFn, BoxFuture, Handler, HandlerResult, SyncFn};
use crate::routing::matcher::PathPattern;
use crate::routing::route::Route;

/// Errors detected when validating router wiring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    /// The pattern text cannot be compiled.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: &'static str },

    /// A sub-router was mounted on a pattern without a trailing `/*`.
    #[error("sub-router mounted on '{pattern}' must use a prefix pattern ending in '/*'")]
    MountOnExactPattern { pattern: String },

    /// A mount route also carries handlers or failure-handlers.
    #[error("route '{pattern}' mounts a sub-router and cannot have handlers of its own")]
    MountWithHandlers { pattern: String },
}

/// Ordered collection of routes plus status-keyed error-handlers.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    error_handlers: HashMap<StatusCode, Box<dyn Handler>>,
}

/// A route selected for a request, with the parameters bound on the way down.
pub struct MatchedRoute<'r> {
    pub route: &'r Route,
    pub params: Vec<(String, String)>,
}

/// Outcome of matching a request against a router tree.
pub enum Matches<'r> {
    /// Matched routes in dispatch order.
    Found(Vec<MatchedRoute<'r>>),
    /// Some path matched but no route accepts the method.
    MethodMismatch,
    /// Nothing matched.
    NoMatch,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route matching `pattern`. Insertion order is matching order.
    pub fn route(&mut self, pattern: &str) -> &mut Route {
        self.push(PathPattern::new(pattern))
    }

    /// Append a route matching every path.
    pub fn route_any(&mut self) -> &mut Route {
        self.push(PathPattern::any())
    }

    fn push(&mut self, pattern: PathPattern) -> &mut Route {
        let index = self.routes.len();
        self.routes.push(Route::new(pattern));
        &mut self.routes[index]
    }

    /// Register the last-resort handler for `status`. Replaces any earlier one.
    ///
    /// Only consulted when this router is the top-level router of a dispatch.
    pub fn error_handler<F>(&mut self, status: StatusCode, handler: F) -> &mut Self
    where
        F: Fn(&mut RoutingContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.error_handlers.insert(status, Box::new(SyncFn(handler)));
        self
    }

    /// Register an awaiting last-resort handler for `status`.
    pub fn async_error_handler<F>(&mut self, status: StatusCode, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut RoutingContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.error_handlers.insert(status, Box::new(AsyncFn(handler)));
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub(crate) fn error_handler_for(&self, status: StatusCode) -> Option<&dyn Handler> {
        self.error_handlers.get(&status).map(|handler| handler.as_ref())
    }

    /// Check patterns and mounts across the whole router tree.
    pub fn validate(&self) -> Result<(), RouterError> {
        for route in &self.routes {
            route.pattern().check()?;

            if let Some(child) = &route.sub_router {
                let pattern = route.pattern().as_str().to_string();
                if !route.pattern().is_prefix() {
                    return Err(RouterError::MountOnExactPattern { pattern });
                }
                if !route.handlers.is_empty() || !route.failure_handlers.is_empty() {
                    return Err(RouterError::MountWithHandlers { pattern });
                }
                child.validate()?;
            }
        }
        Ok(())
    }

    /// Validate and seal the router for serving.
    pub fn freeze(self) -> Result<Arc<Router>, RouterError> {
        self.validate()?;
        Ok(Arc::new(self))
    }

    /// Collect the routes matching `method` and `path`, in dispatch order.
    pub fn matches(&self, method: &Method, path: &str) -> Matches<'_> {
        let mut found = Vec::new();
        let mut method_mismatch = false;
        self.collect(method, path, &[], &mut found, &mut method_mismatch);

        if !found.is_empty() {
            Matches::Found(found)
        } else if method_mismatch {
            Matches::MethodMismatch
        } else {
            Matches::NoMatch
        }
    }

    fn collect<'r>(
        &'r self,
        method: &Method,
        path: &str,
        inherited: &[(String, String)],
        found: &mut Vec<MatchedRoute<'r>>,
        method_mismatch: &mut bool,
    ) {
        for route in &self.routes {
            let Some(matched) = route.pattern().matches(path) else {
                continue;
            };
            if !route.accepts(method) {
                *method_mismatch = true;
                continue;
            }

            let mut params = inherited.to_vec();
            params.extend(matched.params);

            match &route.sub_router {
                Some(child) => {
                    let remainder = matched.remainder.as_deref().unwrap_or("/");
                    child.collect(method, remainder, &params, found, method_mismatch);
                }
                None => found.push(MatchedRoute { route, params }),
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut statuses: Vec<u16> = self.error_handlers.keys().map(StatusCode::as_u16).collect();
        statuses.sort_unstable();
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("error_handlers", &statuses)
            .finish()
    }
}
