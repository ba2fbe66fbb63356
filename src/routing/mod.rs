//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route registration (before serving):
//!     Router::route(pattern) / Router::route_any()
//!     → Route::handler / failure_handler / sub_router (chained)
//!     → Router::error_handler(status)
//!     → Router::freeze() (validate, seal into Arc<Router>)
//!
//! Request matching (per request):
//!     method + path
//!     → router.rs (walk routes in insertion order)
//!     → matcher.rs (pattern match, path params, mount remainder)
//!     → descend into mounted sub-routers with the stripped path
//!     → Return: ordered list of matched routes, or NoMatch / MethodMismatch
//! ```
//!
//! # Design Decisions
//! - Insertion order is matching priority; there is no sorting
//! - Each router owns its routes; mounted routers are owned by the mount route
//! - Frozen routers are immutable, shared via Arc without locks
//! - Error-handlers are looked up on the top-level router only

pub mod handler;
pub mod matcher;
pub mod route;
pub mod router;

pub use handler::{BoxError, BoxFuture, Handler, HandlerResult};
pub use matcher::{PathMatch, PathPattern};
pub use route::Route;
pub use router::{MatchedRoute, Matches, Router, RouterError};
