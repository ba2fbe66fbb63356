//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request<Bytes>
//!     → dispatcher.rs  MATCHING: router.matches(method, path)
//!         ├─ NoMatch / MethodMismatch → error-handler(404/405) or default
//!         └─ Found(routes)
//!     → HANDLING: handlers in order, advanced only by ctx.next()
//!         ├─ response ended          → RESPONDING
//!         ├─ Err / panic / ctx.fail  → FAILING
//!         └─ chain exhausted         → 404
//!     → FAILING: failure-handlers from the failing route onward
//!         ├─ response ended          → RESPONDING
//!         ├─ ctx.next()              → next failure-handler (same failure)
//!         └─ fault in failure-handler → stop searching
//!     → top-level error-handler(status), once
//!     → default "Internal Server Error"
//!     → Response<Body>
//! ```
//!
//! # Design Decisions
//! - One context per request, driven by one future: handlers never overlap
//! - Explicit cursors over an explicit list of matched routes
//! - A fault inside a failure-handler is never retried by its siblings
//! - Dropping the dispatch future abandons the request without error-handlers

pub mod context;
pub mod dispatcher;
pub mod failure;
pub mod response;

pub use context::RoutingContext;
pub use dispatcher::{Dispatcher, Outcome};
pub use failure::{DispatchError, Failure, FaultKind};
pub use response::{ResponseError, ResponseWriter};
