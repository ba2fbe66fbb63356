//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → request.rs (assign X-Request-ID)
//!     → TraceLayer span, TimeoutLayer
//!     → server.rs fallback: in-flight permit, buffer body (size-limited)
//!     → Dispatcher::dispatch
//!     → Response<Body> (X-Request-ID propagated)
//! ```
//!
//! # Design Decisions
//! - The dispatcher is the only producer of responses for routed requests
//! - Request ID added as early as possible for tracing
//! - Bodies are buffered before dispatch so handlers see plain bytes
//! - A dropped connection drops the dispatch future (request abandoned)

pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
