//! Request routing with explicit failure propagation.
//!
//! Routes carry ordered handler chains and ordered failure-handler chains,
//! routers carry status-keyed error-handlers, and the dispatcher drives each
//! request through `MATCHING → HANDLING → (FAILING)? → RESPONDING`.

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ServerConfig;
pub use dispatch::{Dispatcher, Failure, RoutingContext};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{BoxError, HandlerResult, Route, Router, RouterError};
