//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher / http server produce:
//!     → logging.rs (structured log events, one subscriber per process)
//!     → metrics.rs (dispatch outcomes, faults, latency)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Metrics macros are no-ops until a recorder is installed
//! - Fault kinds are labelled so unrecovered failures stand out

pub mod logging;
pub mod metrics;
