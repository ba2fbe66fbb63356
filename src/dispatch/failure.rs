//! Failure values and fault taxonomy.

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::routing::BoxError;

/// The failure a request is carrying while failure-handlers run.
///
/// Cheap to clone; the error is shared.
#[derive(Clone)]
pub struct Failure {
    status: StatusCode,
    error: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Failure {
    /// A failure carrying only a status code.
    pub fn status(status: StatusCode) -> Self {
        Self { status, error: None }
    }

    /// A failure carrying a status code and its cause.
    pub fn with_error(status: StatusCode, error: impl Into<BoxError>) -> Self {
        let error: BoxError = error.into();
        Self {
            status,
            error: Some(Arc::from(error)),
        }
    }

    /// An uncaught error: status 500.
    pub fn uncaught(error: impl Into<BoxError>) -> Self {
        Self::with_error(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    /// The error's message, verbatim.
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(|error| error.to_string())
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("status", &self.status)
            .field("error", &self.message())
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(error) => write!(f, "{}: {}", self.status, error),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Causes the dispatcher attaches to failures it detects itself.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A handler panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// A handler returned without ending the response, failing, or calling next.
    #[error("handler returned without ending the response, failing, or calling next")]
    Stalled,
}

/// Classification of a fault for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Uncaught error or panic in a handler.
    HandlerFault,
    /// `fail(..)` called by a handler.
    ExplicitFail,
    /// Any fault raised while a failure-handler ran. Never retried.
    FailureHandlerFault,
    /// Any fault raised while the top-level error-handler ran.
    ErrorHandlerFault,
    /// No route matched the request.
    Unmatched,
}

impl FaultKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FaultKind::HandlerFault => "handler_fault",
            FaultKind::ExplicitFail => "explicit_fail",
            FaultKind::FailureHandlerFault => "failure_handler_fault",
            FaultKind::ErrorHandlerFault => "error_handler_fault",
            FaultKind::Unmatched => "unmatched",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
