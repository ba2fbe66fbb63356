//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app whose fallback hands every request to the dispatcher
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bound in-flight requests and request body size
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::routing::Router as RouteTree;

/// Application state injected into the fallback handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub in_flight: Arc<Semaphore>,
    pub max_body_bytes: usize,
}

/// HTTP server driving a frozen router.
pub struct HttpServer {
    app: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server for `routes` with the given configuration.
    pub fn new(config: ServerConfig, routes: Arc<RouteTree>) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(routes)),
            in_flight: Arc::new(Semaphore::new(config.listener.max_in_flight)),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let app = Self::build_app(&config, state);
        Self { app, config }
    }

    /// Build the Axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, state: AppState) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .fallback(dispatch_request)
            .with_state(state)
            .layer(layers)
    }

    /// The Axum app, for serving on a custom listener or driving in tests.
    pub fn into_app(self) -> Router {
        self.app
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_in_flight = self.config.listener.max_in_flight,
            "HTTP server starting"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Fallback handler: every request goes through the dispatcher.
async fn dispatch_request(State(state): State<AppState>, request: Request<Body>) -> Response {
    // Waits for a slot when the limit is reached.
    let _permit = match state.in_flight.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::error!("In-flight semaphore closed");
            return (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response();
        }
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_bytes,
                error = %e,
                "Failed to read request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    state
        .dispatcher
        .dispatch(Request::from_parts(parts, bytes))
        .await
}
