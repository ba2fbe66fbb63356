//! failure-router demo server.
//!
//! Serves a small router that exercises every failure path:
//!
//! ```text
//! GET /                  → 200 "ok"
//! GET /boom              → handler error, recovered by the route's failure-handler
//! GET /teapot            → fail(418), failure-handler ends with no body
//! GET /unhandled         → handler error, no failure-handler → error-handler(500)
//! GET /api/items/:id     → sub-router; failures fall through to the root fallback
//! any other path         → 404 via error-handler(404)
//! ```

use std::path::PathBuf;

use axum::http::{Method, StatusCode};
use clap::Parser;
use tokio::net::TcpListener;

use failure_router::config::resolve_config;
use failure_router::lifecycle::{wait_for_signal, Shutdown};
use failure_router::observability::{logging, metrics};
use failure_router::{HttpServer, Router};

#[derive(Parser)]
#[command(name = "failure-router")]
#[command(about = "Demo server for route failure propagation", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config.as_deref(), cli.bind)?;

    logging::init_logging(&config.observability);
    tracing::info!("failure-router v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_in_flight = config.listener.max_in_flight,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let routes = demo_router().freeze()?;
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    HttpServer::new(config, routes).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_router() -> Router {
    let mut api = Router::new();
    api.route("/items/:id")
        .method(Method::GET)
        .handler(|ctx| {
            let id = ctx.param("id").unwrap_or_default().to_string();
            if id.parse::<u64>().is_err() {
                ctx.fail_with(StatusCode::BAD_REQUEST, format!("item id '{id}' is not a number"));
                return Ok(());
            }
            ctx.response().end_with(format!("item {id}"))?;
            Ok(())
        })
        .failure_handler(|ctx| {
            tracing::info!(failure = ?ctx.failure(), "api failure, deferring to root");
            ctx.next();
            Ok(())
        });
    // Never reached while mounted: only the top-level router's error-handlers run.
    api.error_handler(StatusCode::BAD_REQUEST, |ctx| {
        ctx.response().end_with("api error handler")?;
        Ok(())
    });

    let mut router = Router::new();
    router.route("/").method(Method::GET).handler(|ctx| {
        ctx.response().end_with("ok")?;
        Ok(())
    });
    router
        .route("/boom")
        .handler(|_ctx| Err("boom".into()))
        .failure_handler(|ctx| {
            let status = ctx.status_code().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let message = ctx.failure_message().unwrap_or_default();
            ctx.response().set_status(status).end_with(message)?;
            Ok(())
        });
    router
        .route("/teapot")
        .handler(|ctx| {
            ctx.fail(StatusCode::IM_A_TEAPOT);
            Ok(())
        })
        .failure_handler(|ctx| {
            let status = ctx.status_code().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            ctx.response().set_status(status).end()?;
            Ok(())
        });
    router
        .route("/unhandled")
        .handler(|_ctx| Err("nobody catches this".into()));
    router.route("/api/*").sub_router(api);
    router.route("/api/*").failure_handler(|ctx| {
        let status = ctx.status_code().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = ctx.failure_message().unwrap_or_default();
        ctx.response()
            .set_status(status)
            .end_with(format!("api failure: {message}"))?;
        Ok(())
    });

    router.error_handler(StatusCode::INTERNAL_SERVER_ERROR, |ctx| {
        tracing::error!(failure = ?ctx.failure(), "Unhandled failure reached the error handler");
        ctx.response()
            .set_status(StatusCode::INTERNAL_SERVER_ERROR)
            .end_with("something went wrong")?;
        Ok(())
    });
    router.error_handler(StatusCode::NOT_FOUND, |ctx| {
        let body = format!("no route for {}", ctx.path());
        ctx.response().set_status(StatusCode::NOT_FOUND).end_with(body)?;
        Ok(())
    });
    router
}
