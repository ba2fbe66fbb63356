//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use failure_router::config::ServerConfig;
use failure_router::{HttpServer, Router, Shutdown};
use tokio::net::TcpListener;

/// Counts how often a handler ran.
#[derive(Debug, Clone, Default)]
pub struct Checkpoint(Arc<AtomicUsize>);

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A server on an ephemeral port, stopped when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Freeze `router` and serve it on 127.0.0.1 with an ephemeral port.
pub async fn start_server(router: Router) -> TestServer {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    start_server_with(config, router).await
}

/// Like [`start_server`] with explicit configuration.
pub async fn start_server_with(config: ServerConfig, router: Router) -> TestServer {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router.freeze().unwrap());
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, shutdown }
}

/// Perform a GET and return status code and body.
pub async fn get(server: &TestServer, path: &str) -> (u16, String) {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let response = client
        .get(format!("http://{}{}", server.addr, path))
        .send()
        .await
        .expect("server unreachable");
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}
