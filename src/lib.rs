pub mod account;
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod id;
pub mod jwt;
pub mod ledger;
pub mod password;
pub mod proxy;

use api::{ApiState, create_api_router};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use proxy::{ProxyConfig, create_proxy_router};

/// Create the upstream API application.
pub fn create_api_app(state: ApiState) -> Router {
    create_api_router(state)
}

/// Create the browser-facing application: the session proxy.
pub fn create_web_app(config: &ProxyConfig) -> Result<Router, reqwest::Error> {
    create_proxy_router(config)
}

/// Run an app on the given listener. This function blocks until the server exits.
pub async fn run_server(app: Router, listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

/// Start an app on the given port in a background task. Use port 0 to let
/// the OS choose a random port. Returns the actual address it listens on.
pub async fn start_server(
    app: Router,
    port: u16,
) -> std::io::Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(app, listener).await.ok();
    });

    Ok((handle, local_addr))
}
