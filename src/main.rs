use std::time::Duration;

use clap::Parser;
use connect::cli::{Args, Command, build_api_state, init_logging, load_jwt_secret};
use connect::proxy::ProxyConfig;
use connect::{create_api_app, create_web_app, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let (app, port) = match args.command {
        Command::Api { port, database_url } => {
            let Some(jwt_secret) =
                load_jwt_secret(args.jwt_secret_file.as_deref(), args.environment)
            else {
                std::process::exit(1);
            };
            let Some(state) =
                build_api_state(&jwt_secret, database_url.as_deref(), args.environment).await
            else {
                std::process::exit(1);
            };
            (create_api_app(state), port)
        }
        Command::Web {
            port,
            upstream,
            upstream_timeout,
        } => {
            let config = ProxyConfig {
                upstream,
                secure_cookies: args.environment.secure_cookies(),
                request_timeout: Duration::from_secs(upstream_timeout),
            };
            match create_web_app(&config) {
                Ok(app) => (app, port),
                Err(e) => {
                    error!(error = %e, "Failed to create upstream client");
                    std::process::exit(1);
                }
            }
        }
    };

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, environment = ?args.environment, "Listening"),
        Err(e) => error!(error = %e, "Failed to read local address"),
    }

    if let Err(e) = run_server(app, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
