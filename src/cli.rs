//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use crate::account::MemoryAccounts;
use crate::api::ApiState;
use crate::config::{ConfigError, Environment, resolve_jwt_secret};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::ledger::MemoryRefreshTokens;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "connect", about = "Account API and cookie-based session proxy")]
pub struct Args {
    /// Deployment environment. Controls cookie security and secret requirements
    #[arg(long, env = "CONNECT_ENV", default_value = "development", global = true)]
    pub environment: Environment,

    /// Log output format
    #[arg(short, long, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long, global = true)]
    pub jwt_secret_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the account API
    Api {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Postgres connection URL. Without one, accounts and refresh tokens
        /// are kept in memory (not allowed in production)
        #[arg(long, env = "DATABASE_URL")]
        database_url: Option<String>,
    },
    /// Run the browser-facing session proxy
    Web {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Base URL of the account API
        #[arg(long, default_value = "http://localhost:4000")]
        upstream: Url,

        /// Seconds to wait for each upstream call before answering UNKNOWN
        #[arg(long, default_value = "30")]
        upstream_timeout: u64,
    },
}

/// Initialize logging based on the specified format. `RUST_LOG` selects the
/// level, defaulting to `info`.
pub fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Read the JWT secret from the environment variable or a file. The variable
/// is removed from the process environment once read.
pub fn read_jwt_secret(jwt_secret_file: Option<&str>) -> Result<Option<String>, ConfigError> {
    if let Ok(secret) = std::env::var("JWT_SECRET") {
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        return Ok(Some(secret));
    }

    match jwt_secret_file {
        Some(path) => std::fs::read_to_string(path)
            .map(|content| Some(content.trim().to_string()))
            .map_err(|source| ConfigError::SecretFile {
                path: path.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Load and validate the JWT secret for `environment`.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>, environment: Environment) -> Option<String> {
    let secret = read_jwt_secret(jwt_secret_file)
        .and_then(|supplied| {
            if supplied.is_none() && !environment.is_production() {
                warn!("No JWT secret supplied, using the development secret");
            }
            resolve_jwt_secret(supplied, environment)
        });

    match secret {
        Ok(secret) => Some(secret),
        Err(e) => {
            error!(error = %e, "Failed to load JWT secret");
            None
        }
    }
}

/// Build the API state, on Postgres when a URL is given and in memory
/// otherwise. Returns None and logs an error on failure.
pub async fn build_api_state(
    jwt_secret: &str,
    database_url: Option<&str>,
    environment: Environment,
) -> Option<ApiState> {
    let jwt = Arc::new(JwtConfig::new(jwt_secret.as_bytes()));

    match database_url {
        Some(url) => {
            let db = open_database(url).await?;
            Some(ApiState {
                jwt,
                ledger: Arc::new(db.refresh_tokens()),
                accounts: Arc::new(db.accounts()),
            })
        }
        None if environment.is_production() => {
            error!(error = %ConfigError::MissingDatabase, "Refusing to start");
            None
        }
        None => {
            warn!("No database URL, keeping accounts and refresh tokens in memory");
            Some(ApiState {
                jwt,
                ledger: Arc::new(MemoryRefreshTokens::new()),
                accounts: Arc::new(MemoryAccounts::new()),
            })
        }
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(url: &str) -> Option<Database> {
    match Database::open(url).await {
        Ok(db) => {
            info!("Database opened");
            Some(db)
        }
        Err(e) => {
            error!(error = %e, "Failed to open database");
            None
        }
    }
}
