//! Startup configuration: deployment environment and the signing secret.
//!
//! Everything here is resolved once at startup and then passed explicitly
//! into the components that need it.

use thiserror::Error;

/// Signing secret used in development and test when none is supplied.
pub const DEVELOPMENT_SECRET: &str = "secret";

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    /// Whether cookies carry the `Secure` attribute.
    pub fn secure_cookies(self) -> bool {
        self != Self::Development
    }

    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT secret is required in production. Set JWT_SECRET or use --jwt-secret-file")]
    MissingSecret,
    #[error("JWT secret is shorter than {} characters", MIN_JWT_SECRET_LENGTH)]
    ShortSecret,
    #[error("failed to read JWT secret file {path}: {source}")]
    SecretFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("a database URL is required in production")]
    MissingDatabase,
}

/// Decide the signing secret from what the environment supplied.
///
/// Production requires a secret of at least 32 characters. Development and
/// test fall back to [`DEVELOPMENT_SECRET`] when nothing is supplied.
pub fn resolve_jwt_secret(
    supplied: Option<String>,
    environment: Environment,
) -> Result<String, ConfigError> {
    let supplied = supplied.filter(|s| !s.is_empty());
    match (supplied, environment) {
        (Some(secret), Environment::Production) if secret.len() < MIN_JWT_SECRET_LENGTH => {
            Err(ConfigError::ShortSecret)
        }
        (Some(secret), _) => Ok(secret),
        (None, Environment::Production) => Err(ConfigError::MissingSecret),
        (None, _) => Ok(DEVELOPMENT_SECRET.to_string()),
    }
}
