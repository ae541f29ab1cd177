mod account;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::account::AccountStore;
use crate::impl_has_jwt;
use crate::jwt::JwtConfig;
use crate::ledger::RefreshTokenLedger;

pub use error::{ApiError, ApiErrorCode, OkEnvelope, ok};

/// Shared state for the upstream API.
#[derive(Clone)]
pub struct ApiState {
    pub jwt: Arc<JwtConfig>,
    pub ledger: Arc<dyn RefreshTokenLedger>,
    pub accounts: Arc<dyn AccountStore>,
}

impl_has_jwt!(ApiState);

/// Create the API router. Every method is a `POST` whose path names it.
pub fn create_api_router(state: ApiState) -> Router {
    Router::new().nest("/account", account::router(state))
}
