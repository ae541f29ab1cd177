//! Account methods.
//!
//! - POST `/signUp` - Create an account and start a session
//! - POST `/signIn` - Start a session with an email and password
//! - POST `/refreshAccessToken` - Exchange a refresh token for an access token
//! - POST `/signOut` - Revoke a refresh token
//! - POST `/getCurrentAccount` - The authenticated account's profile

use axum::{Router, extract::State, response::IntoResponse, routing::post};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiState;
use super::error::{ApiError, ApiErrorCode, ok};
use crate::account::AccountProfile;
use crate::auth::{Authorized, Input};
use crate::id::AccountId;
use crate::jwt::AccessTokenData;
use crate::password::{hash_password_blocking, verify_password_blocking};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/signUp", post(sign_up))
        .route("/signIn", post(sign_in))
        .route("/refreshAccessToken", post(refresh_access_token))
        .route("/signOut", post(sign_out))
        .route("/getCurrentAccount", post(get_current_account))
        .with_state(state)
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenInput {
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionTokens {
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenOutput {
    access_token: String,
}

#[derive(Serialize)]
struct Empty {}

#[derive(Serialize)]
struct CurrentAccount {
    account: AccountProfile,
}

impl Credentials {
    fn validate(self) -> Result<(String, String), ApiError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || self.password.is_empty() {
            return Err(ApiError::bad_input());
        }
        Ok((email, self.password))
    }
}

/// Issue both tokens for an account whose credential was just verified.
async fn start_session(state: &ApiState, account_id: AccountId) -> Result<SessionTokens, ApiError> {
    let refresh_token = state.ledger.issue(&account_id).await?;
    let access_token = state
        .jwt
        .generate_access_token(&AccessTokenData { account_id })?;
    Ok(SessionTokens {
        access_token,
        refresh_token,
    })
}

async fn sign_up(
    State(state): State<ApiState>,
    Input(input): Input<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = input.validate()?;

    let password_hash = hash_password_blocking(password).await?;
    let account_id = state
        .accounts
        .create(&email, &password_hash)
        .await?
        .ok_or(ApiError(ApiErrorCode::SignUpEmailAlreadyUsed))?;

    info!(account_id = %account_id, "account created");
    Ok(ok(start_session(&state, account_id).await?))
}

async fn sign_in(
    State(state): State<ApiState>,
    Input(input): Input<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = input.validate()?;

    let account = state
        .accounts
        .find_by_email(&email)
        .await?
        .ok_or(ApiError(ApiErrorCode::SignInUnrecognizedEmail))?;

    if !verify_password_blocking(password, account.password_hash).await? {
        return Err(ApiError(ApiErrorCode::SignInIncorrectPassword));
    }

    Ok(ok(start_session(&state, account.id).await?))
}

async fn refresh_access_token(
    State(state): State<ApiState>,
    Input(input): Input<RefreshTokenInput>,
) -> Result<impl IntoResponse, ApiError> {
    let account_id = state
        .ledger
        .resolve(&input.refresh_token)
        .await?
        .ok_or_else(ApiError::unauthorized)?;

    let access_token = state
        .jwt
        .generate_access_token(&AccessTokenData { account_id })?;
    Ok(ok(AccessTokenOutput { access_token }))
}

async fn sign_out(
    State(state): State<ApiState>,
    Input(input): Input<RefreshTokenInput>,
) -> Result<impl IntoResponse, ApiError> {
    state.ledger.revoke(&input.refresh_token).await?;
    Ok(ok(Empty {}))
}

async fn get_current_account(
    State(state): State<ApiState>,
    Authorized(data): Authorized,
) -> Result<impl IntoResponse, ApiError> {
    // A valid token for an account that no longer exists.
    let account = state
        .accounts
        .profile(&data.account_id)
        .await?
        .ok_or_else(ApiError::unauthorized)?;
    Ok(ok(CurrentAccount { account }))
}
