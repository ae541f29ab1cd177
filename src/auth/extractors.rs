//! Axum extractors for authentication and method input.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Request},
    http::{HeaderMap, header, request::Parts},
};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::state::HasJwt;
use crate::api::ApiError;
use crate::jwt::AccessTokenData;

/// The token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for API methods that require an authenticated account.
///
/// Validates the bearer access token. An expired token is rejected with
/// `ACCESS_TOKEN_EXPIRED` so a caller holding a refresh token knows to use
/// it; any other failure is `UNAUTHORIZED`.
pub struct Authorized(pub AccessTokenData);

impl<S> FromRequestParts<S> for Authorized
where
    S: HasJwt + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(ApiError::unauthorized)?;
        let data = state.jwt().validate_access_token(token)?;
        Ok(Authorized(data))
    }
}

/// JSON method input. Malformed bodies are rejected with `BAD_INPUT` inside
/// the usual error envelope rather than axum's plain-text rejection.
pub struct Input<T>(pub T);

impl<S, T> FromRequest<S> for Input<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Input(value)),
            Err(rejection) => {
                debug!(error = %rejection, "rejected method input");
                Err(ApiError::bad_input())
            }
        }
    }
}
