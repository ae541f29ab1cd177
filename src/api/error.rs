//! Shared error handling for API endpoints.
//!
//! Every response is a JSON envelope: `{"ok": true, "data": ...}` on success
//! and `{"ok": false, "error": {"code": ...}}` on failure.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::db::DbError;
use crate::jwt::JwtError;
use crate::password::PasswordError;

/// The fixed set of error codes a client can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    Unknown,
    BadInput,
    Unauthorized,
    AccessTokenExpired,
    SignUpEmailAlreadyUsed,
    SignInUnrecognizedEmail,
    SignInIncorrectPassword,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized | Self::AccessTokenExpired => StatusCode::UNAUTHORIZED,
            Self::BadInput
            | Self::SignUpEmailAlreadyUsed
            | Self::SignInUnrecognizedEmail
            | Self::SignInIncorrectPassword => StatusCode::BAD_REQUEST,
        }
    }
}

/// API error type with automatic response conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError(pub ApiErrorCode);

impl ApiError {
    pub fn code(&self) -> ApiErrorCode {
        self.0
    }

    pub fn unknown() -> Self {
        Self(ApiErrorCode::Unknown)
    }

    pub fn bad_input() -> Self {
        Self(ApiErrorCode::BadInput)
    }

    pub fn unauthorized() -> Self {
        Self(ApiErrorCode::Unauthorized)
    }
}

impl From<ApiErrorCode> for ApiError {
    fn from(code: ApiErrorCode) -> Self {
        Self(code)
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        if e.is_programmer_error() {
            error!(error = %e, "programmer error while handling request");
        } else {
            error!(error = %e, "database error");
        }
        Self::unknown()
    }
}

impl From<JwtError> for ApiError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => Self(ApiErrorCode::AccessTokenExpired),
            JwtError::Unauthorized => Self::unauthorized(),
            JwtError::Encoding(_) | JwtError::TimeError => {
                error!(error = %e, "failed to issue access token");
                Self::unknown()
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        error!(error = %e, "password hashing failed");
        Self::unknown()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: ApiErrorCode,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    ok: bool,
    error: ErrorBody,
}

/// A successful response envelope.
#[derive(Debug, Serialize)]
pub struct OkEnvelope<T> {
    ok: bool,
    data: T,
}

/// Wrap `data` in a successful response envelope.
pub fn ok<T: Serialize>(data: T) -> Json<OkEnvelope<T>> {
    Json(OkEnvelope { ok: true, data })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            ok: false,
            error: ErrorBody { code: self.0 },
        };
        (self.0.status(), Json(body)).into_response()
    }
}
