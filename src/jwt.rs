//! Access token generation and validation.
//!
//! Access tokens are HS256 JWTs carrying only the authenticated account id.
//! They are stateless and live for one hour from issuance. Everything that
//! needs to outlive that hour goes through refresh tokens.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use crate::id::AccountId;

/// Access token duration: 1 hour
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 60 * 60;

/// The data carried around in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenData {
    /// The account that is authorized to interact with the API.
    #[serde(rename = "id")]
    pub account_id: AccountId,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub data: AccessTokenData,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    /// The signature checked out but the token is past its expiry.
    #[error("access token expired")]
    Expired,
    /// Bad signature, malformed token, or anything else that failed verification.
    #[error("access token rejected")]
    Unauthorized,
    #[error("system time error")]
    TimeError,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Generate an access token valid for one hour from now.
    ///
    /// Every token produced here is trusted by the API until it expires. Only
    /// call this after a credential for `data.account_id` has been verified.
    pub fn generate_access_token(&self, data: &AccessTokenData) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();
        self.generate_access_token_at(data, now)
    }

    /// Generate an access token as if issued at `issued_at`.
    pub fn generate_access_token_at(
        &self,
        data: &AccessTokenData,
        issued_at: u64,
    ) -> Result<String, JwtError> {
        let claims = AccessClaims {
            data: data.clone(),
            iat: issued_at,
            exp: issued_at + ACCESS_TOKEN_DURATION_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Validate an access token and return the data it carries.
    ///
    /// Only [`JwtError::Expired`] is worth a refresh attempt. Every other
    /// failure is [`JwtError::Unauthorized`].
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenData, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(
                |e| match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::Expired,
                    _ => JwtError::Unauthorized,
                },
            )?;

        Ok(token_data.claims.data)
    }
}

/// Decode an access token's claims without checking its signature.
///
/// Only for places where forged claims have no consequence, like peeking at
/// the expiry before deciding whether to refresh. Never act on the account id
/// returned from here.
pub fn decode_unverified(token: &str) -> Option<AccessClaims> {
    jsonwebtoken::dangerous::insecure_decode::<AccessClaims>(token)
        .ok()
        .map(|data| data.claims)
}
