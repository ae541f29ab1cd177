//! Methods whose bodies the proxy rewrites.
//!
//! Sign-in and sign-up responses carry raw tokens. Those move into cookies
//! and the body the browser sees has them blanked. Sign-out needs the refresh
//! token, which page scripts cannot read, so the proxy supplies it.

use axum::body::Bytes;
use serde_json::{Map, Value};

use super::upstream::ProxyError;
use crate::auth::is_cookie_safe;

pub const SIGN_IN: &str = "/account/signIn";
pub const SIGN_UP: &str = "/account/signUp";
pub const SIGN_OUT: &str = "/account/signOut";

/// Whether `method` returns new session tokens.
pub fn returns_tokens(method: &str) -> bool {
    method == SIGN_IN || method == SIGN_UP
}

/// Whether `method` starts or ends a session. These are answered without a
/// bearer token.
pub fn is_session_method(method: &str) -> bool {
    returns_tokens(method) || method == SIGN_OUT
}

/// Tokens lifted out of a successful sign-in or sign-up response.
#[derive(Debug, PartialEq, Eq)]
pub struct IssuedTokens {
    pub refresh_token: String,
    pub access_token: String,
}

/// What to send back for a sign-in or sign-up response.
#[derive(Debug, PartialEq, Eq)]
pub enum TokenResponse {
    /// An error envelope, passed through as-is.
    Failed(Bytes),
    /// A success envelope with the tokens blanked, plus the tokens.
    Issued { body: Bytes, tokens: IssuedTokens },
}

/// Take the tokens out of a sign-in or sign-up response body.
///
/// Other fields under `data` are left alone. Token values that cannot be
/// stored in a cookie verbatim make the whole response malformed.
pub fn take_tokens(body: &[u8]) -> Result<TokenResponse, ProxyError> {
    let mut envelope: Value = serde_json::from_slice(body)
        .map_err(|_| ProxyError::Malformed("response is not JSON"))?;

    match envelope.get("ok") {
        Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => return Ok(TokenResponse::Failed(Bytes::copy_from_slice(body))),
        _ => return Err(ProxyError::Malformed("response is not an envelope")),
    }

    let data = envelope
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .ok_or(ProxyError::Malformed("response has no data"))?;
    let tokens = IssuedTokens {
        refresh_token: blank(data, "refreshToken")?,
        access_token: blank(data, "accessToken")?,
    };

    let body = serde_json::to_vec(&envelope)
        .map_err(|_| ProxyError::Malformed("response could not be re-encoded"))?;
    Ok(TokenResponse::Issued {
        body: Bytes::from(body),
        tokens,
    })
}

fn blank(data: &mut Map<String, Value>, field: &str) -> Result<String, ProxyError> {
    let slot = data
        .get_mut(field)
        .ok_or(ProxyError::Malformed("response is missing a token"))?;
    let token = slot
        .as_str()
        .filter(|token| is_cookie_safe(token))
        .map(str::to_owned)
        .ok_or(ProxyError::Malformed("response token is not cookie-safe"))?;
    *slot = Value::String(String::new());
    Ok(token)
}

/// The sign-out body carrying the refresh token from the cookie.
pub fn sign_out_body(refresh_token: &str) -> Bytes {
    Bytes::from(serde_json::json!({ "refreshToken": refresh_token }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_blanked() {
        let body = br#"{"ok":true,"data":{"accessToken":"a.b.c","refreshToken":"r123"}}"#;

        let TokenResponse::Issued { body, tokens } = take_tokens(body).unwrap() else {
            panic!("expected issued tokens");
        };

        assert_eq!(tokens.access_token, "a.b.c");
        assert_eq!(tokens.refresh_token, "r123");
        let rewritten: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            rewritten,
            serde_json::json!({"ok": true, "data": {"accessToken": "", "refreshToken": ""}})
        );
    }

    #[test]
    fn test_other_data_fields_survive() {
        let body = br#"{"ok":true,"data":{"accessToken":"a","refreshToken":"r","accountId":"x"}}"#;

        let TokenResponse::Issued { body, .. } = take_tokens(body).unwrap() else {
            panic!("expected issued tokens");
        };

        let rewritten: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(rewritten["data"]["accountId"], "x");
    }

    #[test]
    fn test_error_envelope_passes_through() {
        let body = br#"{"ok":false,"error":{"code":"SIGN_IN_INCORRECT_PASSWORD"}}"#;
        assert_eq!(
            take_tokens(body).unwrap(),
            TokenResponse::Failed(Bytes::from_static(body))
        );
    }

    #[test]
    fn test_malformed_responses() {
        assert!(take_tokens(b"<html>").is_err());
        assert!(take_tokens(br#"{"data":{}}"#).is_err());
        assert!(take_tokens(br#"{"ok":true}"#).is_err());
        assert!(take_tokens(br#"{"ok":true,"data":{"accessToken":"a"}}"#).is_err());
        assert!(take_tokens(br#"{"ok":true,"data":{"accessToken":1,"refreshToken":"r"}}"#).is_err());
    }

    #[test]
    fn test_unsafe_token_is_malformed() {
        let body = br#"{"ok":true,"data":{"accessToken":"a; Domain=evil","refreshToken":"r"}}"#;
        assert!(matches!(take_tokens(body), Err(ProxyError::Malformed(_))));
    }

    #[test]
    fn test_session_methods() {
        assert!(is_session_method(SIGN_IN));
        assert!(is_session_method(SIGN_UP));
        assert!(is_session_method(SIGN_OUT));
        assert!(!is_session_method("/account/getCurrentAccount"));
        assert!(!is_session_method("/account/refreshAccessToken"));
    }

    #[test]
    fn test_sign_out_body() {
        let body: Value = serde_json::from_slice(&sign_out_body("r123")).unwrap();
        assert_eq!(body, serde_json::json!({"refreshToken": "r123"}));
    }
}
