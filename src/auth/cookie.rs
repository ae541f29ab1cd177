//! Token cookies.

use axum::http::header;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Token cookies live for 100 years. Session lifetime is governed by token
/// expiry and revocation, not by the cookie.
pub const TOKEN_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365 * 100;

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Whether `value` can be placed in a cookie verbatim (RFC 6265 cookie-octets).
pub fn is_cookie_safe(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E))
}

/// Attributes shared by both token cookies.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub path: String,
    pub secure: bool,
    pub max_age: u64,
}

impl CookieSettings {
    /// Settings for cookies scoped to the proxy mount point.
    pub fn new(path: impl Into<String>, secure: bool) -> Self {
        Self {
            path: path.into(),
            secure,
            max_age: TOKEN_COOKIE_MAX_AGE,
        }
    }

    /// A `Set-Cookie` value storing `value` under `name`. The caller checks
    /// `value` with [`is_cookie_safe`] first.
    pub fn token_cookie(&self, name: &str, value: &str) -> String {
        self.format(name, value, self.max_age)
    }

    /// A `Set-Cookie` value deleting `name`.
    pub fn clear_cookie(&self, name: &str) -> String {
        self.format(name, "", 0)
    }

    fn format(&self, name: &str, value: &str, max_age: u64) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "{}={}; HttpOnly; SameSite=Strict; Path={}; Max-Age={}{}",
            name, value, self.path, max_age, secure
        )
    }
}
