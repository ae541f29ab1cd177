//! The per-request refresh decision.
//!
//! The proxy never verifies access tokens. It only peeks at the claimed
//! expiry to decide whether to swap the token for a fresh one before
//! forwarding. A forged expiry gains nothing: the upstream still verifies
//! whatever token is finally sent.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::jwt::decode_unverified;

/// Tokens expiring within this many seconds are refreshed before forwarding
/// so they cannot expire in flight.
pub const REFRESH_SKEW_SECS: u64 = 30;

/// What to do with an inbound request before forwarding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    /// Forward now, with this bearer token if any.
    Send { bearer: Option<&'a str> },
    /// Exchange the refresh token for a new access token first.
    Refresh { refresh_token: &'a str },
}

/// Whether an access token is missing, unreadable, or close enough to its
/// expiry that it should be replaced.
pub fn needs_refresh(access_token: Option<&str>, now: u64) -> bool {
    match access_token.and_then(decode_unverified) {
        Some(claims) => now >= claims.exp.saturating_sub(REFRESH_SKEW_SECS),
        None => true,
    }
}

/// Decide the next step from the session cookies.
///
/// Empty cookie values count as absent. Without a refresh token there is
/// nothing to refresh with, so whatever access token exists is forwarded
/// and the upstream decides.
pub fn decide<'a>(
    access_token: Option<&'a str>,
    refresh_token: Option<&'a str>,
    now: u64,
) -> Step<'a> {
    let access_token = access_token.filter(|t| !t.is_empty());
    let refresh_token = refresh_token.filter(|t| !t.is_empty());

    match refresh_token {
        Some(refresh_token) if needs_refresh(access_token, now) => Step::Refresh { refresh_token },
        _ => Step::Send {
            bearer: access_token,
        },
    }
}

/// Current Unix time in seconds. A clock before the epoch reads as zero,
/// which only ever makes tokens look fresher to the proxy.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
