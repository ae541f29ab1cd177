//! Browser-facing session proxy.
//!
//! Every `POST /api/<method>` is forwarded to `<upstream>/<method>`. Tokens
//! live only in `HttpOnly` cookies scoped to `/api`; the proxy turns them into
//! a bearer header, silently refreshes access tokens that are about to
//! expire, and strips raw tokens out of the bodies the browser sees.
//!
//! Cookies only ever ride on the final response, so a request abandoned
//! mid-refresh leaves the browser's cookies untouched.

mod intercept;
mod session;
mod upstream;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{debug, warn};
use url::Url;

use crate::api::ApiError;
use crate::auth::{ACCESS_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, get_cookie, is_cookie_safe};

pub use intercept::{IssuedTokens, TokenResponse, take_tokens};
pub use session::{REFRESH_SKEW_SECS, Step, decide, needs_refresh};
pub use upstream::{ProxyError, RefreshOutcome, Upstream};

/// Where the proxy is mounted. Token cookies are scoped to this path.
pub const MOUNT_PATH: &str = "/api";

/// Largest request body the proxy will buffer.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Default bound on a single upstream call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response headers passed back to the browser.
const FORWARDED_RESPONSE_HEADERS: [header::HeaderName; 3] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_ENCODING,
];

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub upstream: Url,
    pub secure_cookies: bool,
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct ProxyState {
    upstream: Arc<Upstream>,
    cookies: Arc<CookieSettings>,
}

/// Create the proxy router.
pub fn create_proxy_router(config: &ProxyConfig) -> Result<Router, reqwest::Error> {
    let state = ProxyState {
        upstream: Arc::new(Upstream::new(&config.upstream, config.request_timeout)?),
        cookies: Arc::new(CookieSettings::new(MOUNT_PATH, config.secure_cookies)),
    };

    Ok(Router::new()
        .route(&format!("{MOUNT_PATH}/{{*method}}"), post(proxy))
        .with_state(state))
}

async fn proxy(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    // The raw path, so percent-encoded characters reach the upstream as sent.
    let Some(method) = parts.uri.path().strip_prefix(MOUNT_PATH) else {
        return ApiError::bad_input().into_response();
    };

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            debug!(method, error = %e, "could not read request body");
            return ApiError::bad_input().into_response();
        }
    };

    match handle(&state, method, &parts.headers, body).await {
        Ok(response) => response,
        Err(e) => {
            warn!(method, error = %e, "proxied request failed");
            ApiError::unknown().into_response()
        }
    }
}

async fn handle(
    state: &ProxyState,
    method: &str,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let refresh_token = get_cookie(headers, REFRESH_COOKIE_NAME);
    let mut cookies = Vec::new();

    // Session methods never carry a bearer, so a dead session cookie must
    // not stand between the browser and signing in again.
    let step = if intercept::is_session_method(method) {
        Step::Send { bearer: None }
    } else {
        decide(
            get_cookie(headers, ACCESS_COOKIE_NAME),
            refresh_token,
            session::now(),
        )
    };

    let bearer = match step {
        Step::Send { bearer } => bearer.map(str::to_string),
        Step::Refresh { refresh_token } => match state.upstream.refresh(refresh_token).await? {
            RefreshOutcome::Refreshed(access_token) => {
                if !is_cookie_safe(&access_token) {
                    return Err(ProxyError::Malformed("refreshed token is not cookie-safe"));
                }
                debug!(method, "refreshed access token");
                cookies.push(state.cookies.token_cookie(ACCESS_COOKIE_NAME, &access_token));
                Some(access_token)
            }
            RefreshOutcome::Rejected(status, envelope) => {
                debug!(method, %status, "refresh rejected");
                return Ok(json_response(status, envelope, &cookies));
            }
        },
    };

    let body = match refresh_token.filter(|t| !t.is_empty()) {
        Some(refresh_token) if method == intercept::SIGN_OUT => intercept::sign_out_body(refresh_token),
        _ => body,
    };

    let returns_tokens = intercept::returns_tokens(method);
    let response = state
        .upstream
        .forward(upstream::Forward {
            method,
            headers,
            body,
            bearer: bearer.as_deref(),
            identity_encoding: returns_tokens,
        })
        .await?;

    if returns_tokens {
        let status = response.status();
        let body = response.bytes().await?;
        return Ok(match take_tokens(&body)? {
            TokenResponse::Failed(envelope) => json_response(status, envelope, &cookies),
            TokenResponse::Issued { body, tokens } => {
                cookies.push(
                    state
                        .cookies
                        .token_cookie(REFRESH_COOKIE_NAME, &tokens.refresh_token),
                );
                cookies.push(
                    state
                        .cookies
                        .token_cookie(ACCESS_COOKIE_NAME, &tokens.access_token),
                );
                json_response(StatusCode::OK, body, &cookies)
            }
        });
    }

    if method == intercept::SIGN_OUT && response.status().is_success() {
        cookies.push(state.cookies.clear_cookie(REFRESH_COOKIE_NAME));
        cookies.push(state.cookies.clear_cookie(ACCESS_COOKIE_NAME));
    }

    Ok(stream_response(response, &cookies))
}

/// Pipe an upstream response through without buffering it.
fn stream_response(upstream: reqwest::Response, cookies: &[String]) -> Response {
    let mut response = Response::builder().status(upstream.status());
    if let Some(headers) = response.headers_mut() {
        for name in FORWARDED_RESPONSE_HEADERS {
            for value in upstream.headers().get_all(&name) {
                headers.append(name.clone(), value.clone());
            }
        }
    }
    let body = Body::from_stream(upstream.bytes_stream());
    match response.body(body) {
        Ok(mut response) => {
            append_cookies(response.headers_mut(), cookies);
            response
        }
        Err(e) => {
            warn!(error = %e, "failed to build proxied response");
            ApiError::unknown().into_response()
        }
    }
}

fn json_response(status: StatusCode, body: Bytes, cookies: &[String]) -> Response {
    let mut response = (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response();
    append_cookies(response.headers_mut(), cookies);
    response
}

fn append_cookies(headers: &mut HeaderMap, cookies: &[String]) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}
