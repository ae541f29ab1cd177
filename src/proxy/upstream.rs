//! HTTP client for the upstream API.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode, header};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Request headers forwarded to the upstream. The body is re-sent from a
/// buffer, so the client computes `content-length` itself.
const FORWARDED_REQUEST_HEADERS: [header::HeaderName; 2] =
    [header::CONTENT_TYPE, header::ACCEPT_ENCODING];

const REFRESH_METHOD: &str = "/account/refreshAccessToken";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed upstream response: {0}")]
    Malformed(&'static str),
}

/// Result of asking the upstream for a new access token.
pub enum RefreshOutcome {
    Refreshed(String),
    /// The upstream answered with an error envelope. Carries its status and
    /// the envelope verbatim.
    Rejected(StatusCode, Bytes),
}

#[derive(Deserialize)]
struct RefreshEnvelope {
    ok: bool,
    data: Option<RefreshData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
}

/// One shared keep-alive client for every proxied request.
pub struct Upstream {
    client: reqwest::Client,
    base: String,
}

/// A request to forward.
pub struct Forward<'a> {
    pub method: &'a str,
    pub headers: &'a HeaderMap,
    pub body: Bytes,
    pub bearer: Option<&'a str>,
    /// Drop `accept-encoding` so the response body arrives uncompressed.
    pub identity_encoding: bool,
}

impl Upstream {
    /// `request_timeout` bounds each upstream call from send to the last
    /// byte of the response body.
    pub fn new(base: &Url, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .pool_max_idle_per_host(32)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}{}", self.base, method)
    }

    /// Forward a method call and return the upstream response unread.
    pub async fn forward(&self, request: Forward<'_>) -> Result<reqwest::Response, ProxyError> {
        let mut builder = self.client.post(self.url(request.method));

        for name in FORWARDED_REQUEST_HEADERS {
            if request.identity_encoding && name == header::ACCEPT_ENCODING {
                continue;
            }
            for value in request.headers.get_all(&name) {
                builder = builder.header(name.clone(), value.clone());
            }
        }
        if let Some(token) = request.bearer {
            builder = builder.bearer_auth(token);
        }

        Ok(builder.body(request.body).send().await?)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshOutcome, ProxyError> {
        let response = self
            .client
            .post(self.url(REFRESH_METHOD))
            .json(&serde_json::json!({ "refreshToken": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let envelope: RefreshEnvelope = serde_json::from_slice(&body)
            .map_err(|_| ProxyError::Malformed("refresh response is not an envelope"))?;

        if !envelope.ok {
            return Ok(RefreshOutcome::Rejected(status, body));
        }
        envelope
            .data
            .map(|data| RefreshOutcome::Refreshed(data.access_token))
            .ok_or(ProxyError::Malformed("refresh response has no data"))
    }
}
