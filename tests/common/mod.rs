#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Response, header};
use connect::account::MemoryAccounts;
use connect::api::ApiState;
use connect::db::{ConnectionPool, DbError, PooledConnection, SqlQuery, SqlValue};
use connect::id::Identifier;
use connect::jwt::{ACCESS_TOKEN_DURATION_SECS, AccessTokenData, JwtConfig};
use connect::ledger::MemoryRefreshTokens;
use serde_json::Value;

pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret";

/// A pool whose connections record every statement instead of running it.
/// Rows echo the bound parameters back.
#[derive(Clone, Default)]
pub struct RecordingPool {
    log: Arc<Mutex<Vec<String>>>,
    checkouts: Arc<AtomicUsize>,
    fail_on: Option<&'static str>,
}

impl RecordingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A pool whose connections fail any query with exactly this text.
    pub fn failing_on(statement: &'static str) -> Self {
        Self {
            fail_on: Some(statement),
            ..Self::default()
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn checkouts(&self) -> usize {
        self.checkouts.load(Ordering::SeqCst)
    }
}

pub struct RecordingConnection {
    log: Arc<Mutex<Vec<String>>>,
    fail_on: Option<&'static str>,
}

#[async_trait]
impl ConnectionPool for RecordingPool {
    type Connection = RecordingConnection;

    async fn checkout(&self) -> Result<RecordingConnection, DbError> {
        self.checkouts.fetch_add(1, Ordering::SeqCst);
        Ok(RecordingConnection {
            log: self.log.clone(),
            fail_on: self.fail_on,
        })
    }
}

#[async_trait]
impl PooledConnection for RecordingConnection {
    type Row = Vec<SqlValue>;

    async fn query(&mut self, query: &SqlQuery) -> Result<Vec<Vec<SqlValue>>, DbError> {
        self.log.lock().unwrap().push(query.text().to_string());
        if self.fail_on == Some(query.text()) {
            return Err(DbError::Decode("injected failure".into()));
        }
        Ok(vec![query.params().to_vec()])
    }

    async fn execute_unlogged(&mut self, statement: &str) -> Result<(), DbError> {
        self.log.lock().unwrap().push(statement.to_string());
        Ok(())
    }

    async fn release(self, commit: bool) -> Result<(), DbError> {
        let outcome = if commit { "COMMIT" } else { "ROLLBACK" };
        self.log.lock().unwrap().push(outcome.to_string());
        Ok(())
    }
}

/// API state over in-memory stores.
pub fn memory_api_state() -> ApiState {
    ApiState {
        jwt: Arc::new(JwtConfig::new(TEST_JWT_SECRET)),
        ledger: Arc::new(MemoryRefreshTokens::new()),
        accounts: Arc::new(MemoryAccounts::new()),
    }
}

pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// An access token for a fresh account whose expiry is `secs_left` seconds
/// from now (negative for already expired).
pub fn access_token_expiring_in(jwt: &JwtConfig, secs_left: i64) -> String {
    let issued_at = (now() as i64 + secs_left - ACCESS_TOKEN_DURATION_SECS as i64) as u64;
    jwt.generate_access_token_at(
        &AccessTokenData {
            account_id: Identifier::generate().into(),
        },
        issued_at,
    )
    .unwrap()
}

/// Spawn an app on a random loopback port.
pub async fn spawn(app: axum::Router) -> SocketAddr {
    let (_handle, addr) = connect::start_server(app, 0)
        .await
        .expect("Failed to start server");
    addr
}

/// Read a response body as JSON.
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Extract all Set-Cookie headers from a response.
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect()
}

/// The value a Set-Cookie header assigns to `name`.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';').unwrap_or((cookie.as_str(), ""));
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
