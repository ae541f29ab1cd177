//! Request-scoped database contexts.
//!
//! A context owns exactly one checked-out connection for the duration of one
//! action. When the action returns, successfully or not, the context is
//! invalidated and the connection goes back to the pool. Contexts are cheap
//! handles, so the action can move them around freely; a handle that outlives
//! its action fails every query with [`DbError::Invalidated`] instead of
//! touching a connection that may already belong to another request.
//!
//! Queries on one context run strictly one after another.

use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use super::DbError;
use super::pool::{ConnectionPool, PooledConnection};
use super::query::SqlQuery;
use crate::id::AccountId;

struct Scope<C> {
    live: AtomicBool,
    connection: Mutex<Option<C>>,
}

/// Context for an unauthorized API request.
pub struct ContextUnauthorized<C> {
    scope: Arc<Scope<C>>,
}

impl<C> Clone for ContextUnauthorized<C> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
        }
    }
}

impl<C: PooledConnection> ContextUnauthorized<C> {
    fn new(connection: C) -> Self {
        Self {
            scope: Arc::new(Scope {
                live: AtomicBool::new(true),
                connection: Mutex::new(Some(connection)),
            }),
        }
    }

    /// Execute a parameterized query. The statement text is logged.
    pub async fn query(&self, query: SqlQuery) -> Result<Vec<C::Row>, DbError> {
        let mut guard = self.scope.connection.lock().await;
        let connection = match guard.as_mut() {
            Some(connection) if self.scope.live.load(Ordering::Acquire) => connection,
            _ => {
                error!(
                    statement = query.text(),
                    "query on an invalidated context; a context escaped its action"
                );
                return Err(DbError::Invalidated);
            }
        };
        debug!(statement = query.text(), "query");
        connection.query(&query).await
    }

    /// Whether this context can still be queried.
    pub fn is_live(&self) -> bool {
        self.scope.live.load(Ordering::Acquire)
    }
}

/// Context for an authorized API request.
///
/// Everything an unauthorized context can do, plus the authenticated account.
/// The connection has `connect.account_id` set for the length of the
/// transaction so row-level policies can see who is asking.
pub struct Context<C> {
    base: ContextUnauthorized<C>,
    account_id: AccountId,
}

impl<C> Clone for Context<C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            account_id: self.account_id.clone(),
        }
    }
}

impl<C> Context<C> {
    /// The id of the authenticated account.
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }
}

impl<C> Deref for Context<C> {
    type Target = ContextUnauthorized<C>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Invalidates a context when dropped. The normal path calls
/// [`ScopeGuard::finish`] to release the connection; the drop path covers
/// panics and cancelled futures, where the connection is dropped instead
/// (for Postgres that rolls the transaction back).
struct ScopeGuard<C: PooledConnection> {
    scope: Arc<Scope<C>>,
}

impl<C: PooledConnection> ScopeGuard<C> {
    async fn finish(self, commit: bool) -> Result<(), DbError> {
        self.scope.live.store(false, Ordering::Release);
        let connection = self.scope.connection.lock().await.take();
        match connection {
            Some(connection) => connection.release(commit).await,
            None => Ok(()),
        }
    }
}

impl<C: PooledConnection> Drop for ScopeGuard<C> {
    fn drop(&mut self) {
        self.scope.live.store(false, Ordering::Release);
        if let Ok(mut connection) = self.scope.connection.try_lock() {
            connection.take();
        }
    }
}

/// Run an action in an unauthorized context.
///
/// Returns whatever the action returned. The context is invalidated before
/// this function returns on every path.
pub async fn with_unauthorized<P, F, Fut, T, E>(pool: &P, action: F) -> Result<T, E>
where
    P: ConnectionPool,
    F: FnOnce(ContextUnauthorized<P::Connection>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    let connection = pool.checkout().await?;
    let ctx = ContextUnauthorized::new(connection);
    run_scoped(ctx.clone(), action(ctx)).await
}

/// Run an action in an authorized context for `account_id`.
///
/// The account id is spliced directly into a `SET LOCAL` statement, which
/// cannot take bind parameters, so it is checked to be a well-formed
/// identifier first. Anything else is a programmer error and never reaches
/// the database.
pub async fn with_authorized<P, F, Fut, T, E>(
    pool: &P,
    account_id: &AccountId,
    action: F,
) -> Result<T, E>
where
    P: ConnectionPool,
    F: FnOnce(Context<P::Connection>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    let Some(literal) = account_id.as_scoping_literal() else {
        error!(account_id = %account_id, "refusing to scope a context to a malformed account id");
        return Err(DbError::InvalidAccountId(account_id.as_str().to_string()).into());
    };
    let statement = format!("SET LOCAL connect.account_id = '{}'", literal);

    let mut connection = pool.checkout().await?;
    if let Err(e) = connection.execute_unlogged(&statement).await {
        if let Err(release_error) = connection.release(false).await {
            warn!(error = %release_error, "failed to release connection");
        }
        return Err(e.into());
    }

    let ctx = Context {
        base: ContextUnauthorized::new(connection),
        account_id: account_id.clone(),
    };
    run_scoped(ctx.base.clone(), action(ctx)).await
}

async fn run_scoped<C, Fut, T, E>(ctx: ContextUnauthorized<C>, action: Fut) -> Result<T, E>
where
    C: PooledConnection,
    Fut: Future<Output = Result<T, E>>,
    E: From<DbError>,
{
    let guard = ScopeGuard { scope: ctx.scope };
    let result = action.await;

    match result {
        Ok(value) => {
            guard.finish(true).await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(release_error) = guard.finish(false).await {
                warn!(error = %release_error, "failed to release connection after a failed action");
            }
            Err(e)
        }
    }
}
