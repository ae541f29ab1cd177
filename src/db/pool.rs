//! Connection checkout seam between request contexts and the driver.
//!
//! A request context is the only thing that leases connections. Postgres is
//! the production pool; anything else implementing these traits (tests use a
//! recording pool) gets the same context semantics.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Transaction};

use super::DbError;
use super::query::{SqlQuery, SqlValue};

/// A pool that hands out one connection per request context.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    type Connection: PooledConnection;

    /// Check out a connection. For transactional pools this begins the
    /// transaction the context runs in.
    async fn checkout(&self) -> Result<Self::Connection, DbError>;
}

/// One checked-out connection.
#[async_trait]
pub trait PooledConnection: Send + 'static {
    type Row: Send + 'static;

    /// Run a parameterized statement and return its rows.
    async fn query(&mut self, query: &SqlQuery) -> Result<Vec<Self::Row>, DbError>;

    /// Run a statement with no parameters and no logging.
    async fn execute_unlogged(&mut self, statement: &str) -> Result<(), DbError>;

    /// Hand the connection back. `commit` is false when the action failed.
    async fn release(self, commit: bool) -> Result<(), DbError>;
}

/// A Postgres connection leased for one request. The whole request runs in a
/// single transaction so `SET LOCAL` settings die with it.
pub struct PgLease {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ConnectionPool for PgPool {
    type Connection = PgLease;

    async fn checkout(&self) -> Result<PgLease, DbError> {
        Ok(PgLease {
            tx: self.begin().await?,
        })
    }
}

#[async_trait]
impl PooledConnection for PgLease {
    type Row = PgRow;

    async fn query(&mut self, query: &SqlQuery) -> Result<Vec<PgRow>, DbError> {
        let mut statement = sqlx::query(query.text());
        for value in query.params() {
            statement = match value {
                SqlValue::Null => statement.bind(None::<String>),
                SqlValue::Bool(b) => statement.bind(*b),
                SqlValue::Int(i) => statement.bind(*i),
                SqlValue::Text(s) => statement.bind(s.clone()),
            };
        }
        Ok(statement.fetch_all(&mut *self.tx).await?)
    }

    async fn execute_unlogged(&mut self, statement: &str) -> Result<(), DbError> {
        sqlx::Executor::execute(&mut *self.tx, sqlx::raw_sql(statement)).await?;
        Ok(())
    }

    async fn release(self, commit: bool) -> Result<(), DbError> {
        if commit {
            self.tx.commit().await?;
        } else {
            self.tx.rollback().await?;
        }
        Ok(())
    }
}
