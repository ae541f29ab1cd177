//! Refresh token storage.
//!
//! Only refresh tokens are stored. Access tokens are stateless and short-lived
//! (one hour).

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgPool;

use super::error::stored_account_id;
use super::{DbError, SqlQuery, with_unauthorized};
use crate::id::{AccountId, Identifier};
use crate::ledger::RefreshTokenLedger;

/// Refresh token ledger backed by the `refresh_token` table.
pub struct PgRefreshTokens {
    pool: PgPool,
}

impl PgRefreshTokens {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenLedger for PgRefreshTokens {
    async fn issue(&self, account_id: &AccountId) -> Result<String, DbError> {
        let token = Identifier::generate().to_string();
        let query = SqlQuery::new("INSERT INTO refresh_token (token, account_id) VALUES ($1, $2)")
            .bind(token.as_str())
            .bind(account_id);

        with_unauthorized(&self.pool, |ctx| async move {
            ctx.query(query).await?;
            Ok::<_, DbError>(())
        })
        .await?;

        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<AccountId>, DbError> {
        let query =
            SqlQuery::new("SELECT account_id FROM refresh_token WHERE token = $1").bind(token);

        with_unauthorized(&self.pool, |ctx| async move {
            let rows = ctx.query(query).await?;
            match rows.first() {
                Some(row) => {
                    let account_id: String = row.try_get("account_id")?;
                    Ok(Some(stored_account_id(account_id)?))
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn revoke(&self, token: &str) -> Result<(), DbError> {
        let query = SqlQuery::new("DELETE FROM refresh_token WHERE token = $1").bind(token);

        with_unauthorized(&self.pool, |ctx| async move {
            ctx.query(query).await?;
            Ok(())
        })
        .await
    }
}
