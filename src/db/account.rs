use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgRow};

use super::error::stored_account_id;
use super::{DbError, SqlQuery, with_authorized, with_unauthorized};
use crate::account::{Account, AccountProfile, AccountStore};
use crate::id::{AccountId, Identifier};

/// Account store backed by the `account` table.
pub struct PgAccounts {
    pool: PgPool,
}

impl PgAccounts {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, DbError> {
    Ok(Account {
        id: stored_account_id(row.try_get("id")?)?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
    })
}

#[async_trait]
impl AccountStore for PgAccounts {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<AccountId>, DbError> {
        let id = AccountId::from(Identifier::generate());
        let query = SqlQuery::new(
            "INSERT INTO account (id, email, password_hash) VALUES ($1, $2, $3)
             ON CONFLICT (email) DO NOTHING
             RETURNING id",
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash);

        with_unauthorized(&self.pool, |ctx| async move {
            let rows = ctx.query(query).await?;
            Ok(if rows.is_empty() { None } else { Some(id) })
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        let query =
            SqlQuery::new("SELECT id, email, password_hash FROM account WHERE email = $1")
                .bind(email);

        with_unauthorized(&self.pool, |ctx| async move {
            let rows = ctx.query(query).await?;
            rows.first().map(account_from_row).transpose()
        })
        .await
    }

    async fn profile(&self, account_id: &AccountId) -> Result<Option<AccountProfile>, DbError> {
        // The row is selected through the scoped setting, not a bind parameter,
        // so the lookup only ever sees the account the context belongs to.
        let query = SqlQuery::new(
            "SELECT id, email FROM account WHERE id = current_setting('connect.account_id')",
        );

        with_authorized(&self.pool, account_id, |ctx| async move {
            let rows = ctx.query(query).await?;
            let Some(row) = rows.first() else {
                return Ok(None);
            };
            let id: String = row.try_get("id")?;
            if id != ctx.account_id().as_str() {
                return Err(DbError::Decode(format!(
                    "scoped lookup returned account {id:?}"
                )));
            }
            Ok(Some(AccountProfile {
                id: stored_account_id(id)?,
                email: row.try_get("email")?,
            }))
        })
        .await
    }
}
