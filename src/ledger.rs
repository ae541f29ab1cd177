//! Refresh token ledger.
//!
//! A refresh token is the long-lived, revocable anchor of a session. It maps
//! to the account it was issued for until it is explicitly revoked. Lookups
//! do not consume it; refresh tokens are not rotated on use.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::db::DbError;
use crate::id::{AccountId, Identifier};

/// Issues, resolves and revokes refresh tokens.
#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Mint a new refresh token bound to `account_id`.
    async fn issue(&self, account_id: &AccountId) -> Result<String, DbError>;

    /// The account a token was issued for, or `None` if the token is unknown
    /// or revoked. May be called any number of times.
    async fn resolve(&self, token: &str) -> Result<Option<AccountId>, DbError>;

    /// Revoke a token. Revoking an unknown token is not an error.
    async fn revoke(&self, token: &str) -> Result<(), DbError>;
}

/// In-memory ledger for tests and development runs.
#[derive(Default)]
pub struct MemoryRefreshTokens {
    tokens: Mutex<HashMap<String, AccountId>>,
}

impl MemoryRefreshTokens {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenLedger for MemoryRefreshTokens {
    async fn issue(&self, account_id: &AccountId) -> Result<String, DbError> {
        let token = Identifier::generate().to_string();
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), account_id.clone());
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<AccountId>, DbError> {
        Ok(self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned())
    }

    async fn revoke(&self, token: &str) -> Result<(), DbError> {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountId {
        Identifier::generate().into()
    }

    #[tokio::test]
    async fn test_resolve_is_non_consuming() {
        let ledger = MemoryRefreshTokens::new();
        let account = account();

        let token = ledger.issue(&account).await.unwrap();

        assert_eq!(ledger.resolve(&token).await.unwrap(), Some(account.clone()));
        assert_eq!(ledger.resolve(&token).await.unwrap(), Some(account.clone()));
        assert_eq!(ledger.resolve(&token).await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn test_revoke_is_permanent() {
        let ledger = MemoryRefreshTokens::new();
        let token = ledger.issue(&account()).await.unwrap();

        ledger.revoke(&token).await.unwrap();

        assert_eq!(ledger.resolve(&token).await.unwrap(), None);
        assert_eq!(ledger.resolve(&token).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let ledger = MemoryRefreshTokens::new();
        let token = ledger.issue(&account()).await.unwrap();

        ledger.revoke(&token).await.unwrap();
        ledger.revoke(&token).await.unwrap();
        ledger.revoke("never-issued").await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_only_affects_one_token() {
        let ledger = MemoryRefreshTokens::new();
        let account = account();
        let phone = ledger.issue(&account).await.unwrap();
        let laptop = ledger.issue(&account).await.unwrap();
        assert_ne!(phone, laptop);

        ledger.revoke(&phone).await.unwrap();

        assert_eq!(ledger.resolve(&phone).await.unwrap(), None);
        assert_eq!(ledger.resolve(&laptop).await.unwrap(), Some(account));
    }

    #[tokio::test]
    async fn test_unknown_token_resolves_to_none() {
        let ledger = MemoryRefreshTokens::new();
        assert_eq!(ledger.resolve("unknown").await.unwrap(), None);
    }
}
