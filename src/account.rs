//! Account storage contract.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use crate::db::DbError;
use crate::id::{AccountId, Identifier};

/// A stored account, including its password hash.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
}

/// What an account may see about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountProfile {
    pub id: AccountId,
    pub email: String,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account. Returns `None` when the email is already in use.
    async fn create(&self, email: &str, password_hash: &str)
    -> Result<Option<AccountId>, DbError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError>;

    /// Look up the profile of the authenticated account.
    async fn profile(&self, account_id: &AccountId) -> Result<Option<AccountProfile>, DbError>;
}

/// In-memory account store for tests and development runs.
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<AccountId>, DbError> {
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(email) {
            return Ok(None);
        }
        let id = AccountId::from(Identifier::generate());
        accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(Some(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DbError> {
        Ok(self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(email)
            .cloned())
    }

    async fn profile(&self, account_id: &AccountId) -> Result<Option<AccountProfile>, DbError> {
        Ok(self
            .accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|account| &account.id == account_id)
            .map(|account| AccountProfile {
                id: account.id.clone(),
                email: account.email.clone(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryAccounts::new();

        let id = store
            .create("alice@example.com", "hash")
            .await
            .unwrap()
            .unwrap();

        let account = store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.id, id);
        assert_eq!(account.password_hash, "hash");

        let profile = store.profile(&id).await.unwrap().unwrap();
        assert_eq!(profile.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let store = MemoryAccounts::new();

        assert!(store.create("alice@example.com", "a").await.unwrap().is_some());
        assert!(store.create("alice@example.com", "b").await.unwrap().is_none());
    }
}
