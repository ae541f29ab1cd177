use thiserror::Error;

use crate::id::{AccountId, Identifier};

/// Errors from the database layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// A context was used after the action it was scoped to returned.
    #[error("cannot query a context after it has been invalidated")]
    Invalidated,
    /// An account id that is not a well-formed identifier reached the
    /// account-scoping statement.
    #[error("account id {0:?} is not a well-formed identifier")]
    InvalidAccountId(String),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("unexpected row: {0}")]
    Decode(String),
}

impl DbError {
    /// True for defects in the calling code rather than runtime failures.
    /// These are never recovered from.
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, Self::Invalidated | Self::InvalidAccountId(_))
    }
}

/// Read an account id back out of a row. Stored ids were generated, so
/// anything that does not parse as an identifier is a corrupt row.
pub(crate) fn stored_account_id(raw: String) -> Result<AccountId, DbError> {
    Identifier::parse(&raw)
        .map(AccountId::from)
        .ok_or_else(|| DbError::Decode(format!("stored account id {raw:?} is not an identifier")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_account_id() {
        let id = Identifier::generate();
        assert_eq!(
            stored_account_id(id.to_string()).unwrap(),
            AccountId::from(id)
        );
        assert!(matches!(
            stored_account_id("not-an-id".to_string()),
            Err(DbError::Decode(_))
        ));
        assert!(!DbError::Decode(String::new()).is_programmer_error());
    }
}
