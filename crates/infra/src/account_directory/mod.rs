//! Read-only account lookups consumed by the ledger.
//!
//! The identity collaborator owns accounts. The ledger only needs to know
//! whether an id resolves and, for transfers, the receiver's display name.

pub mod in_memory;

pub use in_memory::InMemoryAccountDirectory;

use std::sync::Arc;

use thiserror::Error;

use pocketledger_accounts::Account;
use pocketledger_core::{AccountId, DomainError};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("email already registered: {0}")]
    DuplicateEmail(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("account directory unavailable: {0}")]
    Unavailable(String),
}

/// Account lookup boundary.
#[async_trait::async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>, DirectoryError>;
}

#[async_trait::async_trait]
impl<D> AccountDirectory for Arc<D>
where
    D: AccountDirectory + ?Sized,
{
    async fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>, DirectoryError> {
        (**self).find_by_id(account_id).await
    }
}
