use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use pocketledger_accounts::{Account, RegisterAccount, normalize_email};
use pocketledger_core::AccountId;

use super::{AccountDirectory, DirectoryError};

/// In-memory account directory for tests/dev.
///
/// Emails are unique after normalization (trimmed, lower-cased).
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new account with a fresh id.
    pub fn register(&self, name: &str, email: &str) -> Result<Account, DirectoryError> {
        let account = Account::register(RegisterAccount {
            account_id: AccountId::new(),
            name: name.to_string(),
            email: email.to_string(),
            occurred_at: Utc::now(),
        })?;

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;

        if accounts.values().any(|a| a.email() == account.email()) {
            return Err(DirectoryError::DuplicateEmail(normalize_email(email)));
        }

        accounts.insert(account.id_typed(), account.clone());
        tracing::debug!(account_id = %account.id_typed(), "account registered");
        Ok(account)
    }
}

#[async_trait::async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_by_id(&self, account_id: AccountId) -> Result<Option<Account>, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::Unavailable("lock poisoned".to_string()))?;
        Ok(accounts.get(&account_id).cloned())
    }
}
