//! Account entity and registration rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pocketledger_core::{AccountId, DomainError, Entity};

/// Request to open an account in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAccount {
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Account holder as seen by the ledger.
///
/// The ledger never mutates accounts. It checks existence by id and reads the
/// display name when wording transfer descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Validate a registration request and build the account.
    ///
    /// The email is trimmed and lower-cased so uniqueness checks compare
    /// normalized addresses.
    pub fn register(cmd: RegisterAccount) -> Result<Self, DomainError> {
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let email = normalize_email(&cmd.email);
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(DomainError::validation(format!(
                    "email is not valid: {}",
                    cmd.email
                )));
            }
        }

        Ok(Self {
            id: cmd.account_id,
            name: name.to_string(),
            email,
            created_at: cmd.occurred_at,
        })
    }

    pub fn id_typed(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(name: &str, email: &str) -> Result<Account, DomainError> {
        Account::register(RegisterAccount {
            account_id: AccountId::new(),
            name: name.to_string(),
            email: email.to_string(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn register_normalizes_name_and_email() {
        let account = register("  logan ", " Logan@Email.com ").unwrap();
        assert_eq!(account.name(), "logan");
        assert_eq!(account.email(), "logan@email.com");
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = register("   ", "gunner@email.com").unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("name")));
    }

    #[test]
    fn malformed_email_is_rejected() {
        for email in ["gunner", "@email.com", "gunner@", ""] {
            assert!(
                matches!(register("gunner", email), Err(DomainError::Validation(_))),
                "accepted {email:?}"
            );
        }
    }
}
