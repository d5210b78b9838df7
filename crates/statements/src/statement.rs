//! Ledger statements: the draft handed to a store and the recorded entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pocketledger_core::{AccountId, Amount, DomainError, Entity, StatementId};

/// Kind of monetary movement recorded by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Deposit,
    Withdraw,
    /// Credit on the receiving side of a transfer.
    Transfer,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Deposit => "deposit",
            OperationType::Withdraw => "withdraw",
            OperationType::Transfer => "transfer",
        }
    }

    /// Whether a statement of this kind adds to the account's balance.
    pub fn is_credit(&self) -> bool {
        !matches!(self, OperationType::Withdraw)
    }
}

impl core::fmt::Display for OperationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OperationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(OperationType::Deposit),
            "withdraw" => Ok(OperationType::Withdraw),
            "transfer" => Ok(OperationType::Transfer),
            other => Err(DomainError::validation(format!(
                "unknown operation type: {other}"
            ))),
        }
    }
}

/// A statement that has been validated but not yet recorded.
///
/// Stores turn a draft into a [`Statement`] by assigning the next sequence
/// number of the owning account's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStatement {
    id: StatementId,
    account_id: AccountId,
    kind: OperationType,
    sender_id: Option<AccountId>,
    amount: Amount,
    description: String,
    created_at: DateTime<Utc>,
}

impl NewStatement {
    pub fn deposit(account_id: AccountId, amount: Amount, description: &str) -> Self {
        Self::single(account_id, OperationType::Deposit, amount, description)
    }

    pub fn withdraw(account_id: AccountId, amount: Amount, description: &str) -> Self {
        Self::single(account_id, OperationType::Withdraw, amount, description)
    }

    /// Credit entry on `receiver_id` funded by `sender_id`.
    pub fn transfer_credit(
        receiver_id: AccountId,
        sender_id: AccountId,
        amount: Amount,
        description: &str,
    ) -> Self {
        Self {
            sender_id: Some(sender_id),
            ..Self::single(receiver_id, OperationType::Transfer, amount, description)
        }
    }

    fn single(account_id: AccountId, kind: OperationType, amount: Amount, description: &str) -> Self {
        Self {
            id: StatementId::new(),
            account_id,
            kind,
            sender_id: None,
            amount,
            description: description.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> StatementId {
        self.id
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn kind(&self) -> OperationType {
        self.kind
    }

    pub fn sender_id(&self) -> Option<AccountId> {
        self.sender_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Assign the stream position and freeze the draft.
    pub fn record(self, sequence: u64) -> Statement {
        Statement {
            id: self.id,
            account_id: self.account_id,
            sequence,
            kind: self.kind,
            sender_id: self.sender_id,
            amount: self.amount,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// Immutable record of one monetary movement against an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: StatementId,
    /// Account whose balance this entry affects.
    pub account_id: AccountId,
    /// Position in the account's stream (1-based, no gaps).
    pub sequence: u64,
    #[serde(rename = "type")]
    pub kind: OperationType,
    /// Funding account; only set on `Transfer` credits.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sender_id: Option<AccountId>,
    pub amount: Amount,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Statement {
    /// Whether `account_id` may see this statement: its owner, or the sender
    /// that funded a transfer credit.
    pub fn is_visible_to(&self, account_id: AccountId) -> bool {
        self.account_id == account_id || self.sender_id == Some(account_id)
    }
}

impl Entity for Statement {
    type Id = StatementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
