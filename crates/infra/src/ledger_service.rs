//! Ledger operations (application-level orchestration).
//!
//! `LedgerService` composes an [`AccountDirectory`] and a [`StatementStore`]
//! into the four operations callers use: recording a deposit or withdrawal,
//! transferring between accounts, reading a balance, and looking up a single
//! statement.
//!
//! ## Balance-Checked Appends
//!
//! Withdrawals and transfers run this pipeline:
//!
//! ```text
//! validate amount (no IO)
//!   ↓
//! resolve account(s) in the directory
//!   ↓
//! load the debited account's stream → fold balance at version N
//!   ↓
//! check balance ≥ amount
//!   ↓
//! append with ExpectedVersion::Exact(N)   ── conflict ──→ reload and retry
//! ```
//!
//! The conditional append is what serializes concurrent debits on one account:
//! if another statement landed after the balance was read, the store rejects the
//! write and the check is re-run against the fresh history. Operations on
//! different accounts never contend.
//!
//! Deposits skip the balance check but go through the same retry: a backend
//! that assigns sequence numbers on insert can still reject a credit that
//! raced another write to the same stream.
//!
//! Only stream conflicts are retried. Every ledger failure (missing account,
//! insufficient funds) is returned before anything is written.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use pocketledger_core::{AccountId, Amount, ExpectedVersion, StatementId};
use pocketledger_statements::{
    Balance, NewStatement, OperationType, PlanTransfer, Statement, TransferPair,
};

use crate::account_directory::{AccountDirectory, DirectoryError};
use crate::config::LedgerConfig;
use crate::statement_store::{StatementStore, StatementStoreError};

/// Failure of a ledger operation.
///
/// Each variant maps to a stable [`code`](LedgerError::code) so transports can
/// render distinct responses without inspecting messages.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("amount must be positive: {0}")]
    InvalidAmount(Decimal),

    #[error("operation not allowed: {0}")]
    InvalidOperation(String),

    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("sender account not found: {0}")]
    SenderNotFound(AccountId),

    #[error("receiver account not found: {0}")]
    ReceiverNotFound(AccountId),

    #[error("cannot transfer from an account to itself: {0}")]
    SelfTransfer(AccountId),

    /// A withdrawal exceeds the account's balance.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Decimal, available: Decimal },

    /// A transfer exceeds the sender's balance.
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Decimal, available: Decimal },

    #[error("statement not found: {0}")]
    StatementNotFound(StatementId),

    /// The account stream kept moving for every allowed attempt.
    #[error("account stream kept changing; gave up after {attempts} attempts: {last}")]
    Conflict { attempts: u32, last: String },

    #[error(transparent)]
    Store(#[from] StatementStoreError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl LedgerError {
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidOperation(_) => "invalid_operation",
            LedgerError::AccountNotFound(_) => "account_not_found",
            LedgerError::SenderNotFound(_) => "sender_not_found",
            LedgerError::ReceiverNotFound(_) => "receiver_not_found",
            LedgerError::SelfTransfer(_) => "self_transfer",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::StatementNotFound(_) => "statement_not_found",
            LedgerError::Conflict { .. } => "conflict",
            LedgerError::Store(_) => "store_error",
            LedgerError::Directory(_) => "directory_error",
        }
    }
}

/// Outcome of one balance-checked append attempt.
enum Attempt<T> {
    Committed(T),
    Conflict(String),
}

/// Ledger transaction engine.
///
/// ## Generic Parameters
///
/// - `S`: statement store (in-memory for tests, Postgres in production)
/// - `D`: account directory provided by the identity collaborator
#[derive(Debug)]
pub struct LedgerService<S, D> {
    store: S,
    directory: D,
    config: LedgerConfig,
}

impl<S, D> LedgerService<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self::with_config(store, directory, LedgerConfig::default())
    }

    pub fn with_config(store: S, directory: D, config: LedgerConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

impl<S, D> LedgerService<S, D>
where
    S: StatementStore,
    D: AccountDirectory,
{
    /// Record a deposit or withdrawal against one account.
    ///
    /// `Transfer` is rejected here; credits only originate from
    /// [`create_transfer`](Self::create_transfer).
    #[instrument(
        skip(self, description),
        fields(account_id = %account_id, kind = %kind, amount = %amount),
        err
    )]
    pub async fn create_statement(
        &self,
        account_id: AccountId,
        kind: OperationType,
        amount: Decimal,
        description: &str,
    ) -> Result<Statement, LedgerError> {
        let amount = Amount::new(amount).map_err(|_| LedgerError::InvalidAmount(amount))?;
        if kind == OperationType::Transfer {
            return Err(LedgerError::InvalidOperation(
                "transfer credits are recorded through create_transfer".to_string(),
            ));
        }

        if self.directory.find_by_id(account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        let statement = match kind {
            OperationType::Withdraw => {
                let draft = NewStatement::withdraw(account_id, amount, description);
                self.retry_on_conflict(|| self.try_withdraw(draft.clone()))
                    .await?
            }
            _ => {
                let draft = NewStatement::deposit(account_id, amount, description);
                self.retry_on_conflict(|| self.append_once(draft.clone(), ExpectedVersion::Any))
                    .await?
            }
        };

        info!(
            statement_id = %statement.id,
            sequence = statement.sequence,
            "statement recorded"
        );
        Ok(statement)
    }

    /// Move `amount` from `sender_id` to `receiver_id`.
    ///
    /// Checks run in a fixed order: sender exists, receiver exists, sender is
    /// not the receiver, sender balance covers the amount. On success the
    /// sender debit and receiver credit are appended atomically and the
    /// receiver's credit is returned.
    #[instrument(
        skip(self, description),
        fields(sender_id = %sender_id, receiver_id = %receiver_id, amount = %amount),
        err
    )]
    pub async fn create_transfer(
        &self,
        sender_id: AccountId,
        receiver_id: AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<Statement, LedgerError> {
        let amount = Amount::new(amount).map_err(|_| LedgerError::InvalidAmount(amount))?;

        if self.directory.find_by_id(sender_id).await?.is_none() {
            return Err(LedgerError::SenderNotFound(sender_id));
        }
        let receiver = self
            .directory
            .find_by_id(receiver_id)
            .await?
            .ok_or(LedgerError::ReceiverNotFound(receiver_id))?;

        if sender_id == receiver_id {
            return Err(LedgerError::SelfTransfer(sender_id));
        }

        let pair = TransferPair::plan(PlanTransfer {
            sender_id,
            receiver_id,
            receiver_name: receiver.name(),
            amount,
            description,
            debit_prefix: &self.config.transfer_description_prefix,
        });

        let (debit, credit) = self
            .retry_on_conflict(|| self.try_transfer(pair.clone()))
            .await?;

        info!(
            debit_id = %debit.id,
            credit_id = %credit.id,
            "transfer recorded"
        );
        Ok(credit)
    }

    /// Current balance of `account_id` with the history it was derived from.
    ///
    /// Unknown accounts yield a zero balance over an empty history.
    #[instrument(skip(self), fields(account_id = %account_id), err)]
    pub async fn get_balance(&self, account_id: AccountId) -> Result<Balance, LedgerError> {
        self.load_balance(account_id).await
    }

    /// Fetch one statement visible to `account_id` (as owner or as the sender
    /// of a transfer credit).
    #[instrument(skip(self), fields(account_id = %account_id, statement_id = %statement_id), err)]
    pub async fn get_statement(
        &self,
        account_id: AccountId,
        statement_id: StatementId,
    ) -> Result<Statement, LedgerError> {
        if self.directory.find_by_id(account_id).await?.is_none() {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        self.store
            .find(account_id, statement_id)
            .await?
            .ok_or(LedgerError::StatementNotFound(statement_id))
    }

    async fn load_balance(&self, account_id: AccountId) -> Result<Balance, LedgerError> {
        let statements = self.store.list_by_account(account_id).await?;
        let balance = Balance::from_history(statements);
        debug!(
            account_id = %account_id,
            balance = %balance.balance,
            version = balance.version(),
            "balance computed"
        );
        Ok(balance)
    }

    async fn try_withdraw(&self, draft: NewStatement) -> Result<Attempt<Statement>, LedgerError> {
        let balance = self.load_balance(draft.account_id()).await?;
        if !balance.covers(draft.amount()) {
            return Err(LedgerError::InsufficientFunds {
                requested: draft.amount().value(),
                available: balance.balance,
            });
        }

        self.append_once(draft, ExpectedVersion::Exact(balance.version()))
            .await
    }

    /// Single append; a stream conflict is reported for the caller to retry.
    ///
    /// Credits use `ExpectedVersion::Any` but can still collide with a
    /// concurrent writer on the next sequence number.
    async fn append_once(
        &self,
        draft: NewStatement,
        expected: ExpectedVersion,
    ) -> Result<Attempt<Statement>, LedgerError> {
        match self.store.append(draft, expected).await {
            Ok(statement) => Ok(Attempt::Committed(statement)),
            Err(StatementStoreError::Concurrency(msg)) => Ok(Attempt::Conflict(msg)),
            Err(e) => Err(e.into()),
        }
    }

    async fn try_transfer(
        &self,
        pair: TransferPair,
    ) -> Result<Attempt<(Statement, Statement)>, LedgerError> {
        let balance = self.load_balance(pair.debit.account_id()).await?;
        if !balance.covers(pair.debit.amount()) {
            return Err(LedgerError::InsufficientBalance {
                requested: pair.debit.amount().value(),
                available: balance.balance,
            });
        }

        match self
            .store
            .append_transfer(pair, ExpectedVersion::Exact(balance.version()))
            .await
        {
            Ok(legs) => Ok(Attempt::Committed(legs)),
            Err(StatementStoreError::Concurrency(msg)) => Ok(Attempt::Conflict(msg)),
            Err(e) => Err(e.into()),
        }
    }

    async fn retry_on_conflict<T, F, Fut>(&self, mut attempt: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Attempt<T>, LedgerError>>,
    {
        let max = self.config.max_append_attempts.max(1);
        let mut last = String::new();

        for n in 1..=max {
            match attempt().await? {
                Attempt::Committed(value) => return Ok(value),
                Attempt::Conflict(msg) => {
                    warn!(attempt = n, max_attempts = max, reason = %msg, "stream conflict; re-checking balance");
                    last = msg;
                }
            }
        }

        Err(LedgerError::Conflict {
            attempts: max,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn error_codes_are_distinct() {
        let id = AccountId::new();
        let errors = [
            LedgerError::InvalidAmount(dec!(0)),
            LedgerError::InvalidOperation(String::new()),
            LedgerError::AccountNotFound(id),
            LedgerError::SenderNotFound(id),
            LedgerError::ReceiverNotFound(id),
            LedgerError::SelfTransfer(id),
            LedgerError::InsufficientFunds { requested: dec!(1), available: dec!(0) },
            LedgerError::InsufficientBalance { requested: dec!(1), available: dec!(0) },
            LedgerError::StatementNotFound(StatementId::new()),
            LedgerError::Conflict { attempts: 1, last: String::new() },
            LedgerError::Store(StatementStoreError::Backend(String::new())),
            LedgerError::Directory(DirectoryError::Unavailable(String::new())),
        ];

        let mut codes: Vec<_> = errors.iter().map(LedgerError::code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
