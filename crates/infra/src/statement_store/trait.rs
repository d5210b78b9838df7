use std::sync::Arc;

use thiserror::Error;

use pocketledger_core::{AccountId, ExpectedVersion, StatementId};
use pocketledger_statements::{NewStatement, Statement, TransferPair};

/// Statement store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// ledger errors (missing accounts, insufficient funds).
#[derive(Debug, Error)]
pub enum StatementStoreError {
    /// The account stream moved past the expected version.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// The statement (or pair) breaks a store-level invariant.
    #[error("invalid append: {0}")]
    InvalidAppend(String),

    /// The backing storage failed or returned unreadable data.
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Append-only, per-account statement store.
///
/// Statements are organized into one **stream per account**. Within a stream,
/// statements carry monotonically increasing sequence numbers (1, 2, 3, ...)
/// and the stream's version is its last sequence number.
///
/// ## Append Semantics
///
/// - `append()` records a single `Deposit` or `Withdraw` after checking the
///   owner's stream against `expected_version`.
/// - `append_transfer()` records a sender debit and a receiver credit in one
///   atomic unit: both become visible or neither does. Only the sender's
///   stream is version-checked; a credit cannot invalidate a balance check.
///
/// Transfer credits are never appended on their own; a lone `Transfer`
/// statement is rejected with `InvalidAppend`.
///
/// ## Read Semantics
///
/// - `list_by_account()` returns a stream in sequence order, or an empty vector
///   when the account has no history.
/// - `find()` is scoped: a statement is returned only to its owner or, for a
///   transfer credit, to the sender that funded it.
#[async_trait::async_trait]
pub trait StatementStore: Send + Sync {
    async fn append(
        &self,
        statement: NewStatement,
        expected_version: ExpectedVersion,
    ) -> Result<Statement, StatementStoreError>;

    /// Atomically append a transfer's debit and credit.
    ///
    /// Returns `(debit, credit)` as recorded.
    async fn append_transfer(
        &self,
        pair: TransferPair,
        expected_sender_version: ExpectedVersion,
    ) -> Result<(Statement, Statement), StatementStoreError>;

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Statement>, StatementStoreError>;

    async fn find(
        &self,
        account_id: AccountId,
        statement_id: StatementId,
    ) -> Result<Option<Statement>, StatementStoreError>;
}

#[async_trait::async_trait]
impl<S> StatementStore for Arc<S>
where
    S: StatementStore + ?Sized,
{
    async fn append(
        &self,
        statement: NewStatement,
        expected_version: ExpectedVersion,
    ) -> Result<Statement, StatementStoreError> {
        (**self).append(statement, expected_version).await
    }

    async fn append_transfer(
        &self,
        pair: TransferPair,
        expected_sender_version: ExpectedVersion,
    ) -> Result<(Statement, Statement), StatementStoreError> {
        (**self).append_transfer(pair, expected_sender_version).await
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Statement>, StatementStoreError> {
        (**self).list_by_account(account_id).await
    }

    async fn find(
        &self,
        account_id: AccountId,
        statement_id: StatementId,
    ) -> Result<Option<Statement>, StatementStoreError> {
        (**self).find(account_id, statement_id).await
    }
}

/// Version check shared by every backend, reported against `account_id`.
pub(crate) fn check_version(
    account_id: AccountId,
    expected: ExpectedVersion,
    current: u64,
) -> Result<(), StatementStoreError> {
    expected
        .check(current)
        .map_err(|e| StatementStoreError::Concurrency(format!("account {account_id}: {e}")))
}

/// Shape checks shared by every backend before anything is written.
pub(crate) fn validate_single(statement: &NewStatement) -> Result<(), StatementStoreError> {
    if statement.sender_id().is_some() || !matches!(
        statement.kind(),
        pocketledger_statements::OperationType::Deposit
            | pocketledger_statements::OperationType::Withdraw
    ) {
        return Err(StatementStoreError::InvalidAppend(format!(
            "{} statements must be appended as part of a transfer",
            statement.kind()
        )));
    }
    Ok(())
}

pub(crate) fn validate_pair(pair: &TransferPair) -> Result<(), StatementStoreError> {
    use pocketledger_statements::OperationType;

    let TransferPair { debit, credit } = pair;
    if debit.kind() != OperationType::Withdraw || debit.sender_id().is_some() {
        return Err(StatementStoreError::InvalidAppend(
            "transfer debit must be a withdraw without sender".to_string(),
        ));
    }
    if credit.kind() != OperationType::Transfer {
        return Err(StatementStoreError::InvalidAppend(
            "transfer credit must be of type transfer".to_string(),
        ));
    }
    if credit.sender_id() != Some(debit.account_id()) {
        return Err(StatementStoreError::InvalidAppend(
            "transfer credit must name the debited account as sender".to_string(),
        ));
    }
    if credit.amount() != debit.amount() {
        return Err(StatementStoreError::InvalidAppend(format!(
            "transfer legs disagree on amount ({} vs {})",
            debit.amount(),
            credit.amount()
        )));
    }
    Ok(())
}
