use std::collections::HashMap;
use std::sync::RwLock;

use pocketledger_core::{AccountId, ExpectedVersion, StatementId};
use pocketledger_statements::{NewStatement, Statement, TransferPair};

use super::r#trait::{
    StatementStore, StatementStoreError, check_version, validate_pair, validate_single,
};

#[derive(Debug, Default)]
struct Streams {
    by_account: HashMap<AccountId, Vec<Statement>>,
    /// statement id -> (owner, index in owner's stream)
    index: HashMap<StatementId, (AccountId, usize)>,
}

impl Streams {
    fn current_version(&self, account_id: AccountId) -> u64 {
        self.by_account
            .get(&account_id)
            .and_then(|s| s.last())
            .map(|s| s.sequence)
            .unwrap_or(0)
    }

    fn check(&self, account_id: AccountId, expected: ExpectedVersion) -> Result<(), StatementStoreError> {
        check_version(account_id, expected, self.current_version(account_id))
    }

    fn ensure_new_id(&self, id: StatementId) -> Result<(), StatementStoreError> {
        if self.index.contains_key(&id) {
            return Err(StatementStoreError::InvalidAppend(format!(
                "statement {id} already recorded"
            )));
        }
        Ok(())
    }

    /// Push without checks; callers validate first so a batch never half-applies.
    fn push(&mut self, draft: NewStatement) -> Statement {
        let account_id = draft.account_id();
        let next = self.current_version(account_id) + 1;
        let stored = draft.record(next);

        let stream = self.by_account.entry(account_id).or_default();
        self.index.insert(stored.id, (account_id, stream.len()));
        stream.push(stored.clone());
        stored
    }
}

/// In-memory append-only statement store.
///
/// Intended for tests/dev. A single lock guards every stream, so the version
/// check and the write of a transfer pair happen under one critical section.
#[derive(Debug, Default)]
pub struct InMemoryStatementStore {
    streams: RwLock<Streams>,
}

impl InMemoryStatementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StatementStoreError {
        StatementStoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl StatementStore for InMemoryStatementStore {
    async fn append(
        &self,
        statement: NewStatement,
        expected_version: ExpectedVersion,
    ) -> Result<Statement, StatementStoreError> {
        validate_single(&statement)?;

        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;
        streams.check(statement.account_id(), expected_version)?;
        streams.ensure_new_id(statement.id())?;

        Ok(streams.push(statement))
    }

    async fn append_transfer(
        &self,
        pair: TransferPair,
        expected_sender_version: ExpectedVersion,
    ) -> Result<(Statement, Statement), StatementStoreError> {
        validate_pair(&pair)?;

        let mut streams = self.streams.write().map_err(|_| Self::poisoned())?;
        streams.check(pair.debit.account_id(), expected_sender_version)?;
        streams.ensure_new_id(pair.debit.id())?;
        streams.ensure_new_id(pair.credit.id())?;
        if pair.debit.id() == pair.credit.id() {
            return Err(StatementStoreError::InvalidAppend(
                "transfer legs share a statement id".to_string(),
            ));
        }

        let debit = streams.push(pair.debit);
        let credit = streams.push(pair.credit);
        Ok((debit, credit))
    }

    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Statement>, StatementStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;
        Ok(streams.by_account.get(&account_id).cloned().unwrap_or_default())
    }

    async fn find(
        &self,
        account_id: AccountId,
        statement_id: StatementId,
    ) -> Result<Option<Statement>, StatementStoreError> {
        let streams = self.streams.read().map_err(|_| Self::poisoned())?;

        let found = streams
            .index
            .get(&statement_id)
            .and_then(|(owner, idx)| streams.by_account.get(owner)?.get(*idx))
            .filter(|s| s.is_visible_to(account_id))
            .cloned();

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketledger_core::Amount;
    use pocketledger_statements::{OperationType, PlanTransfer};
    use rust_decimal_macros::dec;

    fn amount(v: rust_decimal::Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    fn pair(sender: AccountId, receiver: AccountId, value: rust_decimal::Decimal) -> TransferPair {
        TransferPair::plan(PlanTransfer {
            sender_id: sender,
            receiver_id: receiver,
            receiver_name: "receiver",
            amount: amount(value),
            description: "test",
            debit_prefix: "Transfer to",
        })
    }

    #[tokio::test]
    async fn append_assigns_gapless_sequences_per_account() {
        let store = InMemoryStatementStore::new();
        let a = AccountId::new();
        let b = AccountId::new();

        let first = store
            .append(NewStatement::deposit(a, amount(dec!(10)), "one"), ExpectedVersion::Exact(0))
            .await
            .unwrap();
        let other = store
            .append(NewStatement::deposit(b, amount(dec!(10)), "other"), ExpectedVersion::Any)
            .await
            .unwrap();
        let second = store
            .append(NewStatement::withdraw(a, amount(dec!(5)), "two"), ExpectedVersion::Exact(1))
            .await
            .unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(other.sequence, 1);
        assert_eq!(second.sequence, 2);

        let stream = store.list_by_account(a).await.unwrap();
        assert_eq!(stream, vec![first, second]);
    }

    #[tokio::test]
    async fn stale_version_is_a_concurrency_error() {
        let store = InMemoryStatementStore::new();
        let a = AccountId::new();
        store
            .append(NewStatement::deposit(a, amount(dec!(10)), ""), ExpectedVersion::Any)
            .await
            .unwrap();

        let err = store
            .append(NewStatement::withdraw(a, amount(dec!(5)), ""), ExpectedVersion::Exact(0))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            StatementStoreError::Concurrency(msg)
                if msg.contains(&a.to_string()) && msg.contains("expected Exact(0), found 1")
        ));
        assert_eq!(store.list_by_account(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lone_transfer_credit_is_rejected() {
        let store = InMemoryStatementStore::new();
        let credit = NewStatement::transfer_credit(
            AccountId::new(),
            AccountId::new(),
            amount(dec!(1)),
            "",
        );

        let err = store.append(credit, ExpectedVersion::Any).await.unwrap_err();
        assert!(matches!(err, StatementStoreError::InvalidAppend(_)));
    }

    #[tokio::test]
    async fn transfer_pair_is_recorded_on_both_streams() {
        let store = InMemoryStatementStore::new();
        let sender = AccountId::new();
        let receiver = AccountId::new();

        let (debit, credit) = store
            .append_transfer(pair(sender, receiver, dec!(50)), ExpectedVersion::Exact(0))
            .await
            .unwrap();

        assert_eq!(debit.kind, OperationType::Withdraw);
        assert_eq!(debit.account_id, sender);
        assert_eq!(credit.kind, OperationType::Transfer);
        assert_eq!(credit.account_id, receiver);
        assert_eq!(store.list_by_account(sender).await.unwrap(), vec![debit]);
        assert_eq!(store.list_by_account(receiver).await.unwrap(), vec![credit]);
    }

    #[tokio::test]
    async fn failed_transfer_writes_neither_leg() {
        let store = InMemoryStatementStore::new();
        let sender = AccountId::new();
        let receiver = AccountId::new();

        let err = store
            .append_transfer(pair(sender, receiver, dec!(50)), ExpectedVersion::Exact(7))
            .await
            .unwrap_err();
        assert!(matches!(err, StatementStoreError::Concurrency(_)));

        let mut mismatched = pair(sender, receiver, dec!(50));
        mismatched.credit = NewStatement::transfer_credit(receiver, sender, amount(dec!(49)), "");
        let err = store
            .append_transfer(mismatched, ExpectedVersion::Any)
            .await
            .unwrap_err();
        assert!(matches!(err, StatementStoreError::InvalidAppend(_)));

        assert!(store.list_by_account(sender).await.unwrap().is_empty());
        assert!(store.list_by_account(receiver).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_is_scoped_to_owner_and_sender() {
        let store = InMemoryStatementStore::new();
        let sender = AccountId::new();
        let receiver = AccountId::new();
        let stranger = AccountId::new();

        let (debit, credit) = store
            .append_transfer(pair(sender, receiver, dec!(5)), ExpectedVersion::Any)
            .await
            .unwrap();

        assert_eq!(store.find(receiver, credit.id).await.unwrap(), Some(credit.clone()));
        assert_eq!(store.find(sender, credit.id).await.unwrap(), Some(credit.clone()));
        assert_eq!(store.find(stranger, credit.id).await.unwrap(), None);
        assert_eq!(store.find(receiver, debit.id).await.unwrap(), None);
        assert_eq!(store.find(sender, StatementId::new()).await.unwrap(), None);
    }
}
