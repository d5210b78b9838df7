//! Postgres-backed statement store implementation.
//!
//! Expects a `statements` table shaped as:
//!
//! ```sql
//! CREATE TABLE statements (
//!     id          UUID PRIMARY KEY,
//!     account_id  UUID NOT NULL,
//!     sequence    BIGINT NOT NULL CHECK (sequence > 0),
//!     type        TEXT NOT NULL,
//!     sender_id   UUID NULL,
//!     amount      NUMERIC NOT NULL CHECK (amount > 0),
//!     description TEXT NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL,
//!     UNIQUE (account_id, sequence)
//! );
//! ```
//!
//! Creating it is left to the deployment's migration tooling.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StatementStoreError | Scenario |
//! |------------|----------------------|---------------------|----------|
//! | Database (unique violation) | `23505` | `Concurrency` | Another transaction took the same `(account_id, sequence)` |
//! | Database (check violation) | `23514` | `InvalidAppend` | Row breaks a column constraint |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / other | N/A | `Backend` | Connection failures, closed pool |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use pocketledger_core::{AccountId, Amount, ExpectedVersion, StatementId};
use pocketledger_statements::{NewStatement, OperationType, Statement, TransferPair};

use super::r#trait::{
    StatementStore, StatementStoreError, check_version, validate_pair, validate_single,
};

/// Postgres-backed append-only statement store.
///
/// ## Optimistic Concurrency
///
/// Each append runs in a transaction that:
/// 1. Reads the stream version (`MAX(sequence)`) of the account
/// 2. Validates it against the expected version
/// 3. Inserts the statement at `version + 1`
///
/// If another transaction commits between steps 1 and 3, the unique constraint
/// on `(account_id, sequence)` rejects the insert and the append reports
/// `Concurrency`.
///
/// A transfer pair is inserted in one transaction, so the sender debit and the
/// receiver credit commit together or roll back together.
#[derive(Debug, Clone)]
pub struct PostgresStatementStore {
    pool: Arc<PgPool>,
}

impl PostgresStatementStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StatementStoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait::async_trait]
impl StatementStore for PostgresStatementStore {
    #[instrument(
        skip(self, statement),
        fields(
            account_id = %statement.account_id(),
            kind = %statement.kind(),
            expected_version = ?expected_version
        ),
        err
    )]
    async fn append(
        &self,
        statement: NewStatement,
        expected_version: ExpectedVersion,
    ) -> Result<Statement, StatementStoreError> {
        validate_single(&statement)?;

        let mut tx = self.begin().await?;

        let current = stream_version(&mut tx, statement.account_id()).await?;
        if let Err(conflict) = check_version(statement.account_id(), expected_version, current) {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(conflict);
        }

        let stored = insert_statement(&mut tx, statement, current + 1).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("sequence", stored.sequence);
        Ok(stored)
    }

    #[instrument(
        skip(self, pair),
        fields(
            sender_id = %pair.debit.account_id(),
            receiver_id = %pair.credit.account_id(),
            expected_sender_version = ?expected_sender_version
        ),
        err
    )]
    async fn append_transfer(
        &self,
        pair: TransferPair,
        expected_sender_version: ExpectedVersion,
    ) -> Result<(Statement, Statement), StatementStoreError> {
        validate_pair(&pair)?;
        let TransferPair { debit, credit } = pair;

        let mut tx = self.begin().await?;

        let sender_version = stream_version(&mut tx, debit.account_id()).await?;
        if let Err(conflict) =
            check_version(debit.account_id(), expected_sender_version, sender_version)
        {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(conflict);
        }

        // Dropping `tx` on an early return rolls back the debit.
        let debit = insert_statement(&mut tx, debit, sender_version + 1).await?;

        let receiver_version = stream_version(&mut tx, credit.account_id()).await?;
        let credit = insert_statement(&mut tx, credit, receiver_version + 1).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok((debit, credit))
    }

    #[instrument(skip(self), fields(account_id = %account_id), err)]
    async fn list_by_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Statement>, StatementStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, sequence, type, sender_id, amount, description, created_at
            FROM statements
            WHERE account_id = $1
            ORDER BY sequence ASC
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_account", e))?;

        let statements = rows
            .iter()
            .map(statement_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Span::current().record("statement_count", statements.len());
        Ok(statements)
    }

    #[instrument(skip(self), fields(account_id = %account_id, statement_id = %statement_id), err)]
    async fn find(
        &self,
        account_id: AccountId,
        statement_id: StatementId,
    ) -> Result<Option<Statement>, StatementStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, account_id, sequence, type, sender_id, amount, description, created_at
            FROM statements
            WHERE id = $1 AND (account_id = $2 OR sender_id = $2)
            "#,
        )
        .bind(statement_id.as_uuid())
        .bind(account_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_statement", e))?;

        row.as_ref().map(statement_from_row).transpose()
    }
}

/// Current version of an account stream (0 if it has no statements).
async fn stream_version(
    tx: &mut Transaction<'_, Postgres>,
    account_id: AccountId,
) -> Result<u64, StatementStoreError> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(MAX(sequence), 0)::BIGINT AS current_version
        FROM statements
        WHERE account_id = $1
        "#,
    )
    .bind(account_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("stream_version", e))?;

    let version: i64 = row
        .try_get("current_version")
        .map_err(|e| StatementStoreError::Backend(format!("failed to read current_version: {e}")))?;

    Ok(version as u64)
}

async fn insert_statement(
    tx: &mut Transaction<'_, Postgres>,
    draft: NewStatement,
    sequence: u64,
) -> Result<Statement, StatementStoreError> {
    sqlx::query(
        r#"
        INSERT INTO statements (
            id, account_id, sequence, type, sender_id, amount, description, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(draft.id().as_uuid())
    .bind(draft.account_id().as_uuid())
    .bind(sequence as i64)
    .bind(draft.kind().as_str())
    .bind(draft.sender_id().map(Uuid::from))
    .bind(draft.amount().value())
    .bind(draft.description())
    .bind(draft.created_at())
    .execute(&mut **tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            StatementStoreError::Concurrency(format!(
                "concurrent append detected: sequence {sequence} already exists for account {}",
                draft.account_id()
            ))
        } else {
            map_sqlx_error("insert_statement", e)
        }
    })?;

    Ok(draft.record(sequence))
}

fn statement_from_row(row: &sqlx::postgres::PgRow) -> Result<Statement, StatementStoreError> {
    let decode = |e: sqlx::Error| StatementStoreError::Backend(format!("failed to decode statement row: {e}"));

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let account_id: Uuid = row.try_get("account_id").map_err(decode)?;
    let sequence: i64 = row.try_get("sequence").map_err(decode)?;
    let kind: String = row.try_get("type").map_err(decode)?;
    let sender_id: Option<Uuid> = row.try_get("sender_id").map_err(decode)?;
    let amount: Decimal = row.try_get("amount").map_err(decode)?;
    let description: String = row.try_get("description").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    let corrupt = |e: pocketledger_core::DomainError| {
        StatementStoreError::Backend(format!("statement {id} is corrupt: {e}"))
    };

    Ok(Statement {
        id: StatementId::from_uuid(id),
        account_id: AccountId::from_uuid(account_id),
        sequence: sequence as u64,
        kind: kind.parse::<OperationType>().map_err(corrupt)?,
        sender_id: sender_id.map(AccountId::from_uuid),
        amount: Amount::new(amount).map_err(corrupt)?,
        description,
        created_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StatementStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StatementStoreError::Concurrency(msg),
                Some("23514") => StatementStoreError::InvalidAppend(msg),
                _ => StatementStoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StatementStoreError::Backend(format!("connection pool closed in {operation}"))
        }
        _ => StatementStoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
