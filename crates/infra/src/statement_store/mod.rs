//! Append-only statement store boundary.
//!
//! This module defines the storage-facing abstraction for recording and
//! reading per-account statement streams without making storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStatementStore;
pub use postgres::PostgresStatementStore;
pub use r#trait::{StatementStore, StatementStoreError};
