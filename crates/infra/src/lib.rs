//! Infrastructure layer: statement storage, account lookups, configuration,
//! and the ledger operations that compose them.

pub mod account_directory;
pub mod config;
pub mod ledger_service;
pub mod statement_store;


pub use account_directory::{AccountDirectory, DirectoryError, InMemoryAccountDirectory};
pub use config::LedgerConfig;
pub use ledger_service::{LedgerError, LedgerService};
pub use statement_store::{
    InMemoryStatementStore, PostgresStatementStore, StatementStore, StatementStoreError,
};
