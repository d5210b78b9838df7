//! Statements module (append-only movement log and balance derivation).
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod balance;
pub mod statement;
pub mod transfer;

pub use balance::{Balance, signed_amount};
pub use statement::{NewStatement, OperationType, Statement};
pub use transfer::{PlanTransfer, TransferPair};
