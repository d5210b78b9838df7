//! Domain foundation building blocks shared by the ledger crates.
//!
//! This crate contains **pure domain** primitives (no storage concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;
pub mod version;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AccountId, StatementId};
pub use value_object::{Amount, ValueObject};
pub use version::ExpectedVersion;
