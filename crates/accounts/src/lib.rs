//! Account holders (identity collaborator model).
//!
//! Pure domain logic only: no IO, no credentials, no persistence concerns.

pub mod account;

pub use account::{Account, RegisterAccount, normalize_email};
