//! Balance derivation from statement history.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pocketledger_core::Amount;

use crate::statement::Statement;

/// An account's balance together with the history it was folded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub balance: Decimal,
    pub statements: Vec<Statement>,
}

impl Balance {
    /// Fold an account's ordered history into its current balance.
    ///
    /// Deposits and received transfers add, withdrawals subtract. An empty
    /// history yields zero.
    pub fn from_history(statements: Vec<Statement>) -> Self {
        let balance = statements
            .iter()
            .fold(Decimal::ZERO, |acc, s| acc + signed_amount(s));

        Self { balance, statements }
    }

    /// Stream version the balance was computed at (last sequence, 0 if empty).
    pub fn version(&self) -> u64 {
        self.statements.last().map(|s| s.sequence).unwrap_or(0)
    }

    /// Whether debiting `amount` keeps the balance non-negative.
    pub fn covers(&self, amount: Amount) -> bool {
        amount.value() <= self.balance
    }
}

/// Contribution of a single statement to its owner's balance.
pub fn signed_amount(statement: &Statement) -> Decimal {
    if statement.kind.is_credit() {
        statement.amount.value()
    } else {
        -statement.amount.value()
    }
}
