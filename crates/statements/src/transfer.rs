//! Transfer planning: one logical movement, two statements.

use pocketledger_core::{AccountId, Amount};

use crate::statement::NewStatement;

/// Sender debit and receiver credit that must be recorded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPair {
    pub debit: NewStatement,
    pub credit: NewStatement,
}

/// Parameters of a transfer after existence checks have resolved the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanTransfer<'a> {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub receiver_name: &'a str,
    pub amount: Amount,
    pub description: &'a str,
    /// Leading words of the sender-side description, e.g. "Transfer to".
    pub debit_prefix: &'a str,
}

impl TransferPair {
    /// Build both legs.
    ///
    /// The debit is a `Withdraw` on the sender worded
    /// `"{prefix} {receiver}: {description}"`; the credit is a `Transfer` on the
    /// receiver carrying the caller's description verbatim.
    pub fn plan(plan: PlanTransfer<'_>) -> Self {
        let description = plan.description;
        let debit_description = format!(
            "{} {}: {}",
            plan.debit_prefix.trim(),
            plan.receiver_name,
            description
        );

        Self {
            debit: NewStatement::withdraw(plan.sender_id, plan.amount, &debit_description),
            credit: NewStatement::transfer_credit(
                plan.receiver_id,
                plan.sender_id,
                plan.amount,
                description,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::OperationType;
    use rust_decimal_macros::dec;

    #[test]
    fn plan_words_debit_with_receiver_name() {
        let sender = AccountId::new();
        let receiver = AccountId::new();
        let amount = Amount::new(dec!(50)).unwrap();

        let pair = TransferPair::plan(PlanTransfer {
            sender_id: sender,
            receiver_id: receiver,
            receiver_name: "carl",
            amount,
            description: "gift",
            debit_prefix: "Transfer to",
        });

        assert_eq!(pair.debit.account_id(), sender);
        assert_eq!(pair.debit.kind(), OperationType::Withdraw);
        assert_eq!(pair.debit.sender_id(), None);
        assert_eq!(pair.debit.description(), "Transfer to carl: gift");

        assert_eq!(pair.credit.account_id(), receiver);
        assert_eq!(pair.credit.kind(), OperationType::Transfer);
        assert_eq!(pair.credit.sender_id(), Some(sender));
        assert_eq!(pair.credit.description(), "gift");
        assert_eq!(pair.credit.amount(), amount);
        assert_ne!(pair.debit.id(), pair.credit.id());
    }

    #[test]
    fn credit_keeps_description_untouched() {
        let pair = TransferPair::plan(PlanTransfer {
            sender_id: AccountId::new(),
            receiver_id: AccountId::new(),
            receiver_name: "carl",
            amount: Amount::new(dec!(1)).unwrap(),
            description: "  gift  ",
            debit_prefix: "Transfer to",
        });

        assert_eq!(pair.credit.description(), "  gift  ");
        assert_eq!(pair.debit.description(), "Transfer to carl:   gift  ");
    }
}
