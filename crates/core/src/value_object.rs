//! Value objects: equality by value, not identity.
//!
//! Value objects have **no identity**; they are defined entirely by their
//! attribute values. Two amounts of `100.00` are the same amount.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: no identity (`Amount` of 100 equals any other 100)
/// - **Entity**: has identity (two statements with the same id are the same statement)
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A strictly positive quantity of ledger currency units.
///
/// Construction is the only validation point: once an `Amount` exists it is
/// known to be `> 0`, so statements built from it never carry a zero or
/// negative amount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl ValueObject for Amount {}

impl Amount {
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "amount must be positive: {value}"
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::validation(format!("amount: {e}")))?;
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        assert!(matches!(Amount::new(dec!(0)), Err(DomainError::Validation(_))));
        assert!(matches!(Amount::new(dec!(-0.01)), Err(DomainError::Validation(_))));
    }

    #[test]
    fn parses_decimal_strings() {
        let amount: Amount = " 100.50 ".parse().unwrap();
        assert_eq!(amount.value(), dec!(100.5));
        assert!("abc".parse::<Amount>().is_err());
        assert!("-5".parse::<Amount>().is_err());
    }

    #[test]
    fn equal_by_value_regardless_of_scale() {
        assert_eq!(Amount::new(dec!(100)).unwrap(), Amount::new(dec!(100.00)).unwrap());
    }

    #[test]
    fn serde_rejects_non_positive_values() {
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
        let amount: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(amount.value(), dec!(12.5));
    }

    proptest! {
        #[test]
        fn positive_cents_always_construct(cents in 1i64..10_000_000_000i64) {
            let amount = Amount::new(Decimal::new(cents, 2)).unwrap();
            prop_assert!(amount.value() > Decimal::ZERO);
        }
    }
}
