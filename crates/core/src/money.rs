//! Monetary amounts in integer minor units.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::quantity::Quantity;

/// An amount of money in minor currency units (cents).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_minor(cents: u64) -> Self {
        Self(cents)
    }

    pub fn minor_units(self) -> u64 {
        self.0
    }

    /// Unit price multiplied by a line quantity.
    pub fn times(self, quantity: Quantity) -> DomainResult<Self> {
        let factor = u64::try_from(quantity.get())
            .map_err(|_| DomainError::invariant("quantity does not fit a price factor"))?;
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or_else(|| DomainError::invariant("line price overflow"))
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::invariant("amount overflow"))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_price_is_unit_price_times_quantity() {
        let price = Money::from_minor(10);
        let qty = Quantity::new(3).unwrap();
        assert_eq!(price.times(qty).unwrap(), Money::from_minor(30));
    }

    #[test]
    fn multiplication_overflow_is_reported() {
        let price = Money::from_minor(u64::MAX);
        let err = price.times(Quantity::new(2).unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn displays_major_and_minor_units() {
        assert_eq!(Money::from_minor(1234).to_string(), "12.34");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

            #[test]
            fn times_is_repeated_addition(cents in 0u64..1_000_000, qty in 1i64..500) {
                let price = Money::from_minor(cents);
                let mut acc = Money::zero();
                for _ in 0..qty {
                    acc = acc.checked_add(price).unwrap();
                }
                prop_assert_eq!(price.times(Quantity::new(qty).unwrap()).unwrap(), acc);
            }
        }
    }
}
