//! Line quantities.

use serde::Serialize;

use crate::error::{DomainError, DomainResult};

/// A strictly positive item count used on cart and order lines.
///
/// Construction rejects anything below 1 with [`DomainError::InvalidQuantity`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 1 {
            return Err(DomainError::InvalidQuantity(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Sum of two quantities; overflow is an invariant violation.
    pub fn checked_add(self, other: Quantity) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_are_rejected() {
        assert_eq!(Quantity::new(0), Err(DomainError::InvalidQuantity(0)));
        assert_eq!(Quantity::new(-3), Err(DomainError::InvalidQuantity(-3)));
    }

    #[test]
    fn one_is_the_smallest_quantity() {
        assert_eq!(Quantity::new(1).unwrap().get(), 1);
    }

    #[test]
    fn add_overflow_is_an_invariant_violation() {
        let max = Quantity::new(i64::MAX).unwrap();
        let err = max.checked_add(Quantity::new(1).unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn serializes_as_a_bare_integer() {
        assert_eq!(serde_json::to_string(&Quantity::new(4).unwrap()).unwrap(), "4");
    }
}
