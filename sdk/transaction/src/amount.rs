//! Monetary Amounts
//!
//! Signed 64-bit amounts in the smallest unit, range-checked against
//! `MAX_MONEY`. Negative amounts are legal only as value balances (net
//! flow out of the shielded pool); individual inputs and outputs are
//! non-negative.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest units per coin.
pub const COIN: i64 = 100_000_000;

/// Total monetary cap, in smallest units.
pub const MAX_MONEY: i64 = 200_000_000 * COIN;

/// Default transaction fee, in smallest units.
pub const DEFAULT_FEE: i64 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount {0} is outside the valid range")]
    OutOfRange(i64),

    #[error("amount arithmetic overflowed")]
    Overflow,
}

/// A checked monetary amount in `[-MAX_MONEY, MAX_MONEY]`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Construct from a signed raw value.
    pub fn from_raw(value: i64) -> Result<Self, AmountError> {
        if !(-MAX_MONEY..=MAX_MONEY).contains(&value) {
            return Err(AmountError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Construct from an unsigned raw value (inputs, outputs, fees).
    pub fn from_u64(value: u64) -> Result<Self, AmountError> {
        let signed = i64::try_from(value).map_err(|_| AmountError::Overflow)?;
        Self::from_raw(signed)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, AmountError> {
        let sum = self.0.checked_add(other.0).ok_or(AmountError::Overflow)?;
        Self::from_raw(sum)
    }

    pub fn checked_sub(self, other: Amount) -> Result<Amount, AmountError> {
        let diff = self.0.checked_sub(other.0).ok_or(AmountError::Overflow)?;
        Self::from_raw(diff)
    }

    /// The additive inverse. Always in range since the range is
    /// symmetric.
    pub fn negate(self) -> Amount {
        Amount(-self.0)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_enforced() {
        assert!(Amount::from_raw(MAX_MONEY).is_ok());
        assert!(Amount::from_raw(-MAX_MONEY).is_ok());
        assert_eq!(
            Amount::from_raw(MAX_MONEY + 1),
            Err(AmountError::OutOfRange(MAX_MONEY + 1))
        );
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::from_raw(40_000).unwrap();
        let b = Amount::from_raw(25_000).unwrap();
        assert_eq!(a.checked_sub(b).unwrap().raw(), 15_000);
        assert_eq!(a.checked_add(b).unwrap().raw(), 65_000);
    }

    #[test]
    fn test_overflow_caught() {
        let max = Amount::from_raw(MAX_MONEY).unwrap();
        assert!(max.checked_add(Amount::from_raw(1).unwrap()).is_err());
    }

    #[test]
    fn test_from_u64_rejects_huge() {
        assert!(Amount::from_u64(u64::MAX).is_err());
        assert_eq!(Amount::from_u64(10_000).unwrap().raw(), DEFAULT_FEE);
    }
}
