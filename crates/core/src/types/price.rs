//! Monetary amounts in minor currency units.
//!
//! The payment gateway transmits amounts in the smallest currency unit
//! (kobo, cents), so that is the canonical representation everywhere: an
//! `i64` count of minor units. `rust_decimal` is used only at the edges,
//! for parsing admin input ("1250.00") and for display.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur constructing or combining a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is negative.
    #[error("price cannot be negative")]
    Negative,
    /// The amount does not fit in minor units.
    #[error("price out of range")]
    OutOfRange,
    /// Arithmetic overflowed.
    #[error("price arithmetic overflow")]
    Overflow,
}

/// An amount of money in minor currency units (e.g. kobo, cents).
///
/// Currency is fixed per deployment and carried in configuration, not on
/// every value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(i64);

impl Price {
    /// A zero amount.
    pub const ZERO: Self = Self(0);

    /// Create a price from a count of minor units.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `minor` is negative.
    pub const fn from_minor(minor: i64) -> Result<Self, PriceError> {
        if minor < 0 {
            return Err(PriceError::Negative);
        }
        Ok(Self(minor))
    }

    /// Create a price from a major-unit decimal (e.g. `"1250.50"`).
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or does not fit in an
    /// `i64` of minor units.
    pub fn from_major(major: Decimal) -> Result<Self, PriceError> {
        if major.is_sign_negative() {
            return Err(PriceError::Negative);
        }
        let minor = (major * Decimal::from(100))
            .round()
            .to_i64()
            .ok_or(PriceError::OutOfRange)?;
        Ok(Self(minor))
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }

    /// The amount as a major-unit decimal (two fractional digits).
    #[must_use]
    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Multiply by a quantity, e.g. to compute a line total.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` on arithmetic overflow.
    pub fn checked_mul(&self, quantity: i64) -> Result<Self, PriceError> {
        let total = self.0.checked_mul(quantity).ok_or(PriceError::Overflow)?;
        Self::from_minor(total)
    }

    /// Add another amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` on arithmetic overflow.
    pub fn checked_add(&self, other: Self) -> Result<Self, PriceError> {
        let total = self.0.checked_add(other.0).ok_or(PriceError::Overflow)?;
        Ok(Self(total))
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_from_minor_rejects_negative() {
        assert_eq!(Price::from_minor(-1), Err(PriceError::Negative));
        assert!(Price::from_minor(0).is_ok());
    }

    #[test]
    fn test_from_major_converts_to_minor() {
        let major = Decimal::from_str("1250.50").expect("decimal");
        let price = Price::from_major(major).expect("price");
        assert_eq!(price.minor_units(), 125_050);
    }

    #[test]
    fn test_from_major_rejects_negative() {
        let major = Decimal::from_str("-1.00").expect("decimal");
        assert_eq!(Price::from_major(major), Err(PriceError::Negative));
    }

    #[test]
    fn test_line_total() {
        let unit = Price::from_minor(500).expect("price");
        let line = unit.checked_mul(2).expect("total");
        assert_eq!(line.minor_units(), 1000);
    }

    #[test]
    fn test_overflow() {
        let unit = Price::from_minor(i64::MAX).expect("price");
        assert_eq!(unit.checked_mul(2), Err(PriceError::Overflow));
        assert_eq!(unit.checked_add(Price::from_minor(1).expect("price")), Err(PriceError::Overflow));
    }

    #[test]
    fn test_display_in_major_units() {
        let price = Price::from_minor(125_050).expect("price");
        assert_eq!(price.to_string(), "1250.50");
    }
}
