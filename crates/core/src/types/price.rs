//! Type-safe price representation using decimal arithmetic.
//!
//! Template prices are stored by the backend as `numeric(10,2)` and travel as
//! decimal strings, never floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two decimal places.
    #[error("price must have at most 2 decimal places")]
    TooPrecise,
    /// The amount exceeds the largest accepted price.
    #[error("price must be at most {max}")]
    TooLarge {
        /// Maximum accepted amount.
        max: Decimal,
    },
}

/// A non-negative price in the store currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// A price of zero (free template).
    pub const FREE: Self = Self(Decimal::ZERO);

    /// Largest accepted price, `99999999.99` (fits `numeric(10,2)`).
    pub const MAX: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

    /// Create a validated price.
    ///
    /// # Errors
    ///
    /// Returns an error when the amount is negative, has more than two
    /// decimal places, or exceeds [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount > Self::MAX {
            return Err(PriceError::TooLarge { max: Self::MAX });
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or too large.
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, 2))
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the template is free.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.0.is_zero()
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("${:.2}", self.0)
    }

    /// Sum a sequence of prices.
    #[must_use]
    pub fn sum<'a>(prices: impl IntoIterator<Item = &'a Self>) -> Decimal {
        prices.into_iter().map(|p| p.0).sum()
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::FREE
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_price_validation() {
        assert!(Price::new(Decimal::from_str("19.99").unwrap()).is_ok());
        assert_eq!(
            Price::new(Decimal::from_str("-1").unwrap()),
            Err(PriceError::Negative)
        );
        assert_eq!(
            Price::new(Decimal::from_str("1.999").unwrap()),
            Err(PriceError::TooPrecise)
        );
        assert!(matches!(
            Price::new(Decimal::from_str("100000000").unwrap()),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_max_is_largest_numeric_10_2() {
        assert_eq!(Price::MAX, Decimal::from_str("99999999.99").unwrap());
        let price: Price = serde_json::from_str("\"99999999.99\"").unwrap();
        assert_eq!(price.amount(), Price::MAX);
        assert!(matches!(
            Price::new(Decimal::from_str("99999999.991").unwrap()),
            Err(PriceError::TooPrecise)
        ));
        assert!(matches!(
            Price::new(Decimal::from_str("100000000.00").unwrap()),
            Err(PriceError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_trailing_zeros_are_not_too_precise() {
        assert!(Price::new(Decimal::from_str("5.5000").unwrap()).is_ok());
    }

    #[test]
    fn test_display_and_free() {
        let price = Price::from_cents(2900).unwrap();
        assert_eq!(price.display(), "$29.00");
        assert!(!price.is_free());
        assert!(Price::FREE.is_free());
    }

    #[test]
    fn test_sum() {
        let prices = [Price::from_cents(1999).unwrap(), Price::from_cents(501).unwrap()];
        assert_eq!(Price::sum(&prices), Decimal::from_str("25.00").unwrap());
    }

    #[test]
    fn test_deserialize_from_backend_string() {
        let price: Price = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(price.amount(), Decimal::from_str("12.50").unwrap());
        assert!(serde_json::from_str::<Price>("\"-3\"").is_err());
    }
}
