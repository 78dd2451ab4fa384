//! Exact-decimal newtypes for prices and quantities.
//!
//! Both wrap [`rust_decimal::Decimal`] so money math never goes through
//! floating point, and the distinct types keep a price from being handed
//! where a quantity belongs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// An instrument price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Signed percentage distance from `other`, or `None` on a zero base.
    #[inline]
    pub fn pct_from(&self, other: Price) -> Option<Decimal> {
        if other.is_zero() {
            return None;
        }
        Some((self.0 - other.0) / other.0 * Decimal::from(100))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qty(pub Decimal);

impl Qty {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Notional value at `price`.
    #[inline]
    pub fn notional(&self, price: Price) -> Decimal {
        self.0 * price.0
    }
}

impl fmt::Display for Qty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Fill bookkeeping accumulates and subtracts quantities; prices are only
// ever compared or pushed through pct_from/notional, so Price carries no
// arithmetic of its own.
impl Add for Qty {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Qty {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn pct_from_is_signed() {
        let p1 = Price::new(dec!(100));
        let p2 = Price::new(dec!(110));

        assert_eq!(p2.pct_from(p1).unwrap(), dec!(10));
        assert!(p1.pct_from(p2).unwrap().is_sign_negative());
    }

    #[test]
    fn pct_from_zero_base_is_none() {
        let p = Price::new(dec!(50));
        assert!(p.pct_from(Price::ZERO).is_none());
    }

    #[test]
    fn notional_is_qty_times_price() {
        let qty = Qty::new(dec!(10));
        let price = Price::new(dec!(150.25));
        assert_eq!(qty.notional(price), dec!(1502.50));
    }

    #[test]
    fn qty_arithmetic_tracks_fills() {
        let total = Qty::new(dec!(100));
        let filled = Qty::new(dec!(37.5));

        assert_eq!(total - filled, Qty::new(dec!(62.5)));
        assert!((total - filled).is_positive());
        assert!((filled - filled).is_zero());
    }
}
