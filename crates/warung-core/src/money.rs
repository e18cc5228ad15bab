//! # Money Module
//!
//! Provides the `Money` type for prices, line totals and report figures.
//!
//! ## Whole Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The shop prices in Rupiah, which has no minor unit in practice.       │
//! │                                                                         │
//! │    Rp 12.000 × 3 = Rp 36.000     (i64 units, never floats)             │
//! │                                                                         │
//! │  Every stored price, total and report figure is a whole number of      │
//! │  currency units. Only Display adds grouping for humans.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole currency units.
///
/// Signed so that net figures (income minus expense) can go negative.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole units.
    ///
    /// ```rust
    /// use warung_core::money::Money;
    ///
    /// let price = Money::from_units(8_000);
    /// assert_eq!(price.units(), 8_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units)
    }

    /// Returns the value in whole units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, saturating at the `i64` bounds.
    ///
    /// ```rust
    /// use warung_core::money::Money;
    ///
    /// let line = Money::from_units(2_500).multiply_quantity(4);
    /// assert_eq!(line.units(), 10_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Overflow-checked multiplication, for totals built from untrusted input.
    #[inline]
    pub fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Overflow-checked addition.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Self> {
        self.0.checked_add(other.0).map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

// Operators saturate instead of panicking; use the checked_* methods where
// an exact figure is required.

/// Rupiah-style display: `Rp 1.250.000`, `-Rp 20.000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{}Rp {}", sign, grouped)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(0).to_string(), "Rp 0");
        assert_eq!(Money::from_units(500).to_string(), "Rp 500");
        assert_eq!(Money::from_units(50_000).to_string(), "Rp 50.000");
        assert_eq!(Money::from_units(1_250_000).to_string(), "Rp 1.250.000");
        assert_eq!(Money::from_units(-20_000).to_string(), "-Rp 20.000");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_units(50_000);
        let b = Money::from_units(20_000);

        assert_eq!((a + b).units(), 70_000);
        assert_eq!((b - a).units(), -30_000);
        assert_eq!((a * 3).units(), 150_000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.units(), 90_000);
    }

    #[test]
    fn test_checked_overflow() {
        let huge = Money::from_units(i64::MAX / 2 + 1);
        assert!(huge.checked_multiply_quantity(2).is_none());
        assert!(huge.checked_add(huge).is_none());
        assert_eq!(
            Money::from_units(3).checked_multiply_quantity(4),
            Some(Money::from_units(12))
        );
    }

    #[test]
    fn test_operators_saturate() {
        let max = Money::from_units(i64::MAX);
        assert_eq!(Money::from_units(i64::MAX / 2).multiply_quantity(3), max);
        assert_eq!(max + Money::from_units(1), max);
        assert_eq!(Money::from_units(i64::MIN) - Money::from_units(1), Money::from_units(i64::MIN));

        let total: Money = [max, max, Money::from_units(5)].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn test_sign_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_units(1).is_positive());
        assert!(Money::from_units(-1).is_negative());
    }

    #[test]
    fn test_serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::from_units(12_000)).unwrap();
        assert_eq!(json, "12000");
    }
}
