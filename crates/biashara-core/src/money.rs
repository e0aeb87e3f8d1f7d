//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    KSh 10.99 is stored as 1099                                          │
//! │    All arithmetic stays in integers end to end                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use biashara_core::money::Money;
//!
//! // Create from cents (preferred)
//! let price = Money::from_cents(10000); // KSh 100.00
//!
//! // Line total = unit price × quantity
//! let line_total = price * 2;
//! assert_eq!(line_total.cents(), 20000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for adjustments and refunds
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// Every monetary value in the system flows through this type:
/// `Product.price_cents`, `SaleItem.line_total_cents`, `Sale.amount_cents`,
/// and `Customer.total_purchases_cents`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use biashara_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // KSh 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (shillings) portion.
    #[inline]
    pub const fn shillings(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity, saturating on overflow.
    ///
    /// Line totals are quantity × unit price captured at sale time. The i128
    /// intermediate keeps large carts from wrapping.
    ///
    /// ## Example
    /// ```rust
    /// use biashara_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(10000); // KSh 100.00
    /// let line_total = unit_price.multiply_quantity(2);
    /// assert_eq!(line_total.cents(), 20000);
    /// ```
    pub fn multiply_quantity(&self, qty: i64) -> Self {
        let total = self.0 as i128 * qty as i128;
        if total > i64::MAX as i128 {
            Money(i64::MAX)
        } else if total < i64::MIN as i128 {
            Money(i64::MIN)
        } else {
            Money(total as i64)
        }
    }

    /// Returns the whole-unit amount the payment gateway expects.
    ///
    /// The provider takes integer shillings; fractional cents round up so a
    /// push never under-collects.
    #[inline]
    pub const fn to_whole_units(&self) -> i64 {
        (self.0 + 99) / 100
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// For logs and debugging; clients format amounts themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}KSh {}.{:02}",
            sign,
            self.shillings().abs(),
            self.cents_part()
        )
    }
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by i64 (for quantity calculations).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

/// Summation over line totals.
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
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.shillings(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "KSh 10.99");
        assert_eq!(format!("{}", Money::from_cents(25000)), "KSh 250.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-KSh 5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "KSh 0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        let result: Money = a * 3;
        assert_eq!(result.cents(), 3000);
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_cents(10000);
        let line_total = unit_price.multiply_quantity(2);
        assert_eq!(line_total.cents(), 20000);
    }

    #[test]
    fn test_multiply_quantity_saturates() {
        let huge = Money::from_cents(i64::MAX / 2);
        let total = huge.multiply_quantity(4);
        assert_eq!(total.cents(), i64::MAX);
    }

    #[test]
    fn test_sum_of_line_totals() {
        // qty 2 @ 100.00 + qty 1 @ 50.00 = 250.00
        let items = vec![
            Money::from_cents(10000).multiply_quantity(2),
            Money::from_cents(5000).multiply_quantity(1),
        ];
        let total: Money = items.into_iter().sum();
        assert_eq!(total.cents(), 25000);
    }

    #[test]
    fn test_to_whole_units() {
        assert_eq!(Money::from_cents(25000).to_whole_units(), 250);
        assert_eq!(Money::from_cents(25001).to_whole_units(), 251);
        assert_eq!(Money::from_cents(99).to_whole_units(), 1);
        assert_eq!(Money::from_cents(0).to_whole_units(), 0);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_cents(100);
        assert!(positive.is_positive());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
    }
}
