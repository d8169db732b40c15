//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Debt after three partial payments in floating point:                   │
//! │    100.0 - 33.3 - 33.3 - 33.4 = 1.4210854715202004e-14  ❌ NOT ZERO     │
//! │                                                                         │
//! │  An order whose remaining balance is "almost" zero never becomes       │
//! │  `paid`, and the customer's debt never clears.                         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10000 - 3330 - 3330 - 3340 = 0  ✓                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bazaar_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line_total = price * 2;          // $21.98
//! let total = line_total + Money::from_cents(500);
//! assert_eq!(total.cents(), 2698);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: debt deltas and negative per-line profit are legal
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as a bare integer**: `{"total": 10000}` on the wire
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price ──► OrderLine.unit_price ──► Order.total ──► Debt      │
/// │                                                     │                   │
/// │  Product.initial_price ──► Order.profit             ▼                   │
/// │                                │            Payment ──► amount_paid     │
/// │                                ▼                                        │
/// │                     ProfitReport (real / expected)                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// The sign of `major` applies to the whole amount.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Floors the value at zero.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-3000).floor_at_zero(), Money::zero());
    /// assert_eq!(Money::from_cents(700).floor_at_zero().cents(), 700);
    /// ```
    #[inline]
    pub const fn floor_at_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_multiply_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Subtracts `other`, returning `None` on overflow.
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `self × part / whole`, rounded half away from zero.
    ///
    /// Used to attribute an order's profit to its paid fraction. A
    /// non-positive `whole` yields zero (a zero-total order has a paid
    /// ratio of 0).
    ///
    /// ## Example
    /// ```rust
    /// use bazaar_core::money::Money;
    ///
    /// let profit = Money::from_cents(1000);
    /// // one third of $10.00 → $3.33
    /// let share = profit.split_by_ratio(Money::from_cents(1), Money::from_cents(3));
    /// assert_eq!(share.cents(), 333);
    /// ```
    pub fn split_by_ratio(&self, part: Money, whole: Money) -> Money {
        if whole.0 <= 0 {
            return Money::zero();
        }

        // i128 keeps `profit × amount_paid` from overflowing on large orders
        let numerator = self.0 as i128 * part.0 as i128;
        let whole = whole.0 as i128;
        let rounded = (numerator.abs() + whole / 2) / whole;
        let signed = if numerator < 0 { -rounded } else { rounded };

        Money::from_cents(signed as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// For logs and error messages. The shell formats amounts for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

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
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.checked_multiply_quantity(2).map(|m| m.cents()), Some(i64::MAX - 1));

        assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(
            Money::from_cents(1500).checked_add(Money::from_cents(500)),
            Some(Money::from_cents(2000))
        );
    }

    #[test]
    fn test_floor_at_zero() {
        assert_eq!(Money::from_cents(-1).floor_at_zero(), Money::zero());
        assert_eq!(Money::zero().floor_at_zero(), Money::zero());
        assert_eq!(Money::from_cents(42).floor_at_zero().cents(), 42);
    }

    #[test]
    fn test_split_by_ratio_exact() {
        // profit 40 on an order of 100 with 30 paid → 12 realized
        let profit = Money::from_cents(4000);
        let realized = profit.split_by_ratio(Money::from_cents(3000), Money::from_cents(10000));
        assert_eq!(realized.cents(), 1200);
        assert_eq!((profit - realized).cents(), 2800);
    }

    #[test]
    fn test_split_by_ratio_rounds_half_away_from_zero() {
        // 1 cent × 1/2 = 0.5 → 1
        let share = Money::from_cents(1).split_by_ratio(Money::from_cents(1), Money::from_cents(2));
        assert_eq!(share.cents(), 1);

        // negative profit (sold below cost) rounds symmetrically
        let share = Money::from_cents(-1).split_by_ratio(Money::from_cents(1), Money::from_cents(2));
        assert_eq!(share.cents(), -1);
    }

    #[test]
    fn test_split_by_ratio_zero_whole() {
        let share = Money::from_cents(4000).split_by_ratio(Money::zero(), Money::zero());
        assert!(share.is_zero());
    }

    /// $100.00 paid in three uneven partials clears to exactly zero.
    #[test]
    fn test_partial_payments_clear_exactly() {
        let mut remaining = Money::from_cents(10000);
        for cents in [3330, 3330, 3340] {
            remaining -= Money::from_cents(cents);
        }
        assert!(remaining.is_zero());
    }
}
