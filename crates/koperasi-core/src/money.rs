//! # Money Module
//!
//! Provides the `Money` type for handling rupiah amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Rupiah                                           │
//! │    The rupiah has no minor unit in circulation, so every amount is     │
//! │    a whole number of rupiah held in an i64.                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use koperasi_core::money::Money;
//!
//! let price = Money::from_rupiah(15_000);
//! let line = price * 3_i64;
//! assert_eq!(line.rupiah(), 45_000);
//! assert_eq!(line.to_string(), "Rp 45.000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole rupiah.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for ledger effects and deltas
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Serializes as a bare number on the wire
///
/// ## Where Money is Used
/// ```text
/// Product.selling_price ──► CartLine.unit_price ──► line subtotal
///                                                      │
/// Cart subtotal − discount + tax ──► total ──► payment ──► change
///                                      │
///                                      └──► ledger CASH_IN (SALES)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole rupiah.
    #[inline]
    pub const fn from_rupiah(rupiah: i64) -> Self {
        Money(rupiah)
    }

    /// Returns the value in rupiah.
    #[inline]
    pub const fn rupiah(&self) -> i64 {
        self.0
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

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use koperasi_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupiah(-500).non_negative(), Money::zero());
    /// assert_eq!(Money::from_rupiah(500).non_negative().rupiah(), 500);
    /// ```
    #[inline]
    pub const fn non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Calculates tax at the given rate, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    ///
    /// ## Example
    /// ```rust
    /// use koperasi_core::money::Money;
    /// use koperasi_core::types::TaxRate;
    ///
    /// let amount = Money::from_rupiah(65_000);
    /// let tax = amount.calculate_tax(TaxRate::from_bps(1100)); // PPN 11%
    /// assert_eq!(tax.rupiah(), 7_150);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large totals from overflowing
        let tax = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_rupiah(tax as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Short label for chart axes and dashboard tiles.
    ///
    /// ```text
    /// 750_000        → "Rp 750 rb"
    /// 1_500_000      → "Rp 1,5 jt"
    /// 2_000_000_000  → "Rp 2 M"
    /// ```
    pub fn format_compact(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let value = self.0.unsigned_abs();

        let (scaled_tenths, suffix) = if value >= 1_000_000_000 {
            (value / 100_000_000, " M")
        } else if value >= 1_000_000 {
            (value / 100_000, " jt")
        } else if value >= 1_000 {
            (value / 100, " rb")
        } else {
            return format!("{}Rp {}", sign, value);
        };

        let whole = scaled_tenths / 10;
        let tenth = scaled_tenths % 10;
        if tenth == 0 {
            format!("{}Rp {}{}", sign, group_thousands(whole), suffix)
        } else {
            format!("{}Rp {},{}{}", sign, group_thousands(whole), tenth, suffix)
        }
    }
}

/// Formats an unsigned integer with `.` as the thousands separator.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display renders Indonesian rupiah notation: `Rp 1.250.000`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp {}", sign, group_thousands(self.0.unsigned_abs()))
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
        assert_eq!(Money::from_rupiah(65_000).to_string(), "Rp 65.000");
        assert_eq!(Money::from_rupiah(1_250_000).to_string(), "Rp 1.250.000");
        assert_eq!(Money::from_rupiah(500).to_string(), "Rp 500");
        assert_eq!(Money::from_rupiah(0).to_string(), "Rp 0");
        assert_eq!(Money::from_rupiah(-5_000).to_string(), "-Rp 5.000");
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(Money::from_rupiah(999).format_compact(), "Rp 999");
        assert_eq!(Money::from_rupiah(750_000).format_compact(), "Rp 750 rb");
        assert_eq!(Money::from_rupiah(1_500_000).format_compact(), "Rp 1,5 jt");
        assert_eq!(Money::from_rupiah(12_000_000).format_compact(), "Rp 12 jt");
        assert_eq!(Money::from_rupiah(2_000_000_000).format_compact(), "Rp 2 M");
        assert_eq!(Money::from_rupiah(-2_500).format_compact(), "-Rp 2,5 rb");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupiah(10_000);
        let b = Money::from_rupiah(5_000);

        assert_eq!((a + b).rupiah(), 15_000);
        assert_eq!((a - b).rupiah(), 5_000);
        assert_eq!((a * 3_i64).rupiah(), 30_000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.rupiah(), 20_000);
    }

    #[test]
    fn test_tax_calculation_rounds_half_up() {
        // 1_005 × 10% = 100.5 → 101
        let tax = Money::from_rupiah(1_005).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.rupiah(), 101);

        let none = Money::from_rupiah(65_000).calculate_tax(TaxRate::zero());
        assert!(none.is_zero());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_rupiah(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().rupiah(), 100);
        assert_eq!(negative.non_negative(), Money::zero());
    }
}
