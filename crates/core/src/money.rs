//! Money as integer minor units.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Amount in the smallest currency unit (e.g. cents).
///
/// Two decimal places are exact, so sale totals and ledger sums never drift.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// `self × quantity`, `None` on overflow.
    pub fn checked_times(self, quantity: i64) -> Option<Self> {
        self.0.checked_mul(quantity).map(Self)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Apply a rate expressed in basis points (1/100 of a percent), rounding
    /// half away from zero to the nearest minor unit.
    ///
    /// `Money::from_cents(1000).apply_basis_points(1600) == Money::from_cents(160)`.
    pub fn apply_basis_points(self, bps: u32) -> Self {
        let scaled = i128::from(self.0) * i128::from(bps);
        let half = 5_000i128;
        let rounded = if scaled >= 0 {
            (scaled + half) / 10_000
        } else {
            (scaled - half) / 10_000
        };
        Self(rounded as i64)
    }

    /// Absolute difference in minor units.
    pub fn distance(self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_uses_two_decimal_places() {
        assert_eq!(Money::from_cents(15770).to_string(), "157.70");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1250).to_string(), "-12.50");
    }

    #[test]
    fn basis_points_round_half_away_from_zero() {
        // 16% of 13600 = 2176
        assert_eq!(Money::from_cents(13600).apply_basis_points(1600).cents(), 2176);
        // 16% of 1 cent = 0.16 → 0
        assert_eq!(Money::from_cents(1).apply_basis_points(1600).cents(), 0);
        // 50% of 1 cent = 0.5 → 1
        assert_eq!(Money::from_cents(1).apply_basis_points(5000).cents(), 1);
        assert_eq!(Money::from_cents(-1).apply_basis_points(5000).cents(), -1);
    }

    proptest! {
        #[test]
        fn basis_points_stay_within_half_a_cent(cents in 0i64..10_000_000, bps in 0u32..10_000) {
            let exact = cents as f64 * bps as f64 / 10_000.0;
            let got = Money::from_cents(cents).apply_basis_points(bps).cents() as f64;
            prop_assert!((got - exact).abs() <= 0.5 + 1e-9);
        }
    }
}
