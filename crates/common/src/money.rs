//! Money in minor currency units.

use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Arithmetic saturates at the `i64` bounds instead of wrapping or
/// panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the whole-unit portion.
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        (self.cents.unsigned_abs() % 100) as i64
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents.saturating_mul(i64::from(quantity)),
        }
    }

    /// Applies a percentage markup, rounding half-up to the cent.
    ///
    /// `Money::from_cents(1000).with_markup(15)` is `$11.50`.
    pub fn with_markup(&self, percent: u32) -> Money {
        let scaled = i128::from(self.cents) * (100 + i128::from(percent));
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        let cents = i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX });
        Money { cents }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents.saturating_add(rhs.cents),
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents = self.cents.saturating_add(rhs.cents);
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_arithmetic_saturates() {
        let big = Money::from_cents(i64::MAX - 10);
        assert_eq!((big + Money::from_cents(100)).cents(), i64::MAX);

        let mut total = big;
        total += big;
        assert_eq!(total.cents(), i64::MAX);

        assert_eq!(Money::from_cents(i64::MAX / 2).multiply(u32::MAX).cents(), i64::MAX);
        assert_eq!(Money::from_cents(-5).multiply(u32::MAX).cents(), -5 * i64::from(u32::MAX));
        assert_eq!(Money::from_cents(i64::MAX).with_markup(50).cents(), i64::MAX);
        assert_eq!(Money::from_cents(i64::MIN).with_markup(50).cents(), i64::MIN);

        let subtotal: Money = [big, big, Money::from_cents(1)].into_iter().sum();
        assert_eq!(subtotal.cents(), i64::MAX);
        assert_eq!(Money::from_cents(i64::MIN).cents_part(), 8);
    }

    #[test]
    fn test_markup_rounds_half_up() {
        assert_eq!(Money::from_cents(1000).with_markup(15).cents(), 1150);
        assert_eq!(Money::from_cents(999).with_markup(0).cents(), 999);
        // 1250 * 1.1 = 1375.0
        assert_eq!(Money::from_cents(1250).with_markup(10).cents(), 1375);
        // 1005 * 1.05 = 1055.25 -> 1055
        assert_eq!(Money::from_cents(1005).with_markup(5).cents(), 1055);
        // 1010 * 1.05 = 1060.5 -> 1061
        assert_eq!(Money::from_cents(1010).with_markup(5).cents(), 1061);
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_cents).sum();
        assert_eq!(total.cents(), 355);
    }

    #[test]
    fn test_money_serializes_as_cents() {
        let json = serde_json::to_string(&Money::from_cents(499)).unwrap();
        assert_eq!(json, "499");
        let back: Money = serde_json::from_str("499").unwrap();
        assert_eq!(back, Money::from_cents(499));
    }
}
