use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// A non-negative monetary magnitude. The sign of a statement amount lives in
/// [`crate::Direction`], never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    /// Keeps the full precision of the parsed value; only the sign is dropped.
    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(decimal.abs())
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::from(cents.unsigned_abs()) / Decimal::from(100))
    }

    /// Rounded to the nearest cent. Saturates at `i64::MAX` for magnitudes that
    /// do not fit, including those too large for `Decimal` once scaled.
    pub fn to_cents(self) -> i64 {
        self.0
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.round().to_i64())
            .unwrap_or(i64::MAX)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}
