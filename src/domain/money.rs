//! Fixed-point currency type used throughout the handler chain.
//!
//! All arithmetic is exact except coinsurance rounding (banker's rounding at
//! two decimal places, see [`Money::round_from`]).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp(2))
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(Decimal::from(value))
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Subtracts `other` from `self`, clamping the result to zero.
    pub fn sub_clamped(self, other: Money) -> Money {
        if self.0 >= other.0 {
            Money(self.0 - other.0)
        } else {
            Money::ZERO
        }
    }

    /// `min(self, other)`.
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 { self } else { other }
    }

    /// Percentage of `self` by `pct` (0-100), banker's rounding to 2dp.
    pub fn percent_of(self, pct: Decimal) -> Money {
        let raw = self.0 * pct / Decimal::ONE_HUNDRED;
        Money(raw.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `min` over possibly-absent balances: returns the defined one, or `None` if
/// both are absent (spec: nil-aware min).
pub fn min_defined(a: Option<Money>, b: Option<Money>) -> Option<Money> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// `a ≤ 0` with absent values treated as "not ≤ 0" (spec numeric semantics).
pub fn le_zero(value: Option<Money>) -> bool {
    matches!(value, Some(v) if v.as_decimal() <= Decimal::ZERO)
}

/// `a > 0` with absent values treated as `false`.
pub fn gt_zero(value: Option<Money>) -> bool {
    matches!(value, Some(v) if v.is_positive())
}

/// Clamp-decrement an optional remaining balance by `amount`, leaving `None`
/// untouched (absent accumulators are never materialized).
pub fn decrement_optional(balance: Option<Money>, amount: Money) -> Option<Money> {
    balance.map(|b| b.sub_clamped(amount))
}
