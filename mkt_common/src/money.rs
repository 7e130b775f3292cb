use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money       -----------------------------------------------------------
/// A monetary amount, in integer cents.
///
/// All arithmetic is exact. Summing offer costs during a merge, or adjusting collateral, must never lose precision,
/// so floating point representations are not used anywhere in the engine.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as Money: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Explicit sign handling: integer division would drop the sign for amounts between -1.00 and 0.
        let sign = if self.0 < 0 { "-" } else { "" };
        let units = (self.0 / 100).abs();
        let cents = (self.0 % 100).abs();
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sums_are_exact() {
        let costs = [Money::from(50_000), Money::from(70_001), Money::from(1)];
        let total: Money = costs.into_iter().sum();
        assert_eq!(total, Money::from(120_002));
    }

    #[test]
    fn display_is_in_units_and_cents() {
        assert_eq!(Money::from(120_050).to_string(), "1200.50");
        assert_eq!(Money::from(7).to_string(), "0.07");
        assert_eq!(Money::from_units(15).to_string(), "15.00");
    }

    #[test]
    fn display_keeps_the_sign_on_negative_amounts() {
        assert_eq!(Money::from(-50).to_string(), "-0.50");
        assert_eq!(Money::from(-120_050).to_string(), "-1200.50");
        assert_eq!((Money::from(100) - Money::from(175)).to_string(), "-0.75");
    }
}
