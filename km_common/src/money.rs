use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const QUOTE_CURRENCY_CODE: &str = "USD";
pub const QUOTE_CURRENCY_CODE_LOWER: &str = "usd";

//--------------------------------------      Money       ------------------------------------------------------------
/// An amount of quote currency, stored as an integer number of cents.
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
#[error("Value cannot be represented as a monetary amount: {0}")]
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
            Err(MoneyConversionError(format!("Value {value} is too large to convert to Money")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            let cents = value as i64;
            Ok(Self(cents))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

impl Money {
    /// The amount in cents.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::from_dollars(10);
        let b = Money::from(250);
        assert_eq!(a + b, Money::from(1250));
        assert_eq!(a - b, Money::from(750));
        assert_eq!(-b, Money::from(-250));
        assert_eq!(b * 4, Money::from_dollars(10));
        let mut c = a;
        c -= b;
        assert_eq!(c, Money::from(750));
        assert_eq!([a, b, b].into_iter().sum::<Money>(), Money::from(1500));
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_dollars(12).to_string(), "$12.00");
        assert_eq!(Money::from(1234).to_string(), "$12.34");
        assert_eq!(Money::from(5).to_string(), "$0.05");
        assert_eq!(Money::from(-305).to_string(), "-$3.05");
    }
}
