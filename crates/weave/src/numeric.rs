//! Arbitrary-precision-capable numeric sub-kinds for [`Value::Integer`](crate::value::Value::Integer)
//! and [`Value::Rational`](crate::value::Value::Rational).
//!
//! Both numeric tags have a machine-word fast path and a heap-backed
//! arbitrary-precision fallback, exactly as the data model's `NormalInteger
//! | BigInteger` sub-kind requires. Promotion from the fast path to the big
//! path happens automatically on overflow.

use std::{cmp::Ordering, fmt, rc::Rc};

use num_bigint::BigInt;
use num_rational::Ratio;
use num_traits::{Signed, ToPrimitive, Zero};

/// An integer, either machine-word or arbitrary precision.
#[derive(Debug, Clone)]
pub enum IntegerValue {
    Small(i64),
    Big(Rc<BigInt>),
}

impl IntegerValue {
    #[must_use]
    pub fn small(v: i64) -> Self {
        Self::Small(v)
    }

    #[must_use]
    pub fn big(v: BigInt) -> Self {
        // Demote back to a machine word when it fits; keeps printing and
        // comparisons on the fast path after arithmetic that happened to
        // shrink the magnitude (e.g. `big - big`).
        v.to_i64().map_or_else(|| Self::Big(Rc::new(v)), Self::Small)
    }

    #[must_use]
    pub fn to_big(&self) -> BigInt {
        match self {
            Self::Small(v) => BigInt::from(*v),
            Self::Big(v) => (**v).clone(),
        }
    }

    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Small(v) => *v as f64,
            Self::Big(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Small(v) => *v == 0,
            Self::Big(v) => v.is_zero(),
        }
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        match self {
            Self::Small(v) => *v < 0,
            Self::Big(v) => v.is_negative(),
        }
    }

    pub fn checked_add(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => match a.checked_add(*b) {
                Some(v) => Self::Small(v),
                None => Self::big(BigInt::from(*a) + BigInt::from(*b)),
            },
            _ => Self::big(self.to_big() + other.to_big()),
        }
    }

    pub fn checked_sub(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => match a.checked_sub(*b) {
                Some(v) => Self::Small(v),
                None => Self::big(BigInt::from(*a) - BigInt::from(*b)),
            },
            _ => Self::big(self.to_big() - other.to_big()),
        }
    }

    pub fn checked_mul(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => match a.checked_mul(*b) {
                Some(v) => Self::Small(v),
                None => Self::big(BigInt::from(*a) * BigInt::from(*b)),
            },
            _ => Self::big(self.to_big() * other.to_big()),
        }
    }

    pub fn negate(&self) -> Self {
        match self {
            Self::Small(v) => v.checked_neg().map_or_else(|| Self::big(-BigInt::from(*v)), Self::Small),
            Self::Big(v) => Self::big(-(**v).clone()),
        }
    }
}

impl PartialEq for IntegerValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => a == b,
            _ => self.to_big() == other.to_big(),
        }
    }
}
impl Eq for IntegerValue {}

impl PartialOrd for IntegerValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for IntegerValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => a.cmp(b),
            _ => self.to_big().cmp(&other.to_big()),
        }
    }
}

impl fmt::Display for IntegerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small(v) => write!(f, "{v}"),
            Self::Big(v) => write!(f, "{v}"),
        }
    }
}

/// A rational number, either machine-word or arbitrary precision.
#[derive(Debug, Clone)]
pub enum RationalValue {
    Small(Ratio<i64>),
    Big(Rc<Ratio<BigInt>>),
}

impl RationalValue {
    #[must_use]
    pub fn new(num: i64, den: i64) -> Self {
        Self::Small(Ratio::new(num, den))
    }

    #[must_use]
    pub fn to_big(&self) -> Ratio<BigInt> {
        match self {
            Self::Small(v) => Ratio::new(BigInt::from(*v.numer()), BigInt::from(*v.denom())),
            Self::Big(v) => (**v).clone(),
        }
    }

    #[must_use]
    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Small(v) => *v.numer() as f64 / *v.denom() as f64,
            Self::Big(v) => v.numer().to_f64().unwrap_or(f64::NAN) / v.denom().to_f64().unwrap_or(f64::NAN),
        }
    }
}

impl PartialEq for RationalValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => a == b,
            _ => self.to_big() == other.to_big(),
        }
    }
}
impl Eq for RationalValue {}

impl PartialOrd for RationalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for RationalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Small(a), Self::Small(b)) => a.cmp(b),
            _ => self.to_big().cmp(&other.to_big()),
        }
    }
}

impl fmt::Display for RationalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small(v) => write!(f, "{}/{}", v.numer(), v.denom()),
            Self::Big(v) => write!(f, "{}/{}", v.numer(), v.denom()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_add_promotes_on_overflow() {
        let a = IntegerValue::Small(i64::MAX);
        let b = IntegerValue::Small(1);
        match a.checked_add(&b) {
            IntegerValue::Big(v) => assert_eq!(*v, BigInt::from(i64::MAX) + 1),
            IntegerValue::Small(_) => panic!("expected promotion to BigInteger"),
        }
    }

    #[test]
    fn big_demotes_when_it_fits() {
        let v = IntegerValue::big(BigInt::from(42));
        assert!(matches!(v, IntegerValue::Small(42)));
    }

    #[test]
    fn equality_crosses_representation() {
        assert_eq!(IntegerValue::Small(42), IntegerValue::Big(Rc::new(BigInt::from(42))));
    }
}
