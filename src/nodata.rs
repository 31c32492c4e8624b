//! Missing-data values.
//!
//! A [`NoData`] sentinel is an ordinary value that flows through every
//! computation. How it behaves depends on its two settings:
//!
//! * `ignore`: binary operations return the other operand.
//! * `substitute`: the substitute takes the sentinel's place.
//! * neither: the sentinel propagates unchanged.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NoData {
    #[serde(default)]
    pub ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substitute: Option<f64>,
}

impl NoData {
    pub const PROPAGATE: NoData = NoData {
        ignore: false,
        substitute: None,
    };

    pub const IGNORE: NoData = NoData {
        ignore: true,
        substitute: None,
    };

    pub fn substitute(value: f64) -> Self {
        NoData {
            ignore: false,
            substitute: Some(value),
        }
    }

    /// The substitute, if this sentinel should be replaced by one.
    pub fn substitution(self) -> Option<f64> {
        if self.ignore {
            None
        } else {
            self.substitute
        }
    }

    pub fn propagates(self) -> bool {
        !self.ignore && self.substitute.is_none()
    }
}

impl fmt::Display for NoData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.ignore, self.substitute) {
            (true, _) => f.write_str("ignored"),
            (false, None) => f.write_str("no data"),
            (false, Some(k)) => write!(f, "{k}"),
        }
    }
}

/// A number or a missing-data sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    NoData(NoData),
}

impl Value {
    pub fn as_number(self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(v),
            Value::NoData(_) => None,
        }
    }

    pub fn is_no_data(self) -> bool {
        matches!(self, Value::NoData(_))
    }

    /// The number this value stands for, resolving a substituting sentinel.
    pub fn resolve(self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(v),
            Value::NoData(s) => s.substitution(),
        }
    }

    /// Applies a fallible binary operator under the sentinel rules.
    ///
    /// When both operands are sentinels the left one decides.
    pub fn try_binary(self, rhs: Value, op: impl Fn(f64, f64) -> Result<f64>) -> Result<Value> {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => op(a, b).map(Value::Number),
            (Value::NoData(s), other) => {
                if s.ignore {
                    Ok(other)
                } else if let Some(k) = s.substitute {
                    Value::Number(k).try_binary(other, op)
                } else {
                    Ok(self)
                }
            },
            (Value::Number(a), Value::NoData(s)) => {
                if s.ignore {
                    Ok(self)
                } else if let Some(k) = s.substitute {
                    op(a, k).map(Value::Number)
                } else {
                    Ok(rhs)
                }
            },
        }
    }

    pub fn binary(self, rhs: Value, op: impl Fn(f64, f64) -> f64) -> Value {
        match (self, rhs) {
            (Value::Number(a), Value::Number(b)) => Value::Number(op(a, b)),
            (Value::NoData(s), other) => {
                if s.ignore {
                    other
                } else if let Some(k) = s.substitute {
                    Value::Number(k).binary(other, op)
                } else {
                    self
                }
            },
            (Value::Number(a), Value::NoData(s)) => {
                if s.ignore {
                    self
                } else if let Some(k) = s.substitute {
                    Value::Number(op(a, k))
                } else {
                    rhs
                }
            },
        }
    }

    /// Applies a fallible unary operator. Only a substituting sentinel is
    /// transformed; any other sentinel passes through.
    pub fn try_map(self, op: impl FnOnce(f64) -> Result<f64>) -> Result<Value> {
        match self {
            Value::Number(v) => op(v).map(Value::Number),
            Value::NoData(s) => match s.substitution() {
                Some(k) => op(k).map(Value::Number),
                None => Ok(self),
            },
        }
    }

    pub fn map(self, op: impl FnOnce(f64) -> f64) -> Value {
        match self {
            Value::Number(v) => Value::Number(op(v)),
            Value::NoData(s) => match s.substitution() {
                Some(k) => Value::Number(op(k)),
                None => self,
            },
        }
    }

    pub fn pow(self, rhs: impl Into<Value>) -> Value {
        self.binary(rhs.into(), f64::powf)
    }

    pub fn abs(self) -> Value {
        self.map(f64::abs)
    }

    /// Sort key used when this value competes in a `min`.
    ///
    /// A propagating sentinel sorts first so it always wins, an ignored one
    /// sorts last so it never does.
    pub fn key_for_min(self) -> f64 {
        match self {
            Value::Number(v) => v,
            Value::NoData(s) if s.ignore => f64::INFINITY,
            Value::NoData(NoData { substitute: None, .. }) => f64::NEG_INFINITY,
            Value::NoData(NoData { substitute: Some(k), .. }) => k,
        }
    }

    /// Sort key used when this value competes in a `max`.
    pub fn key_for_max(self) -> f64 {
        match self {
            Value::Number(v) => v,
            Value::NoData(s) if s.ignore => f64::NEG_INFINITY,
            Value::NoData(NoData { substitute: None, .. }) => f64::INFINITY,
            Value::NoData(NoData { substitute: Some(k), .. }) => k,
        }
    }

    /// Sentinel-aware `min`. Ties keep the earliest value; a winning
    /// substituted sentinel resolves to its substitute.
    pub fn min_of(values: impl IntoIterator<Item = Value>) -> Option<Value> {
        select(values, Value::key_for_min, |key, best| key < best)
    }

    pub fn max_of(values: impl IntoIterator<Item = Value>) -> Option<Value> {
        select(values, Value::key_for_max, |key, best| key > best)
    }
}

fn select(
    values: impl IntoIterator<Item = Value>,
    key: fn(Value) -> f64,
    better: fn(f64, f64) -> bool,
) -> Option<Value> {
    let mut best: Option<(f64, Value)> = None;

    for value in values {
        let k = key(value);
        match best {
            Some((best_key, _)) if !better(k, best_key) => {},
            _ => best = Some((k, value)),
        }
    }

    best.map(|(_, value)| match value {
        Value::NoData(s) => s.substitution().map_or(value, Value::Number),
        number => number,
    })
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<NoData> for Value {
    fn from(s: NoData) -> Self {
        Value::NoData(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::NoData(s) => write!(f, "{s}"),
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Value {
            type Output = Value;

            fn $method(self, rhs: Value) -> Value {
                self.binary(rhs, |a, b| a $op b)
            }
        }

        impl $trait<f64> for Value {
            type Output = Value;

            fn $method(self, rhs: f64) -> Value {
                self.binary(Value::Number(rhs), |a, b| a $op b)
            }
        }

        impl $trait<Value> for f64 {
            type Output = Value;

            fn $method(self, rhs: Value) -> Value {
                Value::Number(self).binary(rhs, |a, b| a $op b)
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);
impl_binary_op!(Rem, rem, %);

impl Neg for Value {
    type Output = Value;

    fn neg(self) -> Value {
        self.map(|v| -v)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn ops() -> [fn(f64, f64) -> f64; 6] {
        [|a, b| a + b, |a, b| a - b, |a, b| a * b, |a, b| a / b, |a, b| a % b, f64::powf]
    }

    fn same(a: Value, b: Value) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }

    proptest! {
        #[test]
        fn ignored_sentinel_returns_other_operand(v in -1e6f64..1e6) {
            let s = Value::NoData(NoData::IGNORE);

            for op in ops() {
                prop_assert_eq!(s.binary(v.into(), op), Value::Number(v));
                prop_assert_eq!(Value::Number(v).binary(s, op), Value::Number(v));
            }
        }

        #[test]
        fn substituted_sentinel_acts_as_substitute(v in -1e6f64..1e6, k in -1e3f64..1e3) {
            let s = Value::NoData(NoData::substitute(k));

            for op in ops() {
                prop_assert!(same(s.binary(v.into(), op), Value::Number(op(k, v))));
                prop_assert!(same(Value::Number(v).binary(s, op), Value::Number(op(v, k))));
            }
        }

        #[test]
        fn plain_sentinel_propagates(v in -1e6f64..1e6) {
            let s = Value::NoData(NoData::PROPAGATE);

            for op in ops() {
                prop_assert_eq!(s.binary(v.into(), op), s);
                prop_assert_eq!(Value::Number(v).binary(s, op), s);
            }
            prop_assert_eq!(Value::min_of([v.into(), s]), Some(s));
            prop_assert_eq!(Value::max_of([s, v.into()]), Some(s));
        }
    }

    #[test]
    fn test_operator_traits() {
        let s = Value::NoData(NoData::substitute(2.));

        assert_eq!(s + 1., Value::Number(3.));
        assert_eq!(10. - s, Value::Number(8.));
        assert_eq!(-s, Value::Number(-2.));
        assert_eq!(s.pow(3.), Value::Number(8.));
        assert_eq!(Value::NoData(NoData::IGNORE) * 4., Value::Number(4.));
    }

    #[test]
    fn test_unary_ignored_sentinel_passes_through() {
        let s = Value::NoData(NoData {
            ignore: true,
            substitute: Some(5.),
        });

        assert_eq!(s.abs(), s);
        assert_eq!(-s, s);
    }

    #[test]
    fn test_min_max_keys() {
        let ignored = Value::NoData(NoData::IGNORE);
        let sub = Value::NoData(NoData::substitute(0.25));

        assert_eq!(Value::min_of([ignored, 0.7.into()]), Some(Value::Number(0.7)));
        assert_eq!(Value::max_of([ignored, 0.7.into()]), Some(Value::Number(0.7)));
        assert_eq!(Value::min_of([0.7.into(), sub]), Some(Value::Number(0.25)));
        assert_eq!(Value::max_of([0.7.into(), sub]), Some(Value::Number(0.7)));
        assert_eq!(Value::min_of([ignored, ignored]), Some(ignored));
        assert_eq!(Value::min_of([]), None);
    }
}
