use std::fmt;
use std::str::FromStr;

use num::Float;
use serde::{Deserialize, Serialize};

use crate::error::{FuzzyError, Result};
use crate::nodata::Value;

/// Binary connectives of the rule language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicOp {
    And,
    Or,
    Xor,
}

impl LogicOp {
    pub fn call(self, u: Value, v: Value) -> Value {
        match self {
            Self::And => Value::min_of([u, v]).unwrap_or(u),
            Self::Or => Value::max_of([u, v]).unwrap_or(u),
            Self::Xor => Self::And.call(not_op(Self::And.call(u, v)), Self::Or.call(u, v)),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        }
    }
}

/// `1 - v`. Sentinels that do not substitute pass through.
pub fn not_op(v: Value) -> Value {
    v.map(|x| 1. - x)
}

/// N-ary aggregations of the rule language. Both need at least two
/// arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateOp {
    /// Plain product.
    Product,
    /// Probabilistic OR: `1 - prod(1 - a)`.
    Sum,
}

impl AggregateOp {
    pub fn call(self, args: &[Value]) -> Result<Value> {
        if args.len() < 2 {
            return Err(FuzzyError::Argument(format!(
                "{} requires at least 2 arguments",
                self.keyword()
            )));
        }

        Ok(match self {
            Self::Product => product(args.iter().copied()),
            Self::Sum => 1. - product(args.iter().map(|a| 1. - *a)),
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Product => "PRODUCT",
            Self::Sum => "SUM",
        }
    }
}

fn product(args: impl IntoIterator<Item = Value>) -> Value {
    args.into_iter().fold(Value::Number(1.), |acc, a| acc * a)
}

/// `SUM(args)^gamma * PRODUCT(args)^(1 - gamma)`.
///
/// A missing gamma makes the whole result missing.
pub fn gamma_op(gamma: Value, args: &[Value]) -> Result<Value> {
    let gamma = match gamma {
        Value::Number(g) => g,
        Value::NoData(s) => match s.substitution() {
            Some(k) => k,
            None => return Ok(gamma),
        },
    };

    if args.len() < 2 {
        return Err(FuzzyError::Argument(
            "GAMMA requires at least 2 arguments after the gamma value.".to_owned(),
        ));
    }
    if !(0. ..=1.).contains(&gamma) {
        return Err(FuzzyError::Argument("Gamma value must be in the range [0,1]".to_owned()));
    }

    let sum = AggregateOp::Sum.call(args)?;
    let prod = AggregateOp::Product.call(args)?;

    Ok(sum.pow(gamma) * prod.pow(1. - gamma))
}

/// Method for defuzzificating an implication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefuzzificationOp {
    /// Center of gravity of the area under the curve
    #[default]
    Centroid,
    /// The x that splits the area under the curve in two equal halves
    Bisector,
    /// Smallest value for which the membership function is maximum
    SmallestOfMaximum,
    /// Largest value for which the membership function is maximum
    LargestOfMaximum,
    /// Mean of the smallest and largest values for which the membership
    /// function is maximum
    MeanOfMaximum,
}

impl DefuzzificationOp {
    pub const ALL: [DefuzzificationOp; 5] = [
        Self::Centroid,
        Self::Bisector,
        Self::SmallestOfMaximum,
        Self::LargestOfMaximum,
        Self::MeanOfMaximum,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Centroid => "centroid",
            Self::Bisector => "bisector",
            Self::SmallestOfMaximum => "smallest_of_maximum",
            Self::LargestOfMaximum => "largest_of_maximum",
            Self::MeanOfMaximum => "mean_of_maximum",
        }
    }

    /// Reduces evenly spaced samples to one x. `None` means the area under
    /// the samples is zero.
    pub fn call<F: Float>(self, universe: &[F], membership: &[F]) -> Result<Option<F>> {
        let n = universe.len().min(membership.len());
        if n == 0 {
            return Ok(None);
        }
        let (universe, membership) = (&universe[..n], &membership[..n]);

        match self {
            Self::Centroid => {
                let last = n - 1;
                let (mut area, mut moment) = (F::zero(), F::zero());

                // Simpson's rule
                for (i, (&x, &y)) in universe.iter().zip(membership).enumerate() {
                    let w = if i == 0 || i == last {
                        1.
                    } else if i % 2 == 1 {
                        4.
                    } else {
                        2.
                    };
                    let w = F::from(w).unwrap_or_else(F::one);
                    area = area + w * y;
                    moment = moment + w * x * y;
                }

                // The step / 3 coefficient cancels out of the ratio
                if area == F::zero() {
                    return Ok(None);
                }

                Ok(Some(moment / area))
            },
            Self::Bisector => {
                let mut forward = Vec::with_capacity(n);
                let mut acc = F::zero();
                for &y in membership {
                    acc = acc + y;
                    forward.push(acc);
                }
                let total = acc;

                if total == F::zero() {
                    return Ok(None);
                }

                let mut backward = vec![F::zero(); n];
                let mut acc = F::zero();
                for i in (0..n).rev() {
                    acc = acc + membership[i];
                    backward[i] = acc;
                }

                let mut last_diff = total + total;
                for i in 0..n {
                    let diff = (forward[i] - backward[i]).abs();
                    if diff == F::zero() {
                        return Ok(Some(universe[i]));
                    }
                    if last_diff < diff {
                        return Ok(Some(universe[i.saturating_sub(1)]));
                    }
                    last_diff = diff;
                }

                Err(FuzzyError::Computation("Bisect not found. Calculation failed.".to_owned()))
            },
            Self::SmallestOfMaximum | Self::LargestOfMaximum | Self::MeanOfMaximum => {
                let maximum = membership.iter().copied().fold(F::neg_infinity(), F::max);
                let mut at_max = universe
                    .iter()
                    .zip(membership)
                    .filter_map(|(&x, &y)| if y == maximum { Some(x) } else { None });

                let Some(first) = at_max.next() else {
                    return Ok(None);
                };
                let last = at_max.last().unwrap_or(first);

                Ok(Some(match self {
                    Self::SmallestOfMaximum => first,
                    Self::LargestOfMaximum => last,
                    _ => (first + last) / (F::one() + F::one()),
                }))
            },
        }
    }
}

impl fmt::Display for DefuzzificationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DefuzzificationOp {
    type Err = FuzzyError;

    fn from_str(s: &str) -> Result<Self> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "centroid" | "cog" => Self::Centroid,
            "bisector" | "boa" => Self::Bisector,
            "smallest_of_maximum" | "som" => Self::SmallestOfMaximum,
            "largest_of_maximum" | "lom" => Self::LargestOfMaximum,
            "mean_of_maximum" | "mom" => Self::MeanOfMaximum,
            _ => return Err(FuzzyError::UnknownDefuzzifier(s.to_owned())),
        };
        Ok(op)
    }
}
