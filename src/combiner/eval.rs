//! Interpreter for parsed combiner expressions.
//!
//! Every operation follows the missing-data algebra: sentinels substitute,
//! pass through or give way to the other operand. Results Python would
//! reject (division by zero, math domain errors, overflow) are errors here
//! instead of NaN or infinity.

use std::collections::HashMap;

use crate::error::{FuzzyError, Result};
use crate::nodata::Value;
use crate::ops::{gamma_op, AggregateOp};

use super::parser::{BinaryOp, Builtin, Node, UnaryOp};

pub fn evaluate(node: &Node, env: &HashMap<&str, Value>) -> Result<Value> {
    match node {
        Node::Number(n) => Ok(Value::Number(*n)),
        Node::Name(name) => env
            .get(name.as_str())
            .copied()
            .ok_or_else(|| FuzzyError::MissingValue(name.clone())),
        Node::Unary { op, operand } => {
            let v = evaluate(operand, env)?;
            Ok(match op {
                UnaryOp::Neg => -v,
                UnaryOp::Pos => v,
            })
        },
        Node::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, env)?;
            let rhs = evaluate(rhs, env)?;
            lhs.try_binary(rhs, |a, b| binary(*op, a, b))
        },
        Node::Call { func, args } => {
            let args = args.iter().map(|a| evaluate(a, env)).collect::<Result<Vec<_>>>()?;
            call(*func, &args)
        },
    }
}

fn arith(msg: &str) -> FuzzyError {
    FuzzyError::Arithmetic(msg.to_owned())
}

/// Rejects NaN, and infinity produced from finite operands.
fn checked(result: f64, operands: &[f64], msg: &str) -> Result<f64> {
    if result.is_nan() || (result.is_infinite() && operands.iter().all(|o| o.is_finite())) {
        return Err(arith(msg));
    }
    Ok(result)
}

fn binary(op: BinaryOp, a: f64, b: f64) -> Result<f64> {
    match op {
        BinaryOp::Add => checked(a + b, &[a, b], "invalid addition"),
        BinaryOp::Sub => checked(a - b, &[a, b], "invalid subtraction"),
        BinaryOp::Mul => checked(a * b, &[a, b], "invalid multiplication"),
        BinaryOp::Div => {
            if b == 0. {
                return Err(arith("float division by zero"));
            }
            checked(a / b, &[a, b], "invalid division")
        },
        BinaryOp::FloorDiv => {
            if b == 0. {
                return Err(arith("float floor division by zero"));
            }
            checked((a / b).floor(), &[a, b], "invalid floor division")
        },
        BinaryOp::Mod => {
            if b == 0. {
                return Err(arith("float modulo by zero"));
            }
            // Takes the sign of the divisor
            let r = a % b;
            let r = if r != 0. && (r < 0.) != (b < 0.) { r + b } else { r };
            checked(r, &[a, b], "invalid modulo")
        },
        BinaryOp::Pow => power(a, b),
    }
}

fn power(a: f64, b: f64) -> Result<f64> {
    if a == 0. && b < 0. {
        return Err(arith("0.0 cannot be raised to a negative power"));
    }
    if a < 0. && b.fract() != 0. && b.is_finite() {
        return Err(arith("negative number cannot be raised to a fractional power"));
    }
    checked(a.powf(b), &[a, b], "power result out of range")
}

fn domain(x: f64, ok: bool) -> Result<f64> {
    if ok {
        Ok(x)
    } else {
        Err(arith("math domain error"))
    }
}

fn unary(func: Builtin, x: f64) -> Result<f64> {
    let y = match func {
        Builtin::Abs => x.abs(),
        Builtin::Round => x.round_ties_even(),
        Builtin::Float => x,
        Builtin::Int | Builtin::Ceil | Builtin::Floor if !x.is_finite() => {
            return Err(arith("cannot convert a non-finite float to an integer"))
        },
        Builtin::Int => x.trunc(),
        Builtin::Ceil => x.ceil(),
        Builtin::Floor => x.floor(),
        Builtin::Acos => domain(x, (-1. ..=1.).contains(&x))?.acos(),
        Builtin::Asin => domain(x, (-1. ..=1.).contains(&x))?.asin(),
        Builtin::Acosh => domain(x, x >= 1.)?.acosh(),
        Builtin::Atanh => domain(x, x > -1. && x < 1.)?.atanh(),
        Builtin::Asinh => x.asinh(),
        Builtin::Atan => x.atan(),
        Builtin::Degrees => x.to_degrees(),
        Builtin::Radians => x.to_radians(),
        Builtin::Exp => x.exp(),
        Builtin::Log => domain(x, x > 0.)?.ln(),
        Builtin::Log2 => domain(x, x > 0.)?.log2(),
        Builtin::Log10 => domain(x, x > 0.)?.log10(),
        Builtin::Sin => domain(x, x.is_finite())?.sin(),
        Builtin::Sinh => x.sinh(),
        Builtin::Sqrt => domain(x, x >= 0.)?.sqrt(),
        Builtin::Tan => domain(x, x.is_finite())?.tan(),
        Builtin::Tanh => x.tanh(),
        _ => return Err(arith("not a single argument function")),
    };

    checked(y, &[x], "math range error")
}

fn call(func: Builtin, args: &[Value]) -> Result<Value> {
    match (func, args) {
        (Builtin::Max | Builtin::Min, _) if args.len() < 2 => Err(FuzzyError::Argument(format!(
            "{}() requires at least 2 arguments",
            func.name()
        ))),
        (Builtin::Max, _) => Value::max_of(args.iter().copied()).ok_or_else(|| arith("empty max")),
        (Builtin::Min, _) => Value::min_of(args.iter().copied()).ok_or_else(|| arith("empty min")),
        (Builtin::Sum, _) => AggregateOp::Sum.call(args),
        (Builtin::Product, _) => AggregateOp::Product.call(args),
        (Builtin::Gamma, [gamma, rest @ ..]) => gamma_op(*gamma, rest),
        (Builtin::Gamma, []) => Err(FuzzyError::Argument("gamma() requires a gamma value".to_owned())),
        (Builtin::CheckNoData, [val, if_missing, rest @ ..]) => Ok(if val.is_no_data() {
            *if_missing
        } else {
            rest.first().copied().unwrap_or(*val)
        }),
        (Builtin::Round, [x, digits]) => x.try_binary(*digits, |x, digits| {
            if digits.fract() != 0. {
                return Err(arith("round() digits must be an integer"));
            }
            let scale = 10f64.powi(digits as i32);
            checked((x * scale).round_ties_even() / scale, &[x], "round() result out of range")
        }),
        (Builtin::Log, [x, base]) => x.try_binary(*base, |x, base| {
            if x <= 0. || base <= 0. || base == 1. {
                return Err(arith("math domain error"));
            }
            checked(x.ln() / base.ln(), &[x, base], "math range error")
        }),
        (Builtin::Pow, [x, y]) => x.try_binary(*y, power),
        (Builtin::Atan2, [y, x]) => Ok(y.binary(*x, f64::atan2)),
        (_, [x]) => x.try_map(|x| unary(func, x)),
        _ => Err(FuzzyError::Argument(format!(
            "{}() called with {} arguments",
            func.name(),
            args.len()
        ))),
    }
}
