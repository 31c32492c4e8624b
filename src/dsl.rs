use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{FuzzyError, Result};
use crate::inputs::Inputs;
use crate::nodata::Value;
use crate::ops::{gamma_op, not_op, AggregateOp, LogicOp};
use crate::variable::Variables;

/// Functions callable from rule text with a parenthesized argument list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Function {
    Sum,
    Product,
    Gamma,
}

impl Function {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "sum" => Some(Function::Sum),
            "product" => Some(Function::Product),
            "gamma" => Some(Function::Gamma),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Product => "PRODUCT",
            Function::Gamma => "GAMMA",
        }
    }

    fn call(self, args: &[Value]) -> Result<Value> {
        match self {
            Function::Sum => AggregateOp::Sum.call(args),
            Function::Product => AggregateOp::Product.call(args),
            Function::Gamma => match args.split_first() {
                Some((gamma, rest)) => gamma_op(*gamma, rest),
                None => Err(FuzzyError::Argument("GAMMA requires a gamma value".to_owned())),
            },
        }
    }
}

/// A compiled rule condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    Constant { value: f64 },
    /// `input IS membership`
    Is { input: String, membership: String },
    Not { operand: Box<Expr> },
    Logic { op: LogicOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    pub fn is(input: impl Into<String>, membership: impl Into<String>) -> Self {
        Expr::Is {
            input: input.into(),
            membership: membership.into(),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not { operand: Box::new(self) }
    }

    pub fn logic(self, op: LogicOp, rhs: Expr) -> Self {
        Expr::Logic {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    pub fn and(self, rhs: Expr) -> Self {
        self.logic(LogicOp::And, rhs)
    }

    pub fn or(self, rhs: Expr) -> Self {
        self.logic(LogicOp::Or, rhs)
    }

    /// Every `input IS membership` query in the tree, in evaluation order.
    pub fn queries(&self) -> Vec<(&str, &str)> {
        let mut queries = Vec::new();

        fn walk<'e>(expr: &'e Expr, out: &mut Vec<(&'e str, &'e str)>) {
            match expr {
                Expr::Constant { .. } => {},
                Expr::Is { input, membership } => out.push((input, membership)),
                Expr::Not { operand } => walk(operand, out),
                Expr::Logic { lhs, rhs, .. } => {
                    walk(lhs, out);
                    walk(rhs, out);
                },
                Expr::Call { args, .. } => {
                    for arg in args {
                        walk(arg, out);
                    }
                },
            }
        }

        walk(self, &mut queries);

        queries
    }

    /// Truth of the expression for one record of input values.
    pub fn evaluate(&self, inputs: &Variables, values: &Inputs) -> Result<Value> {
        match self {
            Expr::Constant { value } => Ok(Value::Number(*value)),
            Expr::Is { input, membership } => {
                let variable = inputs
                    .get(input)
                    .ok_or_else(|| FuzzyError::UnknownInput(input.clone()))?;

                variable.truth_for(values.require(input)?, membership)
            },
            Expr::Not { operand } => Ok(not_op(operand.evaluate(inputs, values)?)),
            Expr::Logic { op, lhs, rhs } => Ok(op.call(lhs.evaluate(inputs, values)?, rhs.evaluate(inputs, values)?)),
            Expr::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(inputs, values))
                    .collect::<Result<Vec<_>>>()?;

                function.call(&args)
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant { value } => write!(f, "{value}"),
            Expr::Is { input, membership } => write!(f, "{input} IS {membership}"),
            Expr::Not { operand } => write!(f, "NOT ({operand})"),
            Expr::Logic { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.keyword()),
            Expr::Call { function, args } => {
                write!(f, "{}(", function.keyword())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            },
        }
    }
}
