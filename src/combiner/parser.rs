//! Precedence-climbing parser for combiner expressions.
//!
//! Precedence follows Python: `+ -` bind loosest, then `* / // %`, then
//! unary signs, then `**`, which is right associative and binds tighter
//! than a unary minus on its left (`-2**2 == -4`).

use std::f64::consts;
use std::fmt;

use crate::error::{CompileError, Result};

use super::lexer::{lex, Token, TokenKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

/// Every function a combiner expression may call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    Round,
    Pow,
    Float,
    Int,
    Acos,
    Acosh,
    Asin,
    Asinh,
    Atan,
    Atan2,
    Atanh,
    Ceil,
    Degrees,
    Exp,
    Floor,
    Log,
    Log2,
    Log10,
    Radians,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
    Max,
    Min,
    Sum,
    Product,
    Gamma,
    CheckNoData,
}

const BUILTINS: [(&str, Builtin); 31] = [
    ("abs", Builtin::Abs),
    ("round", Builtin::Round),
    ("pow", Builtin::Pow),
    ("float", Builtin::Float),
    ("int", Builtin::Int),
    ("acos", Builtin::Acos),
    ("acosh", Builtin::Acosh),
    ("asin", Builtin::Asin),
    ("asinh", Builtin::Asinh),
    ("atan", Builtin::Atan),
    ("atan2", Builtin::Atan2),
    ("atanh", Builtin::Atanh),
    ("ceil", Builtin::Ceil),
    ("degrees", Builtin::Degrees),
    ("exp", Builtin::Exp),
    ("floor", Builtin::Floor),
    ("log", Builtin::Log),
    ("log2", Builtin::Log2),
    ("log10", Builtin::Log10),
    ("radians", Builtin::Radians),
    ("sin", Builtin::Sin),
    ("sinh", Builtin::Sinh),
    ("sqrt", Builtin::Sqrt),
    ("tan", Builtin::Tan),
    ("tanh", Builtin::Tanh),
    ("max", Builtin::Max),
    ("min", Builtin::Min),
    ("sum", Builtin::Sum),
    ("product", Builtin::Product),
    ("gamma", Builtin::Gamma),
    ("checknodata", Builtin::CheckNoData),
];

const CONSTANTS: [(&str, f64); 3] = [("e", consts::E), ("pi", consts::PI), ("inf", f64::INFINITY)];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTINS.iter().find(|(n, _)| *n == name).map(|(_, b)| *b)
    }

    pub fn name(self) -> &'static str {
        BUILTINS
            .iter()
            .find(|(_, b)| *b == self)
            .map(|(n, _)| *n)
            .unwrap_or_default()
    }

    /// Minimum and, if bounded, maximum argument counts. The reducers check
    /// their own counts when called.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Builtin::Round | Builtin::Log => (1, Some(2)),
            Builtin::Pow | Builtin::Atan2 => (2, Some(2)),
            Builtin::CheckNoData => (2, Some(3)),
            Builtin::Max | Builtin::Min | Builtin::Sum | Builtin::Product | Builtin::Gamma => (0, None),
            _ => (1, Some(1)),
        }
    }
}

/// Whether `name` is a function or constant rather than a caller-supplied
/// value.
pub fn is_builtin_name(name: &str) -> bool {
    Builtin::from_name(name).is_some() || CONSTANTS.iter().any(|(n, _)| *n == name)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Number(f64),
    Name(String),
    Unary { op: UnaryOp, operand: Box<Node> },
    Binary { op: BinaryOp, lhs: Box<Node>, rhs: Box<Node> },
    Call { func: Builtin, args: Vec<Node> },
}

impl Node {
    /// Every referenced name, once each, in order of first appearance.
    pub fn names(&self) -> Vec<&str> {
        let mut names = Vec::new();

        fn walk<'n>(node: &'n Node, out: &mut Vec<&'n str>) {
            match node {
                Node::Number(_) => {},
                Node::Name(name) => {
                    if !out.contains(&name.as_str()) {
                        out.push(name);
                    }
                },
                Node::Unary { operand, .. } => walk(operand, out),
                Node::Binary { lhs, rhs, .. } => {
                    walk(lhs, out);
                    walk(rhs, out);
                },
                Node::Call { args, .. } => {
                    for arg in args {
                        walk(arg, out);
                    }
                },
            }
        }

        walk(self, &mut names);

        names
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(n) => write!(f, "{n}"),
            Node::Name(name) => f.write_str(name),
            Node::Unary { op: UnaryOp::Neg, operand } => write!(f, "-{operand}"),
            Node::Unary { op: UnaryOp::Pos, operand } => write!(f, "+{operand}"),
            Node::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Node::Call { func, args } => {
                write!(f, "{}(", func.name())?;
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

pub fn parse(source: &str) -> Result<Node> {
    let tokens = lex(source)?;
    let mut parser = Parser { tokens, pos: 0 };

    let node = parser.parse_expr(0)?;
    if let Some(token) = parser.tokens.get(parser.pos) {
        return Err(unexpected(token).into());
    }

    Ok(node)
}

struct Parser<'s> {
    tokens: Vec<Token<'s>>,
    pos: usize,
}

fn unexpected(token: &Token<'_>) -> CompileError {
    CompileError::new(format!("Unexpected \"{}\" at position {}", token.text, token.span.start))
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn advance(&mut self) -> Result<Token<'s>, CompileError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| CompileError::new("Unexpected end of expression"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), CompileError> {
        let token = self
            .advance()
            .map_err(|_| CompileError::new(format!("Expected {what} at end of expression")))?;
        if token.kind != kind {
            return Err(CompileError::new(format!(
                "Expected {what}, found \"{}\" at position {}",
                token.text, token.span.start
            )));
        }
        Ok(())
    }

    fn binary_op_info(&self) -> Option<(BinaryOp, u8)> {
        Some(match self.peek()? {
            TokenKind::Plus => (BinaryOp::Add, 1),
            TokenKind::Minus => (BinaryOp::Sub, 1),
            TokenKind::Star => (BinaryOp::Mul, 2),
            TokenKind::Slash => (BinaryOp::Div, 2),
            TokenKind::SlashSlash => (BinaryOp::FloorDiv, 2),
            TokenKind::Percent => (BinaryOp::Mod, 2),
            _ => return None,
        })
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<Node, CompileError> {
        let mut left = self.parse_unary()?;

        while let Some((op, prec)) = self.binary_op_info() {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.parse_expr(prec + 1)?;

            left = Node::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, CompileError> {
        let op = match self.peek() {
            Some(TokenKind::Minus) => UnaryOp::Neg,
            Some(TokenKind::Plus) => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.pos += 1;

        Ok(Node::Unary {
            op,
            operand: Box::new(self.parse_unary()?),
        })
    }

    fn parse_power(&mut self) -> Result<Node, CompileError> {
        let base = self.parse_primary()?;

        if self.peek() == Some(TokenKind::StarStar) {
            self.pos += 1;
            let exponent = self.parse_unary()?;

            return Ok(Node::Binary {
                op: BinaryOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exponent),
            });
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Node, CompileError> {
        let token = self.advance()?;

        match token.kind {
            TokenKind::Number => token
                .text
                .parse()
                .map(Node::Number)
                .map_err(|_| unexpected(&token)),
            TokenKind::Ident if self.peek() == Some(TokenKind::LParen) => {
                let func = Builtin::from_name(token.text)
                    .ok_or_else(|| CompileError::new(format!("Unknown function \"{}\"", token.text)))?;
                self.pos += 1;
                let args = self.parse_args()?;

                let (min, max) = func.arity();
                if args.len() < min || max.is_some_and(|max| args.len() > max) {
                    let expected = match max {
                        Some(max) if max == min => format!("{min}"),
                        Some(max) => format!("{min} to {max}"),
                        None => format!("at least {min}"),
                    };
                    return Err(CompileError::new(format!(
                        "{}() takes {expected} arguments ({} given)",
                        func.name(),
                        args.len()
                    )));
                }

                Ok(Node::Call { func, args })
            },
            TokenKind::Ident => match CONSTANTS.iter().find(|(n, _)| *n == token.text) {
                Some((_, value)) => Ok(Node::Number(*value)),
                None if Builtin::from_name(token.text).is_some() => Err(CompileError::new(format!(
                    "\"{}\" is a function and must be called",
                    token.text
                ))),
                None => Ok(Node::Name(token.text.to_owned())),
            },
            TokenKind::LParen => {
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen, "\")\"")?;
                Ok(inner)
            },
            _ => Err(unexpected(&token)),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one.
    fn parse_args(&mut self) -> Result<Vec<Node>, CompileError> {
        let mut args = Vec::new();

        if self.peek() == Some(TokenKind::RParen) {
            self.pos += 1;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expr(0)?);

            match self.advance()? {
                Token {
                    kind: TokenKind::Comma, ..
                } => continue,
                Token {
                    kind: TokenKind::RParen, ..
                } => return Ok(args),
                token => return Err(unexpected(&token)),
            }
        }
    }
}
