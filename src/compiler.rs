//! Token-folding compiler for the rule language.
//!
//! A statement is split into word tokens which are then folded, pass by
//! pass, into a single [`Expr`]: parenthesized groups first (innermost
//! out), then aliases, function calls, `NOT` placement, `IS` queries, `NOT`
//! and finally the binary connectives strictly left to right.

use std::fmt;

use indexmap::IndexMap;

use crate::dsl::{Expr, Function};
use crate::error::CompileError;
use crate::ops::LogicOp;

const RESERVED: [&str; 12] = [
    "is", "not", "then", "if", "def", ",", "and", "or", "xor", "sum", "product", "gamma",
];

/// Previously defined `DEF` aliases, keyed by lower-cased name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AliasTable(IndexMap<String, Expr>);

impl AliasTable {
    pub fn new() -> Self {
        AliasTable(IndexMap::new())
    }

    pub fn insert(&mut self, name: &str, expr: Expr) {
        self.0.insert(name.to_lowercase(), expr);
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.0.get(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The parts of a compiled `IF ... THEN result IS membership` statement.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CompiledRule {
    pub(crate) condition: Expr,
    pub(crate) result: String,
    pub(crate) result_membership: String,
    /// Input to membership, for queries written directly in the rule.
    pub(crate) queries: IndexMap<String, String>,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Word(String),
    /// A parenthesized, comma separated list of compiled expressions.
    Group(Vec<Expr>),
    Folded(Expr),
}

impl Token {
    fn word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            _ => None,
        }
    }

    fn is_word(&self, word: &str) -> bool {
        self.word().is_some_and(|w| w.eq_ignore_ascii_case(word))
    }

    fn is_reserved(&self) -> bool {
        self.word()
            .is_some_and(|w| RESERVED.contains(&w.to_ascii_lowercase().as_str()))
    }

    fn into_expr(self) -> Result<Expr, CompileError> {
        match self {
            Token::Folded(expr) => Ok(expr),
            Token::Group(mut exprs) => match exprs.len() {
                1 => Ok(exprs.remove(0)),
                0 => Err(CompileError::new("Empty parentheses")),
                _ => Err(CompileError::new(format!(
                    "Unexpected \",\" outside of a function call: {}",
                    Token::Group(exprs)
                ))),
            },
            Token::Word(w) => match w.parse::<f64>() {
                Ok(value) => Ok(Expr::Constant { value }),
                Err(_) => Err(CompileError::new(format!("Unrecognized term \"{w}\""))),
            },
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => f.write_str(w),
            Token::Folded(expr) => write!(f, "{expr}"),
            Token::Group(exprs) => {
                f.write_str("(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                f.write_str(")")
            },
        }
    }
}

/// `=` is a synonym for `IS`; parentheses and commas are always their own
/// tokens.
fn tokenize(line: &str) -> Vec<String> {
    let mut padded = line.replace('=', " is ");
    for sep in ["(", ")", ","] {
        padded = padded.replace(sep, &format!(" {sep} "));
    }

    padded.split_whitespace().map(str::to_owned).collect()
}

pub(crate) fn compile_rule(line: &str, aliases: &AliasTable) -> Result<CompiledRule, CompileError> {
    let mut tokens = tokenize(line);

    if !tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("if")) {
        return Err(CompileError::new("\"IF\" must begin rule"));
    }
    tokens.remove(0);

    let then = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("then"))
        .ok_or_else(|| CompileError::new("\"THEN\" keyword missing from rule"))?;
    let conclusion = tokens.split_off(then + 1);
    tokens.pop();

    let [result, is, membership] = conclusion.as_slice() else {
        return Err(CompileError::new("Malformed THEN clause"));
    };
    if !is.eq_ignore_ascii_case("is") {
        return Err(CompileError::new("Malformed THEN clause"));
    }

    let mut queries = IndexMap::new();
    let condition = parse_tokens(tokens, Some(&mut queries), aliases)?;

    Ok(CompiledRule {
        condition,
        result: result.clone(),
        result_membership: membership.clone(),
        queries,
    })
}

/// Compiles `DEF name IS logic` into the alias name and its expansion.
pub fn compile_alias(line: &str, aliases: &AliasTable) -> Result<(String, Expr), CompileError> {
    let mut tokens = tokenize(line);

    if !tokens.first().is_some_and(|t| t.eq_ignore_ascii_case("def")) {
        return Err(CompileError::new("\"DEF\" must begin alias"));
    }
    if tokens.len() < 4 || !tokens[2].eq_ignore_ascii_case("is") {
        return Err(CompileError::new(
            "Malformed \"DEF\" statement; format should be \"DEF <label> [is|=] <statements>\"",
        ));
    }

    let logic = parse_tokens(tokens.split_off(3), None, aliases)?;

    Ok((tokens.swap_remove(1), logic))
}

fn parse_tokens(
    words: Vec<String>,
    queries: Option<&mut IndexMap<String, String>>,
    aliases: &AliasTable,
) -> Result<Expr, CompileError> {
    let opens = words.iter().filter(|w| *w == "(").count();
    let closes = words.iter().filter(|w| *w == ")").count();

    if opens > closes {
        return Err(CompileError::new("Paren mismatch: more \"(\" than \")\""));
    } else if opens < closes {
        return Err(CompileError::new("Paren mismatch: more \")\" than \"(\""));
    }

    fold_groups(words, queries, aliases)
}

/// Replaces every top-level parenthesized span with a group token, then
/// runs the remaining passes on the flattened level.
fn fold_groups(
    words: Vec<String>,
    mut queries: Option<&mut IndexMap<String, String>>,
    aliases: &AliasTable,
) -> Result<Expr, CompileError> {
    let mut tokens = Vec::with_capacity(words.len());
    let mut i = 0;

    while i < words.len() {
        if words[i] == "(" {
            let end = matching_paren(&words, i)?;
            let mut exprs = Vec::new();
            for part in split_commas(&words[i + 1..end]) {
                if part.is_empty() && end > i + 1 {
                    return Err(CompileError::new("Empty argument in parenthesized list"));
                }
                if !part.is_empty() {
                    exprs.push(fold_groups(part.to_vec(), queries.as_deref_mut(), aliases)?);
                }
            }
            tokens.push(Token::Group(exprs));
            i = end + 1;
        } else if words[i] == ")" {
            return Err(CompileError::new("Paren mismatch; \")\" without matching \"(\""));
        } else {
            tokens.push(Token::Word(words[i].clone()));
            i += 1;
        }
    }

    fold_level(tokens, queries, aliases)
}

fn matching_paren(words: &[String], start: usize) -> Result<usize, CompileError> {
    let mut depth = 1;
    for (i, word) in words.iter().enumerate().skip(start + 1) {
        if word == "(" {
            depth += 1;
        } else if word == ")" {
            depth -= 1;
            if depth == 0 {
                return Ok(i);
            }
        }
    }

    Err(CompileError::new("Paren mismatch; \"(\" without matching \")\""))
}

/// Splits on commas that are not nested inside parentheses.
fn split_commas(words: &[String]) -> Vec<&[String]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, word) in words.iter().enumerate() {
        match word.as_str() {
            "(" => depth += 1,
            ")" => depth = depth.saturating_sub(1),
            "," if depth == 0 => {
                parts.push(&words[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    parts.push(&words[start..]);

    parts
}

fn fold_level(
    mut tokens: Vec<Token>,
    queries: Option<&mut IndexMap<String, String>>,
    aliases: &AliasTable,
) -> Result<Expr, CompileError> {
    // Aliases
    for token in tokens.iter_mut() {
        if let Some(expr) = token.word().and_then(|w| aliases.get(w)) {
            *token = Token::Group(vec![expr.clone()]);
        }
    }

    // Function calls
    let mut i = 0;
    while i < tokens.len() {
        if let Some(function) = tokens[i].word().and_then(Function::from_keyword) {
            if !matches!(tokens.get(i + 1), Some(Token::Group(_))) {
                return Err(CompileError::new(format!(
                    "{} must be followed by a parenthesized argument list",
                    function.keyword()
                )));
            }
            if let Token::Group(args) = tokens.remove(i + 1) {
                tokens[i] = Token::Folded(Expr::Call { function, args });
            }
        }
        i += 1;
    }

    check_grammar(&tokens)?;

    // NOT moves in front of the query it negates: `x IS NOT low` -> `NOT x IS low`
    for i in 0..tokens.len() {
        if tokens[i].is_word("not") {
            let not = tokens.remove(i);
            tokens.insert(i.saturating_sub(2), not);
        }
    }

    fold_queries(&mut tokens, queries)?;

    // NOT
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].is_word("not") {
            if i + 1 >= tokens.len() {
                return Err(CompileError::new("NOT is missing its operand"));
            }
            let operand = tokens.remove(i + 1).into_expr()?;
            tokens[i] = Token::Folded(operand.not());
        }
        i += 1;
    }

    // AND, OR, XOR; left to right with no precedence
    let mut i = 0;
    while i < tokens.len() {
        let op = match tokens[i].word().map(str::to_ascii_lowercase).as_deref() {
            Some("and") => Some(LogicOp::And),
            Some("or") => Some(LogicOp::Or),
            Some("xor") => Some(LogicOp::Xor),
            _ => None,
        };
        let Some(op) = op else {
            i += 1;
            continue;
        };
        if i == 0 || i + 1 >= tokens.len() {
            return Err(CompileError::new(format!("{} is missing an operand", op.keyword())));
        }

        let rhs = tokens.remove(i + 1).into_expr()?;
        tokens.remove(i);
        let lhs = std::mem::replace(&mut tokens[i - 1], Token::Group(Vec::new())).into_expr()?;
        tokens[i - 1] = Token::Folded(lhs.logic(op, rhs));
    }

    let mut tokens = tokens.into_iter();
    match (tokens.next(), tokens.next()) {
        (Some(token), None) => token.into_expr(),
        (None, _) => Err(CompileError::new("Bad Grammar: empty expression")),
        (Some(_), Some(extra)) => Err(CompileError::new(format!("Unexpected \"{extra}\""))),
    }
}

/// Reserved and ordinary tokens must alternate, starting after an implicit
/// `IF`. `IS NOT` is the only exception.
fn check_grammar(tokens: &[Token]) -> Result<(), CompileError> {
    let mut last_reserved = true;

    for (i, token) in tokens.iter().enumerate() {
        let reserved = token.is_reserved();
        if reserved == last_reserved {
            if i > 0 && tokens[i - 1].is_word("is") && token.is_word("not") {
                continue;
            }
            let prev = if i == 0 { "IF".to_owned() } else { tokens[i - 1].to_string() };
            return Err(CompileError::new(format!("Bad Grammar: ?{prev} {token}?")));
        }
        last_reserved = reserved;
    }

    match tokens.last() {
        None => Err(CompileError::new("Bad Grammar: empty expression")),
        Some(last) if last_reserved => Err(CompileError::new(format!("Bad Grammar: ?{last}?"))),
        Some(_) => Ok(()),
    }
}

/// Folds `input IS membership` into query nodes, recording each pair.
fn fold_queries(tokens: &mut Vec<Token>, mut queries: Option<&mut IndexMap<String, String>>) -> Result<(), CompileError> {
    let mut i = 0;
    while i < tokens.len() {
        if !tokens[i].is_word("is") {
            i += 1;
            continue;
        }

        let input = i.checked_sub(1).and_then(|p| tokens[p].word()).map(str::to_owned);
        let membership = tokens.get(i + 1).and_then(Token::word).map(str::to_owned);
        let (Some(input), Some(membership)) = (input, membership) else {
            return Err(CompileError::new(format!(
                "Malformed IS statement near \"{}\"",
                tokens.get(i + 1).unwrap_or(&tokens[i])
            )));
        };

        if let Some(queries) = queries.as_deref_mut() {
            queries.insert(input.clone(), membership.clone());
        }
        tokens.drain(i..i + 2);
        tokens[i - 1] = Token::Folded(Expr::Is { input, membership });
    }

    Ok(())
}
