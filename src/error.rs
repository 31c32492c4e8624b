use std::fmt;

use thiserror::Error;

pub type Result<T, E = FuzzyError> = std::result::Result<T, E>;

/// Where a compile error came from inside an imported block of rule text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    Def,
    Rule,
}

/// A single rule or alias that failed to compile.
#[derive(Clone, Debug, PartialEq, Error)]
pub struct CompileError {
    pub message: String,
    /// Statement kind and its 1-based position among statements of that kind.
    pub location: Option<(StatementKind, usize)>,
    pub source_line: Option<String>,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
            location: None,
            source_line: None,
        }
    }

    pub(crate) fn located(mut self, kind: StatementKind, index: usize, line: &str) -> Self {
        self.location = Some((kind, index));
        self.source_line = Some(line.to_owned());
        self
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some((StatementKind::Def, n)) => write!(f, "DEF {}: {}", n, self.message),
            Some((StatementKind::Rule, n)) => write!(f, "Rule {}: {}", n, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Every compile error raised by one import, in statement order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompileErrors(pub Vec<CompileError>);

impl CompileErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.0.iter()
    }
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileErrors {}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum FuzzyError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("rules failed to compile:\n{0}")]
    RulesNotCompiled(CompileErrors),
    #[error("missing value for \"{0}\"")]
    MissingValue(String),
    #[error("unknown input \"{0}\"")]
    UnknownInput(String),
    #[error("\"{variable}\" has no membership named \"{membership}\"")]
    UnknownMembership { variable: String, membership: String },
    #[error("implication ranges differ: [{lhs_min}, {lhs_max}] vs [{rhs_min}, {rhs_max}]")]
    RangeMismatch {
        lhs_min: f64,
        lhs_max: f64,
        rhs_min: f64,
        rhs_max: f64,
    },
    #[error("{0}")]
    Argument(String),
    #[error("value {value} outside of [{lo}, {hi}]")]
    Domain { value: f64, lo: f64, hi: f64 },
    #[error("invalid segment: {0}")]
    InvalidSegment(String),
    #[error("{0}")]
    Unsupported(String),
    #[error("No rules to evaluate.")]
    NoRules,
    #[error("{0}")]
    Computation(String),
    #[error("arithmetic error: {0}")]
    Arithmetic(String),
    #[error("unknown defuzzification method \"{0}\"")]
    UnknownDefuzzifier(String),
    #[error("document error: {0}")]
    Document(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for FuzzyError {
    fn from(err: serde_json::Error) -> Self {
        FuzzyError::Document(err.to_string())
    }
}

impl From<toml::de::Error> for FuzzyError {
    fn from(err: toml::de::Error) -> Self {
        FuzzyError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FuzzyError {
    fn from(err: toml::ser::Error) -> Self {
        FuzzyError::Config(err.to_string())
    }
}

#[test]
fn test_compile_error_display() {
    let err = CompileError::new("Paren mismatch").located(StatementKind::Rule, 2, "IF (x IS a THEN y IS b");

    assert_eq!(err.to_string(), "Rule 2: Paren mismatch");
    assert_eq!(err.source_line.as_deref(), Some("IF (x IS a THEN y IS b"));

    let errs = CompileErrors(vec![CompileError::new("a").located(StatementKind::Def, 1, ""), err]);

    assert_eq!(errs.to_string(), "DEF 1: a\nRule 2: Paren mismatch");
}
