//! Combining defuzzified set results with a small arithmetic language.
//!
//! A combiner holds one expression such as
//! `checknodata(soil, 0) * 0.4 + max(water, slope) * 0.6`. Names that are
//! not functions or constants are expected to be supplied at evaluation
//! time, usually as implications which are defuzzified first.

mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, DEFAULT_SAMPLE_COUNT};
use crate::error::{FuzzyError, Result};
use crate::implication::Implication;
use crate::nodata::Value;
use crate::ops::DefuzzificationOp;

pub use parser::{is_builtin_name, BinaryOp, Builtin, Node, UnaryOp};

/// A value handed to a combiner under a name.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand<'a> {
    Implication(Implication<'a>),
    Value(Value),
}

impl<'a> From<Implication<'a>> for Operand<'a> {
    fn from(imp: Implication<'a>) -> Self {
        Operand::Implication(imp)
    }
}

impl From<Value> for Operand<'_> {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<f64> for Operand<'_> {
    fn from(v: f64) -> Self {
        Operand::Value(Value::Number(v))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CombinerDocument", into = "CombinerDocument")]
pub struct Combiner {
    expression: String,
    ast: Node,
    /// Names given explicitly, replacing the ones found in the expression.
    explicit_names: Option<Vec<String>>,
    expected: Vec<String>,
    methods: IndexMap<String, DefuzzificationOp>,
    default_method: DefuzzificationOp,
    sample_count: usize,
}

impl Combiner {
    pub fn new(expression: &str) -> Result<Self> {
        let ast = parser::parse(expression)?;
        let expected = ast.names().into_iter().map(str::to_owned).collect();

        Ok(Combiner {
            expression: expression.to_owned(),
            ast,
            explicit_names: None,
            expected,
            methods: IndexMap::new(),
            default_method: DefuzzificationOp::default(),
            sample_count: DEFAULT_SAMPLE_COUNT,
        })
    }

    /// A combiner using the configured default method and sample count.
    pub fn configured(expression: &str, config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(expression)?
            .with_default_method(config.default_defuzzifier)
            .with_sample_count(config.sample_count))
    }

    pub fn with_expected_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.expected = names.clone();
        self.explicit_names = Some(names);
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, method: DefuzzificationOp) -> Self {
        self.set_method(name, method);
        self
    }

    pub fn with_default_method(mut self, method: DefuzzificationOp) -> Self {
        self.default_method = method;
        self
    }

    pub fn with_sample_count(mut self, sample_count: usize) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn set_method(&mut self, name: impl Into<String>, method: DefuzzificationOp) {
        self.methods.insert(name.into(), method);
    }

    pub fn clear_method(&mut self, name: &str) -> Option<DefuzzificationOp> {
        self.methods.shift_remove(name)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn ast(&self) -> &Node {
        &self.ast
    }

    /// Names that must be supplied when evaluating.
    pub fn expected_names(&self) -> &[String] {
        &self.expected
    }

    pub fn method_for(&self, name: &str) -> DefuzzificationOp {
        self.methods.get(name).copied().unwrap_or(self.default_method)
    }

    pub fn default_method(&self) -> DefuzzificationOp {
        self.default_method
    }

    /// Defuzzifies each implication and evaluates the expression.
    ///
    /// An implication with no area counts as 0; one with missing data
    /// enters the expression as its sentinel. `extra_vars` are available
    /// to the expression too, but an implication or value of the same name
    /// takes precedence.
    pub fn evaluate(&self, implications: &HashMap<String, Operand<'_>>, extra_vars: &HashMap<String, Value>) -> Result<Value> {
        for name in &self.expected {
            if !implications.contains_key(name) && !extra_vars.contains_key(name) {
                return Err(FuzzyError::MissingValue(name.clone()));
            }
        }

        let mut env: HashMap<&str, Value> = extra_vars.iter().map(|(k, v)| (k.as_str(), *v)).collect();

        for (name, operand) in implications {
            let value = match operand {
                Operand::Value(v) => *v,
                Operand::Implication(imp) => imp
                    .defuzzify(self.method_for(name), self.sample_count)?
                    .unwrap_or(Value::Number(0.)),
            };
            env.insert(name, value);
        }

        eval::evaluate(&self.ast, &env)
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct CombinerDocument {
    expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    methods: IndexMap<String, DefuzzificationOp>,
    #[serde(default)]
    default_method: DefuzzificationOp,
    #[serde(default = "default_sample_count")]
    sample_count: usize,
}

fn default_sample_count() -> usize {
    DEFAULT_SAMPLE_COUNT
}

impl TryFrom<CombinerDocument> for Combiner {
    type Error = FuzzyError;

    fn try_from(doc: CombinerDocument) -> Result<Self> {
        let mut combiner = Combiner::new(&doc.expression)?
            .with_default_method(doc.default_method)
            .with_sample_count(doc.sample_count);
        if let Some(names) = doc.expected {
            combiner = combiner.with_expected_names(names);
        }
        combiner.methods = doc.methods;

        Ok(combiner)
    }
}

impl From<Combiner> for CombinerDocument {
    fn from(combiner: Combiner) -> Self {
        CombinerDocument {
            expression: combiner.expression,
            expected: combiner.explicit_names,
            methods: combiner.methods,
            default_method: combiner.default_method,
            sample_count: combiner.sample_count,
        }
    }
}
