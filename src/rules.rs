use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::compiler::{compile_alias, compile_rule, AliasTable};
use crate::dsl::Expr;
use crate::error::{CompileError, CompileErrors, FuzzyError, Result, StatementKind};
use crate::implication::Implication;
use crate::inputs::Inputs;
use crate::nodata::Value;
use crate::variable::{FuzzyResult, Variables};

/// A compiled `IF <condition> THEN <result> IS <membership>` statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    source: String,
    condition: Expr,
    result: String,
    result_membership: String,
    /// Inputs queried directly by the rule text, mapped to their membership.
    queries: IndexMap<String, String>,
}

impl Rule {
    pub fn compile(line: &str, aliases: &AliasTable) -> Result<Self, CompileError> {
        let compiled = compile_rule(line, aliases)?;

        Ok(Rule {
            source: line.to_owned(),
            condition: compiled.condition,
            result: compiled.result,
            result_membership: compiled.result_membership,
            queries: compiled.queries,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn condition(&self) -> &Expr {
        &self.condition
    }

    /// Name of the result written after `THEN`.
    pub fn result_name(&self) -> &str {
        &self.result
    }

    pub fn result_membership(&self) -> &str {
        &self.result_membership
    }

    /// Inputs named in the rule's own text, in first-use order. Inputs only
    /// reached through an alias are not listed.
    pub fn found_inputs(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn membership_for_input(&self, input: &str) -> Option<&str> {
        self.queries.get(input).map(String::as_str)
    }

    /// Truth of the query the rule makes about `input` for a single value.
    pub fn truth_for_input(&self, inputs: &Variables, input: &str, value: Value) -> Result<Value> {
        let membership = self
            .membership_for_input(input)
            .ok_or_else(|| FuzzyError::UnknownInput(input.to_owned()))?;
        let variable = inputs
            .get(input)
            .ok_or_else(|| FuzzyError::UnknownInput(input.to_owned()))?;

        variable.truth_for(value, membership)
    }

    /// The height the result membership is clipped at.
    pub fn clip(&self, inputs: &Variables, values: &Inputs) -> Result<Value> {
        self.condition.evaluate(inputs, values)
    }

    pub fn evaluate<'r>(&self, inputs: &Variables, result: &'r FuzzyResult, values: &Inputs) -> Result<Implication<'r>> {
        let clip = self.clip(inputs, values)?;
        result.implication(&self.result_membership, clip)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Everything one block of rule text compiled into.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleImport {
    pub rules: Vec<Rule>,
    pub aliases: AliasTable,
    pub errors: CompileErrors,
}

/// Compiles a block of rule text.
///
/// Blank lines and `#` comments are skipped. A line that does not start
/// with `IF` or `DEF` continues the previous statement. Every `DEF` is
/// compiled before any rule, and every error is collected rather than
/// stopping at the first.
pub fn import_rules<I, S>(lines: I) -> RuleImport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut defs: Vec<String> = Vec::new();
    let mut ifs: Vec<String> = Vec::new();
    let mut current: Option<StatementKind> = None;
    let mut errors = Vec::new();

    for line in lines {
        let mut line = line.as_ref().trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(comment) = line.find('#') {
            line = line[..comment].trim_end();
        }

        let first = line.split_whitespace().next().unwrap_or_default();
        if first.eq_ignore_ascii_case("def") {
            defs.push(line.to_owned());
            current = Some(StatementKind::Def);
        } else if first.eq_ignore_ascii_case("if") {
            ifs.push(line.to_owned());
            current = Some(StatementKind::Rule);
        } else {
            let previous = match current {
                Some(StatementKind::Def) => defs.last_mut(),
                Some(StatementKind::Rule) => ifs.last_mut(),
                None => None,
            };
            match previous {
                Some(statement) => {
                    statement.push(' ');
                    statement.push_str(line);
                },
                None => {
                    let mut err = CompileError::new(format!("Unbound statement: {line}"));
                    err.source_line = Some(line.to_owned());
                    errors.push(err);
                },
            }
        }
    }

    let mut aliases = AliasTable::new();
    for (i, def) in defs.iter().enumerate() {
        match compile_alias(def, &aliases) {
            Ok((name, expr)) => aliases.insert(&name, expr),
            Err(err) => errors.push(err.located(StatementKind::Def, i + 1, def)),
        }
    }

    let mut rules = Vec::with_capacity(ifs.len());
    for (i, line) in ifs.iter().enumerate() {
        match Rule::compile(line, &aliases) {
            Ok(rule) => rules.push(rule),
            Err(err) => errors.push(err.located(StatementKind::Rule, i + 1, line)),
        }
    }

    tracing::debug!(
        rules = rules.len(),
        aliases = aliases.len(),
        errors = errors.len(),
        "imported rule text"
    );

    RuleImport {
        rules,
        aliases,
        errors: CompileErrors(errors),
    }
}
