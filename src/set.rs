use serde::{Deserialize, Serialize};

use crate::compiler::AliasTable;
use crate::error::{CompileErrors, FuzzyError, Result};
use crate::implication::Implication;
use crate::inputs::Inputs;
use crate::rules::{import_rules, Rule};
use crate::variable::{FuzzyResult, Variable, Variables};

/// Inputs, one result and the rules relating them.
///
/// The rule text is the source of truth; compiled rules are rebuilt from it
/// on every import and when a set is decoded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "SetDocument", into = "SetDocument")]
pub struct FuzzyLogicSet {
    pub inputs: Variables,
    pub result: FuzzyResult,
    rules_string: String,
    rules: Vec<Rule>,
    aliases: AliasTable,
    compile_errors: Option<CompileErrors>,
}

impl FuzzyLogicSet {
    pub fn new(inputs: impl Into<Variables>, result: FuzzyResult) -> Self {
        FuzzyLogicSet {
            inputs: inputs.into(),
            result,
            rules_string: String::new(),
            rules: Vec::new(),
            aliases: AliasTable::new(),
            compile_errors: None,
        }
    }

    pub fn with_input(mut self, input: Variable) -> Self {
        self.inputs.add(input);
        self
    }

    /// Compiles `text` and keeps it as the set's rule text.
    pub fn with_rules(mut self, text: &str) -> Result<Self, CompileErrors> {
        self.import_rules(text.lines())?;
        Ok(self)
    }

    pub fn rules_string(&self) -> &str {
        &self.rules_string
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Errors from the last import, if it failed.
    pub fn compile_errors(&self) -> Option<&CompileErrors> {
        self.compile_errors.as_ref()
    }

    /// Replaces the rules with `lines`, returning how many compiled.
    ///
    /// Any error leaves the set without rules, and it refuses to evaluate
    /// until a later import succeeds.
    pub fn import_rules<I, S>(&mut self, lines: I) -> Result<usize, CompileErrors>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<S> = lines.into_iter().collect();
        self.rules_string = lines.iter().map(|l| l.as_ref()).collect::<Vec<&str>>().join("\n");

        let import = import_rules(&lines);

        if !import.errors.is_empty() {
            tracing::warn!(result = %self.result.name, errors = %import.errors, "rule import failed");

            self.rules.clear();
            self.aliases = AliasTable::new();
            self.compile_errors = Some(import.errors.clone());

            return Err(import.errors);
        }

        self.rules = import.rules;
        self.aliases = import.aliases;
        self.compile_errors = None;

        Ok(self.rules.len())
    }

    /// Recompiles the stored rule text.
    pub fn reimport(&mut self) -> Result<usize, CompileErrors> {
        let text = std::mem::take(&mut self.rules_string);
        self.import_rules(text.lines())
    }

    /// Evaluates every rule against one record and unions the results.
    pub fn evaluate_rules(&self, values: &Inputs) -> Result<Implication<'_>> {
        if let Some(errors) = &self.compile_errors {
            return Err(FuzzyError::RulesNotCompiled(errors.clone()));
        }

        let mut total: Option<Implication<'_>> = None;

        for rule in &self.rules {
            let clip = rule.clip(&self.inputs, values)?;

            tracing::trace!(rule = %rule, %clip, "rule clip");

            let implication = self.result.implication(rule.result_membership(), clip)?;
            total = Some(match total {
                Some(total) => total.union(implication)?,
                None => implication,
            });
        }

        total.ok_or(FuzzyError::NoRules)
    }

    /// Checks that every query the rules make names a known input and
    /// membership, and that every conclusion names a result membership.
    pub fn validate(&self) -> Result<()> {
        if let Some(errors) = &self.compile_errors {
            return Err(FuzzyError::RulesNotCompiled(errors.clone()));
        }

        for rule in &self.rules {
            for (input, membership) in rule.condition().queries() {
                let variable = self
                    .inputs
                    .get(input)
                    .ok_or_else(|| FuzzyError::UnknownInput(input.to_owned()))?;
                variable.curve(membership)?;
            }
            self.result.curve(rule.result_membership())?;
        }

        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct SetDocument {
    inputs: Variables,
    result: FuzzyResult,
    #[serde(default)]
    rules: String,
}

impl From<SetDocument> for FuzzyLogicSet {
    fn from(doc: SetDocument) -> Self {
        let mut set = FuzzyLogicSet::new(doc.inputs, doc.result);
        // A failed compile is kept on the set and reported on evaluation
        if let Err(errors) = set.import_rules(doc.rules.lines()) {
            tracing::debug!(result = %set.result.name, count = errors.len(), "decoded set has rule errors");
        }
        set
    }
}

impl From<FuzzyLogicSet> for SetDocument {
    fn from(set: FuzzyLogicSet) -> Self {
        SetDocument {
            inputs: set.inputs,
            result: set.result,
            rules: set.rules_string,
        }
    }
}
