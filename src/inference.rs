//! Per-record evaluation of a whole model.
//!
//! A [`Model`] is a named collection of rule sets and combiners. Each record
//! runs every set, then every combiner over the resulting implications.
//! Failures and missing data become the configured no-data output value and
//! are reported to an [`EvaluationObserver`] rather than aborting the run.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combiner::{Combiner, Operand};
use crate::config::EngineConfig;
use crate::error::{FuzzyError, Result};
use crate::implication::Implication;
use crate::inputs::Inputs;
use crate::nodata::Value;
use crate::outputs::{Outputs, SkipReason};
use crate::set::FuzzyLogicSet;

/// Prefix of the per-input flags combiners can read: `SRC_NO_DATA.depth`
/// is 1 when the `depth` input is missing in the current record, else 0.
pub const NO_DATA_FLAG_PREFIX: &str = "SRC_NO_DATA.";

/// Driver hooks for what happens while a record is evaluated.
pub trait EvaluationObserver {
    fn set_failed(&mut self, _set: &str, _error: &FuzzyError) {}

    fn output_skipped(&mut self, _output: &str, _reason: &SkipReason) {}
}

impl EvaluationObserver for () {}

/// Keeps a message for every skipped output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkipLog {
    pub messages: Vec<String>,
}

impl EvaluationObserver for SkipLog {
    fn set_failed(&mut self, set: &str, error: &FuzzyError) {
        self.messages.push(format!("Set {set} failed: {error}"));
    }

    fn output_skipped(&mut self, output: &str, reason: &SkipReason) {
        self.messages.push(format!("{output} Skipped: {reason}"));
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub config: EngineConfig,
    #[serde(default)]
    pub sets: IndexMap<String, FuzzyLogicSet>,
    #[serde(default)]
    pub combiners: IndexMap<String, Combiner>,
}

impl Model {
    pub fn new(config: EngineConfig) -> Self {
        Model {
            config,
            sets: IndexMap::new(),
            combiners: IndexMap::new(),
        }
    }

    pub fn with_set(mut self, name: impl Into<String>, set: FuzzyLogicSet) -> Self {
        self.sets.insert(name.into(), set);
        self
    }

    pub fn with_combiner(mut self, name: impl Into<String>, combiner: Combiner) -> Self {
        self.combiners.insert(name.into(), combiner);
        self
    }

    /// The combiners' names, or the sets' when there are no combiners and
    /// each set is defuzzified directly.
    pub fn output_names(&self) -> Vec<&str> {
        if self.combiners.is_empty() {
            self.sets.keys().map(String::as_str).collect()
        } else {
            self.combiners.keys().map(String::as_str).collect()
        }
    }

    /// Checks every set, and that each combiner only expects names the
    /// model can supply.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;

        for set in self.sets.values() {
            set.validate()?;
        }
        for combiner in self.combiners.values() {
            for name in combiner.expected_names() {
                if !self.sets.contains_key(name) && !name.starts_with(NO_DATA_FLAG_PREFIX) {
                    return Err(FuzzyError::MissingValue(name.clone()));
                }
            }
        }

        Ok(())
    }

    /// Evaluates a record of raw readings, treating the configured no-data
    /// value as missing.
    pub fn evaluate_raw<I, S>(&self, record: I) -> Outputs
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut inputs = Inputs::new();
        for (name, raw) in record {
            inputs.insert_raw(name, raw, &self.config.no_data);
        }

        self.evaluate_record(&inputs)
    }

    pub fn evaluate_record(&self, inputs: &Inputs) -> Outputs {
        self.evaluate_record_with(inputs, &mut ())
    }

    pub fn evaluate_record_with(&self, inputs: &Inputs, observer: &mut impl EvaluationObserver) -> Outputs {
        let mut outputs = Outputs::new();

        // Nothing to do for a record without any data
        if inputs.all_no_data() {
            for name in self.output_names() {
                self.skip(&mut outputs, observer, name, SkipReason::AllInputsMissing);
            }
            return outputs;
        }

        // Evaluate every set
        let mut set_results: IndexMap<&str, Result<Implication<'_>>> = IndexMap::with_capacity(self.sets.len());

        for (name, set) in &self.sets {
            let result = set.evaluate_rules(inputs);

            if let Err(err) = &result {
                tracing::debug!(set = %name, error = %err, "set evaluation failed");
                observer.set_failed(name, err);
            }
            set_results.insert(name, result);
        }

        // Without combiners each set is its own output
        if self.combiners.is_empty() {
            for (name, result) in set_results {
                let value = result.and_then(|imp| {
                    imp.defuzzify(self.config.default_defuzzifier, self.config.sample_count)
                        .map(|v| v.unwrap_or(Value::Number(0.)))
                });
                self.finish(&mut outputs, observer, name, value);
            }
            return outputs;
        }

        // Combine
        let implications: HashMap<String, Operand<'_>> = set_results
            .into_iter()
            .filter_map(|(name, result)| Some((name.to_owned(), Operand::Implication(result.ok()?))))
            .collect();
        let flags: HashMap<String, Value> = inputs
            .iter()
            .map(|(name, v)| {
                let flag = if v.is_no_data() { 1. } else { 0. };
                (format!("{NO_DATA_FLAG_PREFIX}{name}"), Value::Number(flag))
            })
            .collect();

        for (name, combiner) in &self.combiners {
            let value = combiner.evaluate(&implications, &flags);
            self.finish(&mut outputs, observer, name, value);
        }

        outputs
    }

    fn finish(&self, outputs: &mut Outputs, observer: &mut impl EvaluationObserver, name: &str, value: Result<Value>) {
        match value {
            Ok(Value::Number(v)) => outputs.insert(name, v),
            Ok(Value::NoData(_)) => self.skip(outputs, observer, name, SkipReason::NoData),
            Err(err) => self.skip(outputs, observer, name, SkipReason::Failed(err.to_string())),
        }
    }

    fn skip(&self, outputs: &mut Outputs, observer: &mut impl EvaluationObserver, name: &str, reason: SkipReason) {
        tracing::debug!(output = %name, %reason, "output skipped");

        observer.output_skipped(name, &reason);
        outputs.skip(name, self.config.no_data.value, reason);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::curves::Curve;
    use crate::nodata::NoData;
    use crate::variable::{FuzzyResult, Variable, Variables};

    fn set(input: &str) -> FuzzyLogicSet {
        let falling = Curve::Linear {
            left: (0., 1.).into(),
            right: (1., 0.).into(),
        };
        let inputs: Variables = [Variable::new(input, 0. ..=100.)
            .unwrap()
            .with_curve("high", Curve::linear())
            .with_curve("low", falling.clone())]
        .into_iter()
        .collect();
        let result = FuzzyResult::new("score", 0. ..=1.)
            .unwrap()
            .with_curve("good", Curve::linear())
            .with_curve("bad", falling);

        FuzzyLogicSet::new(inputs, result)
            .with_rules(&format!(
                "IF {input} IS high THEN score IS good\nIF {input} IS low THEN score IS bad"
            ))
            .unwrap()
    }

    fn model() -> Model {
        Model::new(EngineConfig::default())
            .with_set("soil", set("depth"))
            .with_set("water", set("flow"))
            .with_combiner(
                "suitability",
                Combiner::new("checknodata(soil, 0) * 0.5 + checknodata(water, 0) * 0.5").unwrap(),
            )
            .with_combiner("ratio", Combiner::new("soil / (water - water)").unwrap())
    }

    #[test]
    fn test_combined_record() {
        let model = model();
        let mut log = SkipLog::default();
        let outputs = model.evaluate_record_with(&Inputs::new().with("depth", 100.).with("flow", 0.), &mut log);

        assert!(model.validate().is_ok());
        assert_relative_eq!(outputs.get("suitability").unwrap(), 0.5, epsilon = 1e-3);
        assert_eq!(outputs.get("ratio"), Some(-99999.));
        assert!(matches!(outputs.skip_reason("ratio"), Some(SkipReason::Failed(_))));
        assert_eq!(log.messages, vec!["ratio Skipped: arithmetic error: float division by zero"]);
    }

    #[test]
    fn test_missing_data_record() {
        let model = model();
        let outputs = model.evaluate_raw([("depth", -99999.), ("flow", -99999.)]);

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs.skip_reason("suitability"), Some(&SkipReason::AllInputsMissing));

        let outputs = model.evaluate_raw([("depth", -99999.), ("flow", 100.)]);

        assert!(!outputs.is_skipped("suitability"));
        assert_relative_eq!(outputs.get("suitability").unwrap(), 0.5 * (2. / 3.), epsilon = 1e-3);
    }

    #[test]
    fn test_set_failure_skips_dependent_outputs() {
        let model = model();
        let mut log = SkipLog::default();
        let outputs = model.evaluate_record_with(&Inputs::new().with("depth", 50.), &mut log);

        assert_eq!(outputs.get("suitability"), Some(-99999.));
        assert_eq!(log.messages[0], "Set water failed: missing value for \"flow\"");
    }

    #[test]
    fn test_sets_without_combiners() {
        let mut model = model();
        model.combiners.clear();
        model.config.default_defuzzifier = crate::ops::DefuzzificationOp::LargestOfMaximum;

        let outputs = model.evaluate_record(&Inputs::new().with("depth", 100.).with("flow", NoData::PROPAGATE));

        assert_eq!(model.output_names(), vec!["soil", "water"]);
        assert_relative_eq!(outputs.get("soil").unwrap(), 1., epsilon = 1e-9);
        assert_eq!(outputs.skip_reason("water"), Some(&SkipReason::NoData));
    }

    #[test]
    fn test_validate_unknown_combiner_name() {
        let model = model().with_combiner("other", Combiner::new("forest * 2").unwrap());

        assert_eq!(model.validate(), Err(FuzzyError::MissingValue("forest".to_owned())));
    }
}
