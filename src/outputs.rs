use std::fmt;

use indexmap::IndexMap;

/// Why an output holds the no-data value for a record.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// Every input of the record was missing.
    AllInputsMissing,
    /// The output evaluated to a missing-data sentinel.
    NoData,
    /// Evaluation failed; the message is the error's.
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AllInputsMissing => f.write_str("no input data"),
            SkipReason::NoData => f.write_str("no data"),
            SkipReason::Failed(msg) => f.write_str(msg),
        }
    }
}

/// Output values for one record, in the model's output order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outputs {
    values: IndexMap<String, f64>,
    skipped: IndexMap<String, SkipReason>,
}

impl Outputs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_owned(), value);
    }

    pub(crate) fn skip(&mut self, name: &str, no_data: f64, reason: SkipReason) {
        self.values.insert(name.to_owned(), no_data);
        self.skipped.insert(name.to_owned(), reason);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn skip_reason(&self, name: &str) -> Option<&SkipReason> {
        self.skipped.get(name)
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped.contains_key(name)
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.skipped.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
