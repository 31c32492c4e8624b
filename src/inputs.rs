use std::collections::HashMap;

use crate::config::NoDataConfig;
use crate::error::{FuzzyError, Result};
use crate::nodata::Value;

/// One record of named input values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Inputs(pub(crate) HashMap<String, Value>);

impl Inputs {
    pub fn new() -> Self {
        Inputs(HashMap::new())
    }

    pub fn add(&mut self, name: impl Into<String>, val: impl Into<Value>) {
        self.0.insert(name.into(), val.into());
    }

    pub fn with(mut self, name: impl Into<String>, val: impl Into<Value>) -> Self {
        self.add(name, val);
        self
    }

    /// Adds a raw reading, turning the configured no-data value into the
    /// run's sentinel.
    pub fn insert_raw(&mut self, name: impl Into<String>, raw: f64, no_data: &NoDataConfig) {
        let val = if no_data.matches(raw) {
            Value::NoData(no_data.sentinel())
        } else {
            Value::Number(raw)
        };
        self.0.insert(name.into(), val);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.0.get(name).copied()
    }

    pub fn require(&self, name: &str) -> Result<Value> {
        self.get(name).ok_or_else(|| FuzzyError::MissingValue(name.to_owned()))
    }

    /// True when there is at least one value and every value is a sentinel.
    pub fn all_no_data(&self) -> bool {
        !self.0.is_empty() && self.0.values().all(|v| v.is_no_data())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Inputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Inputs(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[test]
fn test_insert_raw() {
    let cfg = NoDataConfig::default();
    let mut inputs = Inputs::new();
    inputs.insert_raw("depth", cfg.value, &cfg);
    inputs.insert_raw("grade", 3.5, &cfg);

    assert_eq!(inputs.get("depth"), Some(Value::NoData(cfg.sentinel())));
    assert_eq!(inputs.get("grade"), Some(Value::Number(3.5)));
    assert!(!inputs.all_no_data());
    assert!(matches!(inputs.require("width"), Err(FuzzyError::MissingValue(_))));
}
