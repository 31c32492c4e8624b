use std::ops::{Deref, DerefMut, RangeInclusive};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

use crate::curves::Curve;
use crate::error::{FuzzyError, Result};
use crate::implication::Implication;
use crate::math::TRUTH_EPSILON;
use crate::nodata::Value;

new_key_type! {
    /// A variable key
    pub struct VariableKey;
}

/// A named quantity with a numeric range and a set of membership curves
/// over it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub curves: IndexMap<String, Curve>,
}

impl Variable {
    pub fn new(name: impl Into<String>, range: RangeInclusive<f64>) -> Result<Self> {
        let name = name.into();
        let (min, max) = range.into_inner();
        if !(min < max) {
            return Err(FuzzyError::Argument(format!(
                "\"{name}\" needs a range with min < max, got [{min}, {max}]"
            )));
        }

        Ok(Variable {
            name,
            min,
            max,
            curves: IndexMap::new(),
        })
    }

    pub fn with_curve(mut self, membership: impl Into<String>, curve: Curve) -> Self {
        self.add_curve(membership, curve);
        self
    }

    /// Adds or replaces a membership curve, keeping its original position
    /// when replacing.
    pub fn add_curve(&mut self, membership: impl Into<String>, curve: Curve) {
        self.curves.insert(membership.into(), curve);
    }

    pub fn curve(&self, membership: &str) -> Result<&Curve> {
        self.curves.get(membership).ok_or_else(|| FuzzyError::UnknownMembership {
            variable: self.name.clone(),
            membership: membership.to_owned(),
        })
    }

    pub fn memberships(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(String::as_str)
    }

    /// Maps a value from this variable's range into `[0, 1]`.
    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    pub fn denormalize(&self, n: f64) -> f64 {
        self.min + n * (self.max - self.min)
    }

    /// How true "this variable IS `membership`" is for `value`.
    ///
    /// Sentinels that do not substitute are returned untouched. Results that
    /// drift just past 0 or 1 are clamped.
    pub fn truth_for(&self, value: Value, membership: &str) -> Result<Value> {
        let curve = self.curve(membership)?;
        let value = match value {
            Value::Number(v) => v,
            Value::NoData(s) => match s.substitution() {
                Some(k) => k,
                None => return Ok(value),
            },
        };

        let mut n = curve.evaluate(self.normalize(value))?;
        if n > 1. && n - 1. < TRUTH_EPSILON {
            n = 1.;
        } else if n < 0. && n > -TRUTH_EPSILON {
            n = 0.;
        }

        Ok(Value::Number(n))
    }
}

/// The variable a set of rules draws conclusions about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FuzzyResult(pub Variable);

impl FuzzyResult {
    pub fn new(name: impl Into<String>, range: RangeInclusive<f64>) -> Result<Self> {
        Variable::new(name, range).map(FuzzyResult)
    }

    pub fn with_curve(self, membership: impl Into<String>, curve: Curve) -> Self {
        FuzzyResult(self.0.with_curve(membership, curve))
    }

    /// The membership curve clipped at `clip`.
    pub fn implication(&self, membership: &str, clip: Value) -> Result<Implication<'_>> {
        let curve = self.curve(membership)?;
        Ok(Implication::new(self.min, self.max, curve, clip))
    }
}

impl Deref for FuzzyResult {
    type Target = Variable;

    fn deref(&self) -> &Variable {
        &self.0
    }
}

impl DerefMut for FuzzyResult {
    fn deref_mut(&mut self) -> &mut Variable {
        &mut self.0
    }
}

/// Input variables, addressable by key or by name. Iteration follows
/// insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Variable>", into = "Vec<Variable>")]
pub struct Variables {
    slots: SlotMap<VariableKey, Variable>,
    names: IndexMap<String, VariableKey>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable, replacing any existing one with the same name.
    pub fn add(&mut self, variable: Variable) -> VariableKey {
        if let Some(&key) = self.names.get(&variable.name) {
            self.slots[key] = variable;
            return key;
        }

        let name = variable.name.clone();
        let key = self.slots.insert(variable);
        self.names.insert(name, key);
        key
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        let key = self.names.shift_remove(name)?;
        self.slots.remove(key)
    }

    pub fn key(&self, name: &str) -> Option<VariableKey> {
        self.names.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.key(name).and_then(|key| self.slots.get(key))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let key = self.key(name)?;
        self.slots.get_mut(key)
    }

    pub fn by_key(&self, key: VariableKey) -> Option<&Variable> {
        self.slots.get(key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.names.values().filter_map(|key| self.slots.get(*key))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl PartialEq for Variables {
    fn eq(&self, rhs: &Self) -> bool {
        self.len() == rhs.len() && self.iter().zip(rhs.iter()).all(|(a, b)| a == b)
    }
}

impl From<Vec<Variable>> for Variables {
    fn from(vars: Vec<Variable>) -> Self {
        let mut this = Variables::new();
        for var in vars {
            this.add(var);
        }
        this
    }
}

impl From<Variables> for Vec<Variable> {
    fn from(vars: Variables) -> Self {
        let Variables { mut slots, names } = vars;
        names.into_values().filter_map(|key| slots.remove(key)).collect()
    }
}

impl FromIterator<Variable> for Variables {
    fn from_iter<I: IntoIterator<Item = Variable>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}
