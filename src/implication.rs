//! Clipped result curves and their defuzzification.
//!
//! An implication stays lazy: it keeps references to the result curves and
//! the height each one is clipped at, and is only evaluated pointwise when
//! sampled. Unions just concatenate those lists.

use serde::Serialize;

use crate::config::DEFAULT_SAMPLE_COUNT;
use crate::curves::Curve;
use crate::error::{FuzzyError, Result};
use crate::linspace::Linspace;
use crate::nodata::{NoData, Value};
use crate::ops::DefuzzificationOp;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ClippedCurve<'a> {
    pub curve: &'a Curve,
    pub clip: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Implication<'a> {
    min: f64,
    max: f64,
    terms: Vec<ClippedCurve<'a>>,
    /// Set when a clip height was missing data with nothing to substitute.
    #[serde(skip_serializing_if = "Option::is_none")]
    no_data: Option<NoData>,
}

impl<'a> Implication<'a> {
    pub fn new(min: f64, max: f64, curve: &'a Curve, clip: Value) -> Self {
        let (terms, no_data) = match clip {
            Value::Number(clip) => (vec![ClippedCurve { curve, clip }], None),
            Value::NoData(s) => match s.substitution() {
                Some(clip) => (vec![ClippedCurve { curve, clip }], None),
                None => (
                    Vec::new(),
                    Some(NoData {
                        ignore: s.ignore,
                        substitute: None,
                    }),
                ),
            },
        };

        Implication {
            min,
            max,
            terms,
            no_data,
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn terms(&self) -> &[ClippedCurve<'a>] {
        &self.terms
    }

    pub fn is_no_data(&self) -> bool {
        self.no_data.is_some()
    }

    pub fn no_data(&self) -> Option<NoData> {
        self.no_data
    }

    /// The implication's height at `x`, given in the result's own range.
    pub fn at(&self, x: f64) -> Result<Value> {
        if let Some(s) = self.no_data {
            return Ok(Value::NoData(s));
        }

        let n = (x - self.min) / (self.max - self.min);
        let mut height = 0f64;
        for term in &self.terms {
            height = height.max(term.curve.evaluate(n)?.min(term.clip));
        }

        Ok(Value::Number(height))
    }

    /// Combines two implications over the same range. A missing-data
    /// implication yields the other one unchanged.
    pub fn union(self, rhs: Implication<'a>) -> Result<Implication<'a>> {
        if self.min != rhs.min || self.max != rhs.max {
            return Err(FuzzyError::RangeMismatch {
                lhs_min: self.min,
                lhs_max: self.max,
                rhs_min: rhs.min,
                rhs_max: rhs.max,
            });
        }
        if self.no_data.is_some() {
            return Ok(rhs);
        }
        if rhs.no_data.is_some() {
            return Ok(self);
        }

        let mut terms = self.terms;
        terms.extend(rhs.terms);

        Ok(Implication { terms, ..self })
    }

    /// `sample_count + 1` evenly spaced `(x, height)` samples over the range.
    pub fn samples(&self, sample_count: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        if sample_count == 0 {
            return Err(FuzzyError::Argument("sample count must be positive".to_owned()));
        }

        let xs: Vec<f64> = Linspace::new(self.min, self.max, sample_count + 1).collect();
        let ys = xs
            .iter()
            .map(|&x| {
                self.at(x)?
                    .as_number()
                    .ok_or_else(|| FuzzyError::Computation("cannot sample a no-data implication".to_owned()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((xs, ys))
    }

    /// Reduces the implication to one x in its own range.
    ///
    /// `Ok(None)` means the area is empty; a missing-data implication
    /// yields its sentinel without sampling.
    pub fn defuzzify(&self, method: DefuzzificationOp, sample_count: usize) -> Result<Option<Value>> {
        if let Some(s) = self.no_data {
            return Ok(Some(Value::NoData(s)));
        }

        let (xs, ys) = self.samples(sample_count)?;
        Ok(method.call(&xs, &ys)?.map(Value::Number))
    }

    pub fn centroid(&self, sample_count: usize) -> Result<Option<Value>> {
        self.defuzzify(DefuzzificationOp::Centroid, sample_count)
    }

    pub fn bisector(&self, sample_count: usize) -> Result<Option<Value>> {
        self.defuzzify(DefuzzificationOp::Bisector, sample_count)
    }

    pub fn smallest_of_maximum(&self, sample_count: usize) -> Result<Option<Value>> {
        self.defuzzify(DefuzzificationOp::SmallestOfMaximum, sample_count)
    }

    pub fn largest_of_maximum(&self, sample_count: usize) -> Result<Option<Value>> {
        self.defuzzify(DefuzzificationOp::LargestOfMaximum, sample_count)
    }

    pub fn mean_of_maximum(&self, sample_count: usize) -> Result<Option<Value>> {
        self.defuzzify(DefuzzificationOp::MeanOfMaximum, sample_count)
    }

    /// Centroid with the default sample count.
    pub fn default_centroid(&self) -> Result<Option<Value>> {
        self.centroid(DEFAULT_SAMPLE_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn x(v: Option<Value>) -> f64 {
        v.and_then(Value::as_number).unwrap()
    }

    #[test]
    fn test_linear_centroid() {
        let curve = Curve::linear();
        let imp = Implication::new(0., 1., &curve, Value::Number(1.));

        assert_eq!(imp.at(0.5).unwrap(), Value::Number(0.5));
        assert_relative_eq!(x(imp.centroid(1000).unwrap()), 2. / 3., epsilon = 1e-6);
    }

    #[test]
    fn test_results_are_in_result_range() {
        let curve = Curve::triangle();
        let imp = Implication::new(100., 200., &curve, Value::Number(0.5));

        assert_relative_eq!(x(imp.centroid(1000).unwrap()), 150., epsilon = 1e-6);
        assert_relative_eq!(x(imp.bisector(1000).unwrap()), 150., epsilon = 0.2);
        assert_relative_eq!(x(imp.smallest_of_maximum(1000).unwrap()), 137.5, epsilon = 0.2);
        assert_relative_eq!(x(imp.largest_of_maximum(1000).unwrap()), 162.5, epsilon = 0.2);
        assert_relative_eq!(x(imp.mean_of_maximum(1000).unwrap()), 150., epsilon = 0.2);
    }

    #[test]
    fn test_clip_and_union() {
        let low = Curve::linear();
        let high = Curve::Linear {
            left: (0., 1.).into(),
            right: (1., 0.).into(),
        };
        let a = Implication::new(0., 1., &low, Value::Number(0.3));
        let b = Implication::new(0., 1., &high, Value::Number(0.7));
        let u = a.union(b).unwrap();

        assert_eq!(u.terms().len(), 2);
        assert_relative_eq!(u.at(0.1).unwrap().as_number().unwrap(), 0.7);
        assert_relative_eq!(u.at(0.9).unwrap().as_number().unwrap(), 0.3);
    }

    #[test]
    fn test_range_mismatch() {
        let curve = Curve::linear();
        let a = Implication::new(0., 1., &curve, Value::Number(1.));
        let b = Implication::new(0., 2., &curve, Value::Number(1.));

        assert!(matches!(a.union(b), Err(FuzzyError::RangeMismatch { .. })));
    }

    #[test]
    fn test_no_data_is_union_identity() {
        let curve = Curve::linear();
        let real = Implication::new(0., 1., &curve, Value::Number(0.4));
        let missing = Implication::new(0., 1., &curve, Value::NoData(NoData::PROPAGATE));

        assert!(missing.is_no_data());
        assert_eq!(missing.clone().union(real.clone()).unwrap(), real);
        assert_eq!(real.clone().union(missing.clone()).unwrap(), real);
        assert!(missing.clone().union(missing.clone()).unwrap().is_no_data());
        assert_eq!(
            missing.centroid(1000).unwrap(),
            Some(Value::NoData(NoData::PROPAGATE))
        );
    }

    #[test]
    fn test_substituted_clip() {
        let curve = Curve::linear();
        let imp = Implication::new(0., 1., &curve, NoData::substitute(0.5).into());

        assert!(!imp.is_no_data());
        assert_eq!(imp.at(1.).unwrap(), Value::Number(0.5));
    }

    #[test]
    fn test_empty_area() {
        let curve = Curve::linear();
        let imp = Implication::new(0., 1., &curve, Value::Number(0.));

        assert_eq!(imp.centroid(100).unwrap(), None);
        assert!(imp.samples(0).is_err());
    }
}
