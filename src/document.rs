//! JSON documents for curves, variables, rules, sets, combiners and config.
//!
//! Tagged unions carry their variant in a `type` field:
//!
//! ```json
//! {"type": "Triangle", "left": {"x": 0.0, "y": 0.0}, "apex": {"x": 0.5, "y": 1.0}, "right": {"x": 1.0, "y": 0.0}}
//! ```
//!
//! Decoding a set or combiner recompiles its text, so a document that
//! decodes is ready to evaluate.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

pub fn decode<T: DeserializeOwned>(doc: serde_json::Value) -> Result<T> {
    Ok(serde_json::from_value(doc)?)
}

/// Pretty printed JSON.
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::combiner::Combiner;
    use crate::config::EngineConfig;
    use crate::curves::Curve;
    use crate::error::FuzzyError;
    use crate::geometry::Segment;
    use crate::implication::Implication;
    use crate::nodata::{NoData, Value};
    use crate::ops::DefuzzificationOp;
    use crate::rules::Rule;
    use crate::set::FuzzyLogicSet;
    use crate::variable::{FuzzyResult, Variable};

    fn round_trip<T>(value: &T) -> T
    where
        T: Serialize + DeserializeOwned,
    {
        from_str(&to_string(value).unwrap()).unwrap()
    }

    #[test]
    fn test_curve_documents() {
        let curves = [
            Curve::triangle(),
            Curve::gaussian(),
            Curve::step(),
            Curve::lookup(vec![0., 0.5, 1., 0.25]).unwrap(),
            Curve::piecewise(vec![
                Segment::linear((0., 0.).into(), (0.5, 1.).into()).unwrap(),
                Segment::bezier((0.5, 1.).into(), (1., 0.).into(), Some((0.9, 0.9).into())).unwrap(),
            ])
            .unwrap(),
        ];

        for curve in &curves {
            assert_eq!(&round_trip(curve), curve);
        }
        assert_eq!(encode(&Curve::triangle()).unwrap()["type"], "Triangle");
    }

    #[test]
    fn test_hand_written_curve() {
        let curve: Curve = decode(json!({
            "type": "Linear",
            "left": {"x": 0.2, "y": 0.0},
            "right": {"x": 0.8, "y": 1.0},
        }))
        .unwrap();

        approx::assert_relative_eq!(curve.evaluate(0.5).unwrap(), 0.5, epsilon = 1e-12);

        let err = decode::<Curve>(json!({"type": "Spline"})).unwrap_err();

        assert!(matches!(err, FuzzyError::Document(_)));
    }

    #[test]
    fn test_variable_and_sentinel_documents() {
        let variable = Variable::new("depth", 0. ..=30.).unwrap().with_curve("deep", Curve::linear());
        let result = FuzzyResult::new("score", -1. ..=1.).unwrap().with_curve("good", Curve::sigmoid());

        assert_eq!(round_trip(&variable), variable);
        assert_eq!(round_trip(&result), result);
        assert_eq!(round_trip(&NoData::substitute(0.25)), NoData::substitute(0.25));
    }

    #[test]
    fn test_rule_and_set_documents() {
        let rule = Rule::compile("IF depth IS deep AND slope IS NOT steep THEN score IS good", &Default::default()).unwrap();

        assert_eq!(round_trip(&rule), rule);
        assert_eq!(encode(&rule).unwrap()["condition"]["node"], "logic");

        let set = FuzzyLogicSet::new(
            vec![
                Variable::new("depth", 0. ..=30.).unwrap().with_curve("deep", Curve::linear()),
                Variable::new("slope", 0. ..=90.).unwrap().with_curve("steep", Curve::linear()),
            ],
            FuzzyResult::new("score", 0. ..=1.).unwrap().with_curve("good", Curve::linear()),
        )
        .with_rules("DEF risky IS depth IS deep AND slope IS steep\nIF risky THEN score IS good")
        .unwrap();
        let decoded: FuzzyLogicSet = round_trip(&set);

        assert_eq!(decoded, set);
        assert_eq!(decoded.rules().len(), 1);
        assert_eq!(decoded.aliases().len(), 1);
    }

    #[test]
    fn test_combiner_and_config_documents() {
        let combiner = Combiner::new("max(soil, water) * 2")
            .unwrap()
            .with_method("water", DefuzzificationOp::MeanOfMaximum);
        let mut config = EngineConfig::default();
        config.no_data.substitute = Some(0.);

        assert_eq!(round_trip(&combiner), combiner);
        assert_eq!(round_trip(&config), config);
    }

    #[test]
    fn test_implications_encode() {
        let curve = Curve::linear();
        let doc = encode(&Implication::new(0., 1., &curve, Value::Number(0.5))).unwrap();

        assert_eq!(doc["terms"][0]["clip"], 0.5);
        assert_eq!(doc["terms"][0]["curve"]["type"], "Linear");
    }
}
