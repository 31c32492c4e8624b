use std::collections::HashMap;

use approx::assert_relative_eq;
use fuzzy_rules::ops::{gamma_op, AggregateOp, LogicOp};
use fuzzy_rules::{AliasTable, Combiner, Curve, FuzzyError, Inputs, NoData, Operand, Rule, Value, Variable, Variables};
use proptest::prelude::*;

fn combine(expression: &str, a: f64, b: f64) -> Value {
    let operands: HashMap<String, Operand<'_>> = [("a".to_owned(), a.into()), ("b".to_owned(), b.into())]
        .into_iter()
        .collect();

    Combiner::new(expression)
        .unwrap()
        .evaluate(&operands, &HashMap::new())
        .unwrap()
}

fn two_inputs() -> Variables {
    [
        Variable::new("a", 0. ..=1.).unwrap().with_curve("hi", Curve::linear()),
        Variable::new("b", 0. ..=1.).unwrap().with_curve("hi", Curve::linear()),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_aggregate_arity() {
    let one = [Value::Number(0.5)];

    assert!(matches!(AggregateOp::Product.call(&one), Err(FuzzyError::Argument(_))));
    assert!(AggregateOp::Product.call(&[Value::Number(0.5), Value::Number(0.5)]).is_ok());
    assert!(matches!(
        gamma_op(Value::Number(-0.1), &[Value::Number(0.5), Value::Number(0.5)]),
        Err(FuzzyError::Argument(_))
    ));
    assert!(matches!(gamma_op(Value::Number(0.5), &one), Err(FuzzyError::Argument(_))));
}

proptest! {
    #[test]
    fn gamma_interpolates_between_product_and_sum(a in 0.01f64..0.99, b in 0.01f64..0.99) {
        let args = [Value::Number(a), Value::Number(b)];
        let sum = AggregateOp::Sum.call(&args).unwrap().as_number().unwrap();
        let product = AggregateOp::Product.call(&args).unwrap().as_number().unwrap();

        assert_relative_eq!(gamma_op(Value::Number(1.), &args).unwrap().as_number().unwrap(), sum);
        assert_relative_eq!(gamma_op(Value::Number(0.), &args).unwrap().as_number().unwrap(), product);
        assert_relative_eq!(combine("gamma(1, a, b)", a, b).as_number().unwrap(), sum);
        assert_relative_eq!(combine("sum(a, b)", a, b).as_number().unwrap(), sum);
    }

    #[test]
    fn compiled_logic_matches_operators(a in 0f64..=1., b in 0f64..=1.) {
        let inputs = two_inputs();
        let values = Inputs::new().with("a", a).with("b", b);

        for op in [LogicOp::And, LogicOp::Or, LogicOp::Xor] {
            let line = format!("IF a IS hi {} b IS hi THEN r IS x", op.keyword());
            let rule = Rule::compile(&line, &AliasTable::new()).unwrap();

            prop_assert_eq!(
                rule.clip(&inputs, &values).unwrap(),
                op.call(Value::Number(a), Value::Number(b))
            );
        }
    }

    #[test]
    fn missing_inputs_follow_sentinel_rules(a in 0f64..=1.) {
        let inputs = two_inputs();
        let rule = Rule::compile("IF a IS hi AND b IS hi THEN r IS x", &AliasTable::new()).unwrap();

        let values = Inputs::new().with("a", a).with("b", NoData::PROPAGATE);
        prop_assert_eq!(rule.clip(&inputs, &values).unwrap(), Value::NoData(NoData::PROPAGATE));

        let values = Inputs::new().with("a", a).with("b", NoData::IGNORE);
        prop_assert_eq!(rule.clip(&inputs, &values).unwrap(), Value::Number(a));

        let values = Inputs::new().with("a", a).with("b", NoData::substitute(0.5));
        prop_assert_eq!(rule.clip(&inputs, &values).unwrap(), Value::Number(a.min(0.5)));
    }

    #[test]
    fn combiner_sentinels_propagate(b in -1e3f64..1e3) {
        let missing: HashMap<String, Operand<'_>> = [
            ("a".to_owned(), Value::NoData(NoData::PROPAGATE).into()),
            ("b".to_owned(), b.into()),
        ]
        .into_iter()
        .collect();

        for expression in ["a + b", "b - a", "a * b", "max(a, b)", "abs(a) + 1"] {
            let combiner = Combiner::new(expression).unwrap();

            prop_assert_eq!(
                combiner.evaluate(&missing, &HashMap::new()).unwrap(),
                Value::NoData(NoData::PROPAGATE)
            );
        }
    }
}
