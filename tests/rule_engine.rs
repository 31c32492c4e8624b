use approx::assert_abs_diff_eq;
use fuzzy_rules::{
    document, import_rules, AliasTable, Combiner, Curve, DefuzzificationOp, EngineConfig, EvaluationObserver,
    FuzzyError, FuzzyLogicSet, FuzzyResult, Implication, Inputs, Model, NoData, Rule, SkipReason, Value, Variable,
    Variables,
};
use serde_json::json;

fn falling() -> Curve {
    Curve::Linear {
        left: (0., 1.).into(),
        right: (1., 0.).into(),
    }
}

fn suitability_set() -> FuzzyLogicSet {
    let inputs = vec![
        Variable::new("depth", 0. ..=30.)
            .unwrap()
            .with_curve("deep", Curve::linear())
            .with_curve("shallow", falling()),
        Variable::new("slope", 0. ..=90.)
            .unwrap()
            .with_curve("steep", Curve::linear())
            .with_curve("flat", falling()),
    ];
    let result = FuzzyResult::new("score", 0. ..=1.)
        .unwrap()
        .with_curve("good", Curve::linear())
        .with_curve("poor", falling());

    FuzzyLogicSet::new(inputs, result)
        .with_rules(
            "# soil suitability\n\
             DEF workable IS depth IS deep AND slope IS flat\n\
             IF workable THEN score IS good\n\
             IF depth IS shallow OR slope IS steep THEN score IS poor",
        )
        .unwrap()
}

#[test]
fn test_single_query_rule() {
    let inputs: Variables = [Variable::new("x", 0. ..=10.).unwrap().with_curve("low", falling())]
        .into_iter()
        .collect();
    let result = FuzzyResult::new("y", 0. ..=1.).unwrap().with_curve("high", Curve::linear());
    let rule = Rule::compile("IF x IS low THEN y IS high", &AliasTable::new()).unwrap();

    assert_eq!(rule.found_inputs().collect::<Vec<_>>(), ["x"]);

    let implication = rule.evaluate(&inputs, &result, &Inputs::new().with("x", 0.)).unwrap();

    assert_eq!(implication.terms()[0].clip, 1.);
}

#[test]
fn test_and_clips_at_minimum() {
    let inputs: Variables = [
        Variable::new("a", 0. ..=1.).unwrap().with_curve("hot", Curve::linear()),
        Variable::new("b", 0. ..=1.).unwrap().with_curve("cold", Curve::linear()),
    ]
    .into_iter()
    .collect();
    let result = FuzzyResult::new("r", 0. ..=1.).unwrap().with_curve("warm", Curve::triangle());
    let rule = Rule::compile("IF a IS hot AND b IS cold THEN r IS warm", &AliasTable::new()).unwrap();
    let implication = rule
        .evaluate(&inputs, &result, &Inputs::new().with("a", 0.3).with("b", 0.7))
        .unwrap();

    assert_abs_diff_eq!(implication.terms()[0].clip, 0.3, epsilon = 1e-12);
}

#[test]
fn test_linear_centroid() {
    let curve = Curve::linear();

    assert_eq!(curve.evaluate(0.5).unwrap(), 0.5);

    let centroid = Implication::new(0., 1., &curve, Value::Number(1.)).centroid(1000).unwrap();

    assert_abs_diff_eq!(centroid.and_then(Value::as_number).unwrap(), 2. / 3., epsilon = 1e-3);
}

#[test]
fn test_union_ranges_and_sentinels() {
    let curve = Curve::linear();
    let a = Implication::new(0., 1., &curve, Value::Number(0.5));
    let b = Implication::new(0., 2., &curve, Value::Number(0.5));

    assert!(matches!(a.clone().union(b), Err(FuzzyError::RangeMismatch { .. })));

    let missing = Implication::new(0., 1., &curve, Value::NoData(NoData::PROPAGATE));

    assert_eq!(a.clone().union(missing.clone()).unwrap(), a);
    assert_eq!(missing.union(a.clone()).unwrap(), a);
}

#[test]
fn test_import_keeps_good_rules() {
    let import = import_rules(["IF x IS low THEN y IS high", "IF x IS low y IS high"]);

    assert_eq!(import.rules.len(), 1);
    assert_eq!(import.errors.len(), 1);
    assert_eq!(
        import.errors.iter().next().map(|e| e.message.as_str()),
        Some("\"THEN\" keyword missing from rule")
    );
}

#[test]
fn test_set_with_aliases() {
    let set = suitability_set();

    assert!(set.validate().is_ok());
    assert_eq!(set.rules().len(), 2);

    // Deep and flat: only the first rule fires
    let implication = set
        .evaluate_rules(&Inputs::new().with("depth", 30.).with("slope", 0.))
        .unwrap();
    let score = implication.largest_of_maximum(1000).unwrap().and_then(Value::as_number);

    assert_abs_diff_eq!(score.unwrap(), 1., epsilon = 1e-9);

    let clips: Vec<f64> = implication.terms().iter().map(|t| t.clip).collect();

    assert_eq!(clips, [1., 0.]);
}

#[test]
fn test_documents_round_trip() {
    let combiner = json!({
        "expression": "checknodata(soil, 0) * 0.4 + water * 0.6",
        "default_method": "centroid",
        "sample_count": 1000,
    });

    assert_eq!(document::encode(&document::decode::<Combiner>(combiner.clone()).unwrap()).unwrap(), combiner);

    let set = document::encode(&suitability_set()).unwrap();
    let decoded: FuzzyLogicSet = document::decode(set.clone()).unwrap();

    assert_eq!(document::encode(&decoded).unwrap(), set);
    assert_eq!(decoded, suitability_set());

    for curve in [Curve::trapezoid(), Curve::cubic(), Curve::sigmoid(), Curve::polynomial()] {
        let doc = document::encode(&curve).unwrap();

        assert_eq!(document::encode(&document::decode::<Curve>(doc.clone()).unwrap()).unwrap(), doc);
    }
}

#[derive(Default)]
struct Counter {
    failed_sets: Vec<String>,
    skipped: Vec<(String, SkipReason)>,
}

impl EvaluationObserver for Counter {
    fn set_failed(&mut self, set: &str, _error: &FuzzyError) {
        self.failed_sets.push(set.to_owned());
    }

    fn output_skipped(&mut self, output: &str, reason: &SkipReason) {
        self.skipped.push((output.to_owned(), reason.clone()));
    }
}

fn model(config: EngineConfig) -> Model {
    let combiner = Combiner::configured("checknodata(soil, 0) * 2", &config)
        .unwrap()
        .with_method("soil", DefuzzificationOp::MeanOfMaximum);

    Model::new(config)
        .with_set("soil", suitability_set())
        .with_combiner("suitability", combiner)
        .with_combiner("inverse", Combiner::new("1 / soil").unwrap())
}

#[test]
fn test_model_pipeline() {
    let config = EngineConfig::from_toml_str("[no_data]\nvalue = -1.0\nsubstitute = 0.5\n").unwrap();
    let model = model(config);

    assert!(model.validate().is_ok());

    let outputs = model.evaluate_raw([("depth", 30.), ("slope", 0.)]);

    assert_abs_diff_eq!(outputs.get("suitability").unwrap(), 2., epsilon = 1e-6);
    assert_abs_diff_eq!(outputs.get("inverse").unwrap(), 1.5, epsilon = 1e-2);

    let mut counter = Counter::default();
    let outputs = model.evaluate_record_with(&Inputs::new().with("depth", 30.), &mut counter);

    assert_eq!(counter.failed_sets, ["soil"]);
    assert_eq!(outputs.get("suitability"), Some(-1.));
    assert_eq!(outputs.skipped().count(), 2);
}

#[test]
fn test_model_skips_empty_records() {
    let model = model(EngineConfig::default());
    let mut counter = Counter::default();
    let outputs = model.evaluate_record_with(
        &Inputs::new().with("depth", NoData::PROPAGATE).with("slope", NoData::PROPAGATE),
        &mut counter,
    );

    assert_eq!(outputs.iter().collect::<Vec<_>>(), [("suitability", -99999.), ("inverse", -99999.)]);
    assert!(counter.skipped.iter().all(|(_, r)| *r == SkipReason::AllInputsMissing));
}

#[test]
fn test_model_document() {
    let model = model(EngineConfig::default());
    let text = document::to_string(&model).unwrap();
    let decoded: Model = document::from_str(&text).unwrap();

    assert_eq!(decoded, model);
}
