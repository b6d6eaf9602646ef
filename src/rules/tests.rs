use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use tracing_subscriber::layer::SubscriberExt;

use crate::rules::{Condition, ConditionalRule, Operator, RouteTarget, determine_target};
use crate::{ConfigArray, ResolveError};

fn check(path: &str, operator: &str, value: Option<Value>, data: Value) -> bool {
    Condition::new(path, operator, value).evaluate(&data)
}

#[test]
fn operator_table() {
    // (expected, path, operator, value, data)
    let cases: Vec<(bool, &str, &str, Option<Value>, Value)> = vec![
        (true, "a.b", "equals", Some(json!(5)), json!({ "a": { "b": 5 } })),
        (true, "a.b", "==", Some(json!("5")), json!({ "a": { "b": 5 } })),
        (false, "a.b", "equals", Some(json!(6)), json!({ "a": { "b": 5 } })),
        (true, "a.b", "notEquals", Some(json!(6)), json!({ "a": { "b": 5 } })),
        (true, "a", "!==", Some(json!("x")), json!({})),
        (true, "t", "contains", Some(json!("v J")), json!({ "t": "Smith v Jones" })),
        (false, "t", "contains", Some(json!(5)), json!({ "t": "a5" })),
        (false, "n", "contains", Some(json!("5")), json!({ "n": 45 })),
        (true, "t", "startsWith", Some(json!("Smi")), json!({ "t": "Smith" })),
        (true, "t", "endsWith", Some(json!("th")), json!({ "t": "Smith" })),
        (true, "x", "in", Some(json!([1, 2, 3])), json!({ "x": 2 })),
        (true, "x", "in", Some(json!([1, 2, 3])), json!({ "x": "2" })),
        (false, "x", "in", Some(json!([1, 2, 3])), json!({ "x": 4 })),
        (false, "x", "in", Some(json!(2)), json!({ "x": 2 })),
        (true, "x", "notIn", Some(json!(["a"])), json!({ "x": "b" })),
        (true, "x", "notIn", Some(json!(["a"])), json!({})),
        (false, "x", "notIn", Some(json!("a")), json!({ "x": "b" })),
        (true, "x", "exists", None, json!({ "x": 0 })),
        (false, "x", "exists", None, json!({})),
        (false, "x", "exists", None, json!({ "x": null })),
        (true, "x", "notExists", Some(json!("ignored")), json!({})),
        (true, "x", "greaterThan", Some(json!(10)), json!({ "x": "11" })),
        (false, "x", ">", Some(json!(10)), json!({ "x": 10 })),
        (true, "x", "greaterOrEqual", Some(json!(10)), json!({ "x": 10 })),
        (true, "x", "lessThan", Some(json!(10)), json!({ "x": 9.5 })),
        (true, "x", "<=", Some(json!(10)), json!({ "x": 10 })),
        (false, "x", "lessThan", Some(json!(10)), json!({})),
        (true, "d", "lessThan", Some(json!("2024-05-01")), json!({ "d": "2024-04-30" })),
        (false, "x", ">", Some(json!(1)), json!({ "x": "abc" })),
    ];

    for (expected, path, operator, value, data) in cases {
        assert_eq!(check(path, operator, value.clone(), data.clone()), expected, "{path} {operator} {value:?} on {data}");
    }
}

#[test]
fn operator_names_ignore_case() {
    assert_eq!(Operator::parse("EQUALS"), Some(Operator::Equals));
    assert_eq!(Operator::parse(" notin "), Some(Operator::NotIn));
    assert_eq!(Operator::parse("GreaterThanOrEqual"), Some(Operator::GreaterOrEqual));
    assert_eq!(Operator::parse("like"), None);
}

#[test]
fn unknown_operator_never_matches() {
    assert!(!check("x", "like", Some(json!("a")), json!({ "x": "a" })));
}

fn rule(path: &str, operator: &str, value: Value, target: &str) -> ConditionalRule {
    ConditionalRule {
        condition: Condition::new(path, operator, Some(value)),
        target_blade: target.to_string(),
        config_for_target_blade: Some([("blade", json!(target))].into_iter().collect::<ConfigArray>()),
    }
}

#[test]
fn first_matching_rule_wins() {
    let rules = vec![
        rule("workItem.type", "equals", json!("claim"), "Claims.Panel"),
        rule("workItem.type", "in", json!(["claim", "appeal"]), "Generic.Panel"),
    ];
    let data = json!({ "workItem.type": "claim" });

    let decision = determine_target(&rules, &data, None).unwrap();
    assert_eq!(decision.target, "Claims.Panel");
    assert_eq!(decision.matched_rule, Some(0));
    assert_eq!(decision.config.unwrap().to_map()["blade"], json!("Claims.Panel"));
}

/// Counts warn-level events, so a skipped rule with an unknown operator is
/// observable.
struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _: tracing_subscriber::layer::Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn route_counting_warnings(rules: &[ConditionalRule], data: &Value) -> (Option<usize>, usize) {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
    let default = RouteTarget { target: "Default.Panel".into(), config: None };
    let decision = tracing::subscriber::with_default(subscriber, || determine_target(rules, data, Some(&default)));
    (decision.unwrap().matched_rule, warnings.load(Ordering::SeqCst))
}

#[test]
fn later_rules_are_not_evaluated_after_a_match() {
    let rules = vec![
        rule("workItem.type", "equals", json!("claim"), "Claims.Panel"),
        rule("workItem.type", "resembles", json!("claim"), "Never.Panel"),
    ];

    assert_eq!(route_counting_warnings(&rules, &json!({ "workItem.type": "claim" })), (Some(0), 0));
    assert_eq!(route_counting_warnings(&rules, &json!({ "workItem.type": "task" })), (None, 1));
}

#[test]
fn falls_back_to_default_route() {
    let rules = vec![rule("workItem.type", "equals", json!("claim"), "Claims.Panel")];
    let default = RouteTarget { target: "Default.Panel".into(), config: None };

    let decision = determine_target(&rules, &json!({ "workItem.type": "task" }), Some(&default)).unwrap();
    assert_eq!(decision.target, "Default.Panel");
    assert_eq!(decision.matched_rule, None);
    assert!(decision.config.is_none());
}

#[test]
fn no_match_and_no_default_is_an_error() {
    let rules = vec![rule("workItem.type", "equals", json!("claim"), "Claims.Panel")];
    let err = determine_target(&rules, &json!({}), None).unwrap_err();

    assert!(matches!(err, ResolveError::NoTarget));
    assert!(err.remediation().is_some());
}
