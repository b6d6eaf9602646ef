use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::expr::value::{compare, loose_eq};

/// Comparison a rule condition applies between the value at its path and its
/// configured `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    Exists,
    NotExists,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

/// Accepted spellings, keyed in lower case.
static OPERATOR_ALIASES: Lazy<HashMap<&'static str, Operator>> = Lazy::new(|| {
    HashMap::from([
        ("equals", Operator::Equals),
        ("eq", Operator::Equals),
        ("==", Operator::Equals),
        ("===", Operator::Equals),
        ("notequals", Operator::NotEquals),
        ("ne", Operator::NotEquals),
        ("!=", Operator::NotEquals),
        ("!==", Operator::NotEquals),
        ("contains", Operator::Contains),
        ("startswith", Operator::StartsWith),
        ("endswith", Operator::EndsWith),
        ("in", Operator::In),
        ("notin", Operator::NotIn),
        ("exists", Operator::Exists),
        ("notexists", Operator::NotExists),
        ("greaterthan", Operator::GreaterThan),
        ("gt", Operator::GreaterThan),
        (">", Operator::GreaterThan),
        ("lessthan", Operator::LessThan),
        ("lt", Operator::LessThan),
        ("<", Operator::LessThan),
        ("greaterorequal", Operator::GreaterOrEqual),
        ("greaterthanorequal", Operator::GreaterOrEqual),
        ("gte", Operator::GreaterOrEqual),
        (">=", Operator::GreaterOrEqual),
        ("lessorequal", Operator::LessOrEqual),
        ("lessthanorequal", Operator::LessOrEqual),
        ("lte", Operator::LessOrEqual),
        ("<=", Operator::LessOrEqual),
    ])
});

impl Operator {
    /// Look up an operator name, ignoring case and surrounding whitespace.
    pub fn parse(name: &str) -> Option<Operator> {
        OPERATOR_ALIASES.get(name.trim().to_ascii_lowercase().as_str()).copied()
    }

    /// Apply the operator. `actual` is `None` when the path did not resolve.
    pub fn apply(self, actual: Option<&Value>, expected: Option<&Value>) -> bool {
        let actual = actual.filter(|v| !v.is_null());
        let expected = expected.unwrap_or(&Value::Null);

        match self {
            Operator::Exists => actual.is_some(),
            Operator::NotExists => actual.is_none(),
            Operator::Equals => loose_eq(actual.unwrap_or(&Value::Null), expected),
            Operator::NotEquals => !loose_eq(actual.unwrap_or(&Value::Null), expected),
            Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
                let (Some(Value::String(haystack)), Value::String(needle)) = (actual, expected) else {
                    return false;
                };
                match self {
                    Operator::Contains => haystack.contains(needle.as_str()),
                    Operator::StartsWith => haystack.starts_with(needle.as_str()),
                    _ => haystack.ends_with(needle.as_str()),
                }
            }
            Operator::In | Operator::NotIn => {
                let Value::Array(options) = expected else {
                    return false;
                };
                let member = actual.is_some_and(|a| options.iter().any(|o| loose_eq(a, o)));
                if self == Operator::In { member } else { !member }
            }
            Operator::GreaterThan | Operator::LessThan | Operator::GreaterOrEqual | Operator::LessOrEqual => {
                let Some(ordering) = actual.and_then(|a| compare(a, expected)) else {
                    return false;
                };
                match self {
                    Operator::GreaterThan => ordering.is_gt(),
                    Operator::LessThan => ordering.is_lt(),
                    Operator::GreaterOrEqual => ordering.is_ge(),
                    _ => ordering.is_le(),
                }
            }
        }
    }
}
