//! JavaScript-flavoured coercions over `serde_json::Value`.

use std::cmp::Ordering;

use serde_json::Value;

/// Largest integer an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Number value, kept integral when the result is a whole number.
pub(crate) fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

/// Text used when a value is spliced into a configuration string.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (_, Some(u)) => u.to_string(),
            _ => format_number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { 0.0 } else { s.parse().unwrap_or(f64::NAN) }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// `===`: same type and value; numbers compare numerically.
pub(crate) fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// `==`: strict equality, except that mixed scalar types compare as numbers.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => strict_eq(a, b),
        _ if std::mem::discriminant(a) == std::mem::discriminant(b) => strict_eq(a, b),
        _ => to_number(a) == to_number(b),
    }
}

/// Two strings compare lexically, anything else numerically. `None` when a
/// side is not a number.
pub(crate) fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(a).partial_cmp(&to_number(b)),
    }
}

/// `target.name` on a plain value.
pub(crate) fn property(target: &Value, name: &str) -> Value {
    match (target, name) {
        (Value::String(s), "length") => Value::from(s.chars().count()),
        (Value::Array(items), "length") => Value::from(items.len()),
        (Value::Object(map), _) => map.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// `target[key]`.
pub(crate) fn index(target: &Value, key: &Value) -> Value {
    match (target, key) {
        (Value::Array(items), Value::Number(_)) => {
            let i = to_number(key);
            if i >= 0.0 && i.fract() == 0.0 { items.get(i as usize).cloned().unwrap_or(Value::Null) } else { Value::Null }
        }
        (Value::String(s), Value::Number(_)) => {
            let i = to_number(key);
            if i >= 0.0 && i.fract() == 0.0 {
                s.chars().nth(i as usize).map_or(Value::Null, |c| Value::String(c.to_string()))
            } else {
                Value::Null
            }
        }
        _ => property(target, &display(key)),
    }
}
