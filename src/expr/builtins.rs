//! Functions, methods and constants visible to expressions.
//!
//! ```text
//! global      getValue formatDate now today addDays concat defaultValue
//!             upper lower trim substring isEmpty String Number Boolean
//! utils.*     same as the globals
//! Math.*      round floor ceil abs min max pow   PI E
//! JSON.*      stringify parse
//! Date.*      now
//! $ui.pageContext.*   see host.rs
//! ```
//!
//! Dates are plain strings. `now()` and `today()` read the context's
//! reference time, never the wall clock.

use std::fmt::Write as _;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::eval::Evaluator;
use super::host;
use super::value::{display, number, strict_eq, to_number, truthy};
use crate::ExprError;
use crate::rules::{get_value_by_path, lookup_in_map};

static NULL: Value = Value::Null;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Namespaces whose members are resolved by name rather than by value.
pub(crate) const NAMESPACES: &[&str] = &["Math", "JSON", "Date", "utils", "$ui"];

/// Non-callable namespace members such as `Math.PI`.
pub(crate) fn constant(path: &str) -> Option<Value> {
    match path {
        "Math.PI" => Some(number(std::f64::consts::PI)),
        "Math.E" => Some(number(std::f64::consts::E)),
        _ => None,
    }
}

/// Call a global or namespaced function by its dotted name.
pub(crate) fn call_function(ev: &Evaluator<'_>, name: &str, args: &[Value]) -> Result<Value, ExprError> {
    if let Some(accessor) = name.strip_prefix("$ui.pageContext.") {
        return host::call(&ev.context.page, accessor, args);
    }
    let name = name.strip_prefix("utils.").unwrap_or(name);
    let arg = |i: usize| args.get(i).unwrap_or(&NULL);

    Ok(match name {
        "getValue" => {
            let path = display(arg(0));
            let found = match args.get(1) {
                Some(obj) => get_value_by_path(&path, obj),
                None => lookup_in_map(ev.data, &path).or_else(|| lookup_in_map(ev.inputs, &path)),
            };
            found.cloned().unwrap_or(Value::Null)
        }
        "formatDate" => {
            let pattern = args.get(1).map_or_else(|| "YYYY-MM-DD".to_string(), display);
            match parse_date(arg(0)) {
                Some((moment, _)) => Value::String(format_moment(&moment, &pattern)?),
                None => Value::Null,
            }
        }
        "now" => Value::String(ev.context.reference_time.format(DATETIME_FORMAT).to_string()),
        "today" => Value::String(ev.context.reference_time.format(DATE_FORMAT).to_string()),
        "addDays" => {
            let days = to_number(arg(1));
            let shifted = parse_date(arg(0)).filter(|_| days.is_finite()).and_then(|(moment, date_only)| {
                let delta = Duration::try_days(days.trunc() as i64)?;
                Some((moment.checked_add_signed(delta)?, date_only))
            });
            match shifted {
                Some((moment, date_only)) => {
                    let format = if date_only { DATE_FORMAT } else { DATETIME_FORMAT };
                    Value::String(moment.format(format).to_string())
                }
                None => Value::Null,
            }
        }
        "concat" => Value::String(args.iter().map(display).collect()),
        "defaultValue" => match arg(0) {
            Value::Null => arg(1).clone(),
            Value::String(s) if s.is_empty() => arg(1).clone(),
            value => value.clone(),
        },
        "upper" => Value::String(display(arg(0)).to_uppercase()),
        "lower" => Value::String(display(arg(0)).to_lowercase()),
        "trim" => Value::String(display(arg(0)).trim().to_string()),
        "substring" => Value::String(substring(&display(arg(0)), args.get(1), args.get(2))),
        "isEmpty" => Value::Bool(match arg(0) {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            _ => false,
        }),
        "String" => Value::String(display(arg(0))),
        "Number" => number(to_number(arg(0))),
        "Boolean" => Value::Bool(truthy(arg(0))),

        "Math.round" => number((to_number(arg(0)) + 0.5).floor()),
        "Math.floor" => number(to_number(arg(0)).floor()),
        "Math.ceil" => number(to_number(arg(0)).ceil()),
        "Math.abs" => number(to_number(arg(0)).abs()),
        "Math.min" => number(args.iter().map(to_number).fold(f64::INFINITY, f64::min)),
        "Math.max" => number(args.iter().map(to_number).fold(f64::NEG_INFINITY, f64::max)),
        "Math.pow" => number(to_number(arg(0)).powf(to_number(arg(1)))),

        "JSON.stringify" => Value::String(arg(0).to_string()),
        "JSON.parse" => serde_json::from_str(&display(arg(0)))
            .map_err(|err| ExprError::argument("JSON.parse", err.to_string()))?,

        "Date.now" => Value::from(ev.context.reference_time.and_utc().timestamp_millis()),

        _ => return Err(ExprError::UnknownFunction(name.to_string())),
    })
}

/// Call `receiver.method(args)` on a plain value.
pub(crate) fn call_method(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, ExprError> {
    let arg = |i: usize| args.get(i).unwrap_or(&NULL);

    Ok(match (receiver, method) {
        (Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
        (Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
        (Value::String(s), "trim") => Value::String(s.trim().to_string()),
        (Value::String(s), "substring") => Value::String(substring(s, args.first(), args.get(1))),
        (Value::String(s), "indexOf") => {
            let needle = display(arg(0));
            Value::from(s.find(&needle).map_or(-1, |byte| s[..byte].chars().count() as i64))
        }
        (Value::String(s), "includes") => Value::Bool(s.contains(&display(arg(0)))),
        (Value::String(s), "startsWith") => Value::Bool(s.starts_with(&display(arg(0)))),
        (Value::String(s), "endsWith") => Value::Bool(s.ends_with(&display(arg(0)))),
        (Value::String(s), "replace") => Value::String(s.replacen(&display(arg(0)), &display(arg(1)), 1)),
        (Value::String(s), "split") => {
            let sep = display(arg(0));
            let parts: Vec<Value> = if sep.is_empty() {
                s.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                s.split(sep.as_str()).map(|part| Value::String(part.to_string())).collect()
            };
            Value::Array(parts)
        }
        (Value::String(s), "charAt") => {
            let i = to_number(arg(0));
            let c = if i >= 0.0 { s.chars().nth(i as usize) } else { None };
            Value::String(c.map(String::from).unwrap_or_default())
        }

        (Value::Array(items), "join") => {
            let sep = args.first().map_or_else(|| ",".to_string(), display);
            Value::String(items.iter().map(display).collect::<Vec<_>>().join(&sep))
        }
        (Value::Array(items), "includes") => Value::Bool(items.iter().any(|item| strict_eq(item, arg(0)))),
        (Value::Array(items), "indexOf") => {
            Value::from(items.iter().position(|item| strict_eq(item, arg(0))).map_or(-1, |i| i as i64))
        }

        (Value::Number(n), "toFixed") => {
            let digits = to_number(arg(0));
            if !(0.0..=20.0).contains(&digits) {
                return Err(ExprError::argument("toFixed", "digits must be between 0 and 20"));
            }
            Value::String(format!("{:.*}", digits as usize, n.as_f64().unwrap_or(f64::NAN)))
        }

        (Value::String(_) | Value::Array(_) | Value::Number(_) | Value::Bool(_), "toString") => {
            Value::String(display(receiver))
        }

        (Value::Null, _) => return Err(ExprError::argument(method, "called on a missing value")),
        _ => return Err(ExprError::UnknownFunction(method.to_string())),
    })
}

/// JavaScript `substring`: character indices, clamped, swapped when reversed.
fn substring(s: &str, start: Option<&Value>, end: Option<&Value>) -> String {
    let len = s.chars().count();
    let clamp = |v: Option<&Value>, default: usize| match v {
        None | Some(Value::Null) => default,
        Some(v) => {
            let n = to_number(v);
            if n.is_nan() || n < 0.0 { 0 } else { (n as usize).min(len) }
        }
    };
    let (mut from, mut to) = (clamp(start, 0), clamp(end, len));
    if from > to {
        std::mem::swap(&mut from, &mut to);
    }
    s.chars().skip(from).take(to - from).collect()
}

/// Parse a date-ish value. The flag is `true` when the input had no time part.
fn parse_date(value: &Value) -> Option<(NaiveDateTime, bool)> {
    match value {
        Value::Number(n) => {
            let millis = n.as_f64()?;
            DateTime::from_timestamp_millis(millis as i64).map(|dt| (dt.naive_utc(), false))
        }
        Value::String(s) => {
            let s = s.trim();
            if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
                return Some((date.and_time(chrono::NaiveTime::MIN), true));
            }
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
                .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
                .map(|dt| (dt, false))
        }
        _ => None,
    }
}

/// Moment-style tokens, longest first.
const MOMENT_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("DD", "%d"),
    ("D", "%-d"),
    ("HH", "%H"),
    ("H", "%-H"),
    ("hh", "%I"),
    ("h", "%-I"),
    ("mm", "%M"),
    ("m", "%-M"),
    ("ss", "%S"),
    ("s", "%-S"),
    ("A", "%p"),
    ("a", "%P"),
];

/// Translate a moment-style pattern into a strftime one. `[text]` is copied
/// literally.
fn moment_to_strftime(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                out.push_str(&rest[1..close].replace('%', "%%"));
                rest = &rest[close + 1..];
                continue;
            }
        }
        if let Some((token, spec)) = MOMENT_TOKENS.iter().find(|(token, _)| rest.starts_with(token)) {
            out.push_str(spec);
            rest = &rest[token.len()..];
            continue;
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn format_moment(moment: &NaiveDateTime, pattern: &str) -> Result<String, ExprError> {
    let strftime = moment_to_strftime(pattern);
    let mut out = String::new();
    write!(out, "{}", moment.format(&strftime))
        .map_err(|_| ExprError::argument("formatDate", format!("unsupported pattern '{pattern}'")))?;
    Ok(out)
}
