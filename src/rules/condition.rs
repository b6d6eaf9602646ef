use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operator::Operator;
use crate::config::ConfigMap;

/// `{ path, operator, value }` as written in a blade configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub path: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(path: impl Into<String>, operator: impl Into<String>, value: Option<Value>) -> Self {
        Condition { path: path.into(), operator: operator.into(), value }
    }

    /// Test the condition against `data`. An unknown operator never matches.
    pub fn evaluate(&self, data: &Value) -> bool {
        let Some(operator) = Operator::parse(&self.operator) else {
            tracing::warn!(operator = %self.operator, path = %self.path, "unknown condition operator; rule skipped");
            return false;
        };

        let actual = get_value_by_path(&self.path, data);
        let matched = operator.apply(actual, self.value.as_ref());
        tracing::trace!(path = %self.path, ?operator, ?actual, matched, "condition evaluated");
        matched
    }
}

/// Resolve a dotted path against `root`. Missing segments give `None`.
///
/// Object keys may themselves contain dots (enrichment data is flattened to
/// `workItem.title`-style keys), so the longest literal key is not assumed:
/// the whole remaining path is tried first, then each dot split in turn.
/// Array elements are addressed by numeric segment.
pub fn get_value_by_path<'v>(path: &str, root: &'v Value) -> Option<&'v Value> {
    if path.is_empty() {
        return Some(root);
    }
    match root {
        Value::Object(map) => lookup_in_map(map, path),
        Value::Array(items) => {
            let (head, rest) = path.split_once('.').unwrap_or((path, ""));
            let item = items.get(head.parse::<usize>().ok()?)?;
            get_value_by_path(rest, item)
        }
        _ => None,
    }
}

pub(crate) fn lookup_in_map<'v>(map: &'v ConfigMap, path: &str) -> Option<&'v Value> {
    if let Some(value) = map.get(path) {
        return Some(value);
    }
    path.match_indices('.').find_map(|(dot, _)| {
        let child = map.get(&path[..dot])?;
        get_value_by_path(&path[dot + 1..], child)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walks_nested_objects_and_arrays() {
        let root = json!({ "a": { "b": [ { "c": 1 }, { "c": 2 } ] } });
        assert_eq!(get_value_by_path("a.b.1.c", &root), Some(&json!(2)));
        assert_eq!(get_value_by_path("a.b.9.c", &root), None);
        assert_eq!(get_value_by_path("a.x", &root), None);
        assert_eq!(get_value_by_path("a.b.0.c.d", &root), None);
    }

    #[test]
    fn dotted_keys_resolve() {
        let root = json!({ "workItem.title": "T", "workItem": { "ref": "R" }, "x.y": { "z": 3 } });
        assert_eq!(get_value_by_path("workItem.title", &root), Some(&json!("T")));
        assert_eq!(get_value_by_path("workItem.ref", &root), Some(&json!("R")));
        assert_eq!(get_value_by_path("x.y.z", &root), Some(&json!(3)));
    }

    #[test]
    fn deserializes_without_value() {
        let condition: Condition = serde_json::from_value(json!({ "path": "p", "operator": "exists" })).unwrap();
        assert_eq!(condition, Condition::new("p", "exists", None));
    }
}
