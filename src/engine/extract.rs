//! Token extraction.
//!
//! Walks every string value of every configuration, in order, and records one
//! [`Token`] per distinct bracketed placeholder. Identity is the exact original
//! text, so `[workItem.a]` seen under two keys (or in two configurations) is
//! listed once, under the key where it first appeared.
//!
//! Brackets inside `$[...]` belong to the expression and are not tokens.

use std::collections::HashSet;

use serde_json::Value;

use super::lexer::{DelimiterMask, Segment, SegmentKind, segments};
use crate::Token;
use crate::config::ConfigArray;

pub(crate) fn extract<'c>(configs: impl IntoIterator<Item = &'c ConfigArray>) -> Vec<Token> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut tokens = Vec::new();

    for config in configs {
        for (key, value) in config.entries() {
            let Value::String(text) = value else {
                continue;
            };
            for seg in segments(text, DelimiterMask::DATA | DelimiterMask::EXPRESSION) {
                if seg.kind == SegmentKind::Data && seen.insert(seg.text.to_string()) {
                    tokens.push(token_from(key, &seg));
                }
            }
        }
    }

    tracing::debug!(count = tokens.len(), "extracted data tokens");
    tokens
}

fn token_from(key: &str, seg: &Segment<'_>) -> Token {
    let content = seg.inner;
    let head = content.split('.').next().unwrap_or(content);
    let has_variables = segments(content, DelimiterMask::VARIABLE).iter().any(|s| s.kind == SegmentKind::Variable);

    Token {
        original: seg.text.to_string(),
        full_path: content.to_string(),
        source: head.trim().to_ascii_lowercase(),
        has_variables,
        config_key: key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: Value) -> ConfigArray {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classifies_tokens() {
        let target = config(json!([{ "id": "[workItem.roles.{roleSystemName}.ods.id]" }, { "n": "[Case.title]" }]));
        let tokens = extract([&target]);

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].original, "[workItem.roles.{roleSystemName}.ods.id]");
        assert_eq!(tokens[0].full_path, "workItem.roles.{roleSystemName}.ods.id");
        assert_eq!(tokens[0].source, "workitem");
        assert!(tokens[0].has_variables);
        assert_eq!(tokens[0].config_key, "id");
        assert_eq!(tokens[1].source, "case");
        assert!(!tokens[1].has_variables);
    }

    #[test]
    fn repeated_tokens_listed_once_across_configs() {
        let input = config(json!([{ "a": "[workItem.x]" }, { "b": "[workItem.x] and [workItem.y]" }]));
        let target = config(json!([{ "c": "[workItem.y][workItem.x]" }]));
        let tokens = extract([&input, &target]);

        let originals: Vec<&str> = tokens.iter().map(|t| t.original.as_str()).collect();
        assert_eq!(originals, vec!["[workItem.x]", "[workItem.y]"]);
        assert_eq!(tokens[0].config_key, "a");
    }

    #[test]
    fn extraction_is_idempotent() {
        let input = config(json!([{ "v": "{x}" }]));
        let target = config(json!([{ "a": "[workItem.b] [workItem.{v}]" }, { "n": 5 }, { "e": "$[data['[x]']]" }]));

        let first = extract([&input, &target]);
        let second = extract([&input, &target]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn non_string_values_are_skipped() {
        let target = config(json!([{ "n": 1 }, { "b": true }, { "arr": ["[workItem.a]"] }]));
        assert!(extract([&target]).is_empty());
    }
}
