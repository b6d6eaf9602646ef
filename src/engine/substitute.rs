//! The three-stage rewrite.
//!
//! ```text
//! for (key, value) in config:
//!     non-string  -> copied unchanged
//!     string      -> variable_stage -> data_stage -> expression_stage
//! ```
//!
//! Stages are strictly ordered and each works on the previous stage's output.
//! Output keys follow the same flattening rule as the input map: a later
//! duplicate key overwrites an earlier one.

use std::time::Instant;

use serde_json::Value;

use super::legacy;
use super::lexer::{DelimiterMask, SegmentKind, segments};
use super::lookup::{bind_variables, lookup_data};
use super::metrics::{Diagnostic, ProcessMetrics, Stage};
use crate::config::{ConfigArray, ConfigMap};
use crate::expr::{self, value::display};
use crate::{Context, Options, ProcessResult};

/// One configuration-processing run.
///
/// Holds the read-only inputs plus the diagnostics and counters collected on
/// the way. Consumed by [`Substitution::run`].
#[derive(Debug)]
pub(crate) struct Substitution<'a> {
    inputs: &'a ConfigMap,
    data: &'a ConfigMap,
    context: &'a Context,
    options: &'a Options,
    diagnostics: Vec<Diagnostic>,
    metrics: ProcessMetrics,
}

impl<'a> Substitution<'a> {
    pub(crate) fn new(inputs: &'a ConfigMap, data: &'a ConfigMap, context: &'a Context, options: &'a Options) -> Self {
        Substitution { inputs, data, context, options, diagnostics: Vec::new(), metrics: ProcessMetrics::default() }
    }

    pub(crate) fn run(mut self, config: &ConfigArray) -> ProcessResult {
        let started = Instant::now();
        let mut values = ConfigMap::new();

        for (key, value) in config.entries() {
            self.metrics.values += 1;
            let resolved = match value {
                Value::String(text) => Value::String(self.rewrite(key, text)),
                other => {
                    self.metrics.passthrough += 1;
                    other.clone()
                }
            };
            values.insert(key.to_string(), resolved);
        }

        self.metrics.total = started.elapsed();
        tracing::debug!(
            values = self.metrics.values,
            diagnostics = self.diagnostics.len(),
            elapsed = ?self.metrics.total,
            "configuration processed"
        );

        ProcessResult { values, diagnostics: self.diagnostics, metrics: self.metrics }
    }

    fn rewrite(&mut self, key: &str, text: &str) -> String {
        if DelimiterMask::scan(text).is_empty() {
            return text.to_string();
        }
        let text = self.variable_stage(text);
        let text = self.data_stage(key, &text);
        self.expression_stage(key, &text)
    }

    /// `{name}` -> input map value; unknown names are left as written.
    fn variable_stage(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for seg in segments(text, DelimiterMask::VARIABLE) {
            match seg.kind {
                SegmentKind::Variable => match self.inputs.get(seg.inner) {
                    Some(value) => {
                        self.metrics.variables.resolved += 1;
                        out.push_str(&display(value));
                    }
                    None => {
                        self.metrics.variables.unresolved += 1;
                        tracing::trace!(name = seg.inner, "variable not in input map");
                        out.push_str(seg.text);
                    }
                },
                _ => out.push_str(seg.text),
            }
        }
        out
    }

    /// `[path]` -> enriched value, after binding variables inside the path.
    fn data_stage(&mut self, key: &str, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for seg in segments(text, DelimiterMask::DATA | DelimiterMask::EXPRESSION) {
            if seg.kind != SegmentKind::Data {
                out.push_str(seg.text);
                continue;
            }

            let path = bind_variables(seg.inner, self.inputs);
            match lookup_data(self.data, &path, &self.options.enrichment_sources) {
                Some((value, hit)) => {
                    self.metrics.data.resolved += 1;
                    tracing::trace!(key, path = %path, ?hit, "data token resolved");
                    out.push_str(&display(value));
                }
                None => {
                    self.metrics.data.unresolved += 1;
                    tracing::warn!(key, token = seg.text, path = %path, "data token not found in enriched data");
                    self.diagnostics.push(Diagnostic::new(
                        Stage::Data,
                        key,
                        seg.text,
                        format!("no enriched value for '{path}'"),
                    ));
                    out.push_str(seg.text);
                }
            }
        }
        out
    }

    /// Deprecated calls in literal text, then `$[expr]` through the evaluator.
    fn expression_stage(&mut self, key: &str, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for seg in segments(text, DelimiterMask::EXPRESSION) {
            match seg.kind {
                SegmentKind::Expression => {
                    match expr::execute(seg.inner, self.inputs, self.data, self.context) {
                        Ok(value) => {
                            self.metrics.expressions.resolved += 1;
                            out.push_str(&display(&value));
                        }
                        Err(err) => {
                            self.metrics.expressions.unresolved += 1;
                            tracing::error!(key, expression = seg.inner, error = %err, "expression evaluation failed");
                            self.diagnostics.push(Diagnostic::new(Stage::Expression, key, seg.text, err.to_string()));
                            out.push_str(seg.text);
                        }
                    }
                }
                _ if self.options.legacy_calls => {
                    out.push_str(&legacy::rewrite(seg.text, &self.context.page, &mut self.metrics.legacy_calls));
                }
                _ => out.push_str(seg.text),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{PageContext, UserContext};
    use serde_json::json;

    fn map(value: Value) -> ConfigMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn config(value: Value) -> ConfigArray {
        serde_json::from_value(value).unwrap()
    }

    fn run(target: Value, data: Value, inputs: Value) -> ProcessResult {
        let inputs = map(inputs);
        let data = map(data);
        let context = Context::default();
        let options = Options::default();
        Substitution::new(&inputs, &data, &context, &options).run(&config(target))
    }

    #[test]
    fn variable_inside_bracket_binds_from_inputs() {
        let res = run(
            json!([{ "id": "[workItem.roles.{roleSystemName}.ods.id]" }]),
            json!({ "workItem.roles.client.ods.id": "42", "roleSystemName": "wrong" }),
            json!({ "roleSystemName": "client" }),
        );
        assert_eq!(res.values["id"], json!("42"));
        assert_eq!(res.metrics.data.resolved, 1);
    }

    #[test]
    fn missing_data_token_is_left_literal() {
        let res = run(json!([{ "f": "[workItem.unknown.field]" }]), json!({}), json!({}));

        assert_eq!(res.values["f"], json!("[workItem.unknown.field]"));
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].stage, Stage::Data);
        assert_eq!(res.diagnostics[0].token, "[workItem.unknown.field]");
    }

    #[test]
    fn missing_variable_is_left_literal_without_diagnostic() {
        let res = run(json!([{ "v": "hello {nobody}" }]), json!({}), json!({}));
        assert_eq!(res.values["v"], json!("hello {nobody}"));
        assert!(res.diagnostics.is_empty());
        assert_eq!(res.metrics.variables.unresolved, 1);
    }

    #[test]
    fn denied_expression_is_left_literal() {
        let res = run(json!([{ "x": "$[window.location]" }]), json!({}), json!({}));

        assert_eq!(res.values["x"], json!("$[window.location]"));
        assert_eq!(res.diagnostics[0].stage, Stage::Expression);
        assert!(res.diagnostics[0].message.contains("forbidden identifier 'window'"));
    }

    #[test]
    fn non_string_values_pass_through() {
        let res = run(json!([{ "n": 7 }, { "b": false }, { "a": ["{x}", 1] }, { "o": null }]), json!({}), json!({ "x": 1 }));

        assert_eq!(res.values["n"], json!(7));
        assert_eq!(res.values["b"], json!(false));
        assert_eq!(res.values["a"], json!(["{x}", 1]));
        assert_eq!(res.values["o"], Value::Null);
        assert_eq!(res.metrics.passthrough, 4);
    }

    #[test]
    fn stages_feed_each_other() {
        let res = run(
            json!([{ "greeting": "$[upper('{first}')] owns [workItem.ref] ($[inputs.first.length])" }]),
            json!({ "workItem.ref": "MAT-1" }),
            json!({ "first": "ada" }),
        );
        assert_eq!(res.values["greeting"], json!("ADA owns MAT-1 (3)"));
    }

    #[test]
    fn brackets_inside_expressions_are_not_data_tokens() {
        let res = run(
            json!([{ "t": "$[data['workItem.title']]" }]),
            json!({ "workItem.title": "Smith v Jones" }),
            json!({}),
        );
        assert_eq!(res.values["t"], json!("Smith v Jones"));
        assert!(res.diagnostics.is_empty());
    }

    #[test]
    fn legacy_calls_outside_expressions() {
        let inputs = ConfigMap::new();
        let data = ConfigMap::new();
        let context = Context {
            page: PageContext {
                user: Some(UserContext { user_id: Some("u-7".into()), ..Default::default() }),
                ..Default::default()
            },
            ..Default::default()
        };
        let options = Options::default();
        let target = config(json!([{ "owner": "$ui.pageContext.user.userid()" }]));

        let res = Substitution::new(&inputs, &data, &context, &options).run(&target);
        assert_eq!(res.values["owner"], json!("\"u-7\""));

        let options = Options { legacy_calls: false, ..Options::default() };
        let res = Substitution::new(&inputs, &data, &context, &options).run(&target);
        assert_eq!(res.values["owner"], json!("$ui.pageContext.user.userid()"));
    }

    #[test]
    fn later_duplicate_keys_overwrite() {
        let res = run(json!([{ "k": "first" }, { "k": "second" }]), json!({}), json!({}));
        assert_eq!(res.values.len(), 1);
        assert_eq!(res.values["k"], json!("second"));
    }
}
