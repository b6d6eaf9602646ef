use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::config::{BladeConfig, ConfigArray, ConfigMap};
use crate::engine::{self, Diagnostic, ProcessMetrics, Substitution};
use crate::enrich::EnrichmentRequest;
use crate::expr::{self, PageContext};
use crate::rules::{ConditionalRule, determine_target};
use crate::{ExprError, ResolveError, Token};

/// Evaluation environment.
///
/// `reference_time` is what `now()`, `today()` and `Date.now()` report inside
/// expressions; `page` backs the `$ui.pageContext` accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub reference_time: NaiveDateTime,
    pub page: PageContext,
}

impl Default for Context {
    fn default() -> Self {
        let reference_time = if cfg!(test) {
            NaiveDate::from_ymd_opt(2024, 3, 15).and_then(|d| d.and_hms_opt(9, 30, 0)).unwrap_or_default()
        } else {
            Local::now().naive_local()
        };
        Self { reference_time, page: PageContext::default() }
    }
}

/// Options that affect extraction and substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Source tags whose tokens need an enrichment fetch. Matched
    /// case-insensitively; the spelling here is the canonical data prefix.
    pub enrichment_sources: Vec<String>,
    /// Substitute the deprecated `$ui.pageContext.*()` calls found outside
    /// `$[...]`.
    pub legacy_calls: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { enrichment_sources: vec!["workItem".to_string()], legacy_calls: true }
    }
}

impl Options {
    /// Canonical spelling of `source` if it needs enrichment.
    pub fn enrichment_source(&self, source: &str) -> Option<&str> {
        let source = source.trim();
        self.enrichment_sources.iter().find(|s| s.eq_ignore_ascii_case(source)).map(String::as_str)
    }
}

/// Result of [`process_configuration_with`].
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Resolved key/value map.
    pub values: ConfigMap,
    /// Placeholders that were left in place, and why.
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: ProcessMetrics,
}

/// Result from [`resolve_blade`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BladeResolution {
    /// Blade to open.
    pub target: String,
    /// Resolved configuration for that blade.
    pub config: ConfigMap,
    /// Index of the conditional rule that chose the target, if any.
    pub matched_rule: Option<usize>,
    /// Data tokens found across the whole document.
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    pub metrics: ProcessMetrics,
}

/// Bracketed data tokens in `input` and `target`, deduplicated by their
/// original text, in first-seen order.
pub fn extract_tokens(input: &ConfigArray, target: &ConfigArray) -> Vec<Token> {
    engine::extract([input, target])
}

/// Resolve every template in `config`.
///
/// Never fails: placeholders that cannot be resolved are left as written.
/// Use [`process_configuration_with`] to see why.
///
/// # Example
/// ```
/// use bladeconf::{ConfigArray, ConfigMap, process_configuration};
/// use serde_json::json;
///
/// let config: ConfigArray = serde_json::from_value(json!([{ "greeting": "Hi {name}, $[upper('{name}')]" }])).unwrap();
/// let input: ConfigArray = serde_json::from_value(json!([{ "name": "ada" }])).unwrap();
///
/// let out = process_configuration(&config, &ConfigMap::new(), &input);
/// assert_eq!(out["greeting"], json!("Hi ada, ADA"));
/// ```
pub fn process_configuration(config: &ConfigArray, enriched: &ConfigMap, input: &ConfigArray) -> ConfigMap {
    process_configuration_with(config, enriched, input, &Context::default(), &Options::default()).values
}

/// Like [`process_configuration`], with an explicit context and options, and
/// returning diagnostics and metrics as well.
pub fn process_configuration_with(
    config: &ConfigArray,
    enriched: &ConfigMap,
    input: &ConfigArray,
    context: &Context,
    options: &Options,
) -> ProcessResult {
    let inputs = input.to_map();
    Substitution::new(&inputs, enriched, context, options).run(config)
}

/// Evaluate one expression (the text inside `$[...]`) with a default
/// [`Context`]. `null` results come back as an empty string.
pub fn safe_execute(expression: &str, inputs: &ConfigMap, data: &ConfigMap) -> Result<Value, ExprError> {
    safe_execute_with(expression, inputs, data, &Context::default())
}

pub fn safe_execute_with(
    expression: &str,
    inputs: &ConfigMap,
    data: &ConfigMap,
    context: &Context,
) -> Result<Value, ExprError> {
    expr::execute(expression, inputs, data, context)
}

/// True when `rule`'s condition holds for `data`.
pub fn evaluate_condition(rule: &ConditionalRule, data: &Value) -> bool {
    rule.matches(data)
}

/// What has to be fetched before `blade` can be resolved.
pub fn plan_enrichment(blade: &BladeConfig, options: &Options) -> EnrichmentRequest {
    EnrichmentRequest::for_blade(blade, options)
}

/// Pick the target blade and resolve its configuration against `enriched`.
///
/// With conditional rules, the first matching rule wins, then the default
/// route. Without rules, `targetBlade` is required.
pub fn resolve_blade(
    blade: &BladeConfig,
    enriched: &ConfigMap,
    context: &Context,
    options: &Options,
) -> Result<BladeResolution, ResolveError> {
    let (target, config, matched_rule) = if blade.conditional_rules.is_empty() {
        let target = blade.target_blade.as_deref().map(str::trim).filter(|t| !t.is_empty()).ok_or(ResolveError::NoTarget)?;
        (target.to_string(), None, None)
    } else {
        let data = Value::Object(enriched.clone());
        let decision = determine_target(&blade.conditional_rules, &data, blade.default_route().as_ref())?;
        let config = decision.config.or_else(|| blade.default_config_for_target_blade.clone());
        (decision.target, config, decision.matched_rule)
    };

    let config = config.as_ref().unwrap_or(&blade.config_for_target_blade);
    let processed = process_configuration_with(config, enriched, &blade.input_config, context, options);
    tracing::info!(target = %target, ?matched_rule, diagnostics = processed.diagnostics.len(), "blade resolved");

    Ok(BladeResolution {
        target,
        config: processed.values,
        matched_rule,
        tokens: engine::extract(blade.configs()),
        diagnostics: processed.diagnostics,
        metrics: processed.metrics,
    })
}
