//! The enrichment seam.
//!
//! The engine never fetches anything. It tells the caller which paths it
//! needs, the caller fetches them however it likes, and the answer comes back
//! as a flat data map:
//!
//! ```text
//! BladeConfig ── plan_enrichment ──► {"enrich":[{"path":"roles.client.ods.id"}]}
//!                                          │
//!                                    caller's fetch
//!                                          │
//!                       reprefix("workItem", response)
//!                                          ▼
//!               {"workItem.roles.client.ods.id": "ODS-99"} ── resolve_blade
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::config::{BladeConfig, ConfigMap};
use crate::engine::{bind_variables, extract};
use crate::{BladeResolution, Context, Options, ResolveError, Token, resolve_blade};

/// Paths to fetch, relative to their source. Serializes as
/// `{"enrich":[{"path":".."}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentRequest {
    pub enrich: Vec<EnrichPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichPath {
    /// Path below the source tag, e.g. `roles.client.ods.id`.
    pub path: String,
    /// Canonical source tag the path belongs to, e.g. `workItem`.
    #[serde(skip)]
    pub source: String,
}

impl EnrichmentRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from extracted tokens, binding `{name}` variables
    /// from `inputs`. Tokens from sources that need no enrichment are skipped.
    pub fn from_tokens(tokens: &[Token], inputs: &ConfigMap, options: &Options) -> Self {
        let mut request = Self::new();
        for token in tokens {
            let path = if token.has_variables { bind_variables(&token.full_path, inputs) } else { token.full_path.clone() };
            request.add(&path, options);
        }
        request
    }

    /// Everything a blade document may need: tokens from all of its
    /// configurations plus the paths its rule conditions read.
    pub fn for_blade(blade: &BladeConfig, options: &Options) -> Self {
        let inputs = blade.input_config.to_map();
        let tokens = extract(blade.configs());
        let mut request = Self::from_tokens(&tokens, &inputs, options);
        for rule in &blade.conditional_rules {
            request.add(&bind_variables(&rule.condition.path, &inputs), options);
        }
        request
    }

    /// Add a full dotted path (`workItem.roles.client`). Returns false when
    /// the source needs no enrichment, the path is empty or it is already
    /// present.
    pub fn add(&mut self, full_path: &str, options: &Options) -> bool {
        let Some((head, rest)) = full_path.trim().split_once('.') else {
            return false;
        };
        let Some(source) = options.enrichment_source(head) else {
            return false;
        };
        if rest.is_empty() || self.enrich.iter().any(|p| p.source == source && p.path == rest) {
            return false;
        }
        self.enrich.push(EnrichPath { path: rest.to_string(), source: source.to_string() });
        true
    }

    pub fn is_empty(&self) -> bool {
        self.enrich.is_empty()
    }

    pub fn len(&self) -> usize {
        self.enrich.len()
    }
}

/// Flatten an enrichment response and prefix every key with `source.`.
///
/// Nested objects become dotted keys; arrays and scalars are kept as values.
/// A non-object response is stored under the bare source tag.
pub fn reprefix(source: &str, fields: &Value) -> ConfigMap {
    let mut out = ConfigMap::new();
    match fields {
        Value::Object(map) => flatten_into(&mut out, source, map),
        other => {
            out.insert(source.to_string(), other.clone());
        }
    }
    out
}

fn flatten_into(out: &mut ConfigMap, prefix: &str, map: &ConfigMap) {
    for (key, value) in map {
        let key = format!("{prefix}.{key}");
        match value {
            Value::Object(child) if !child.is_empty() => flatten_into(out, &key, child),
            _ => {
                out.insert(key, value.clone());
            }
        }
    }
}

/// Caller-implemented fetch for an [`EnrichmentRequest`].
///
/// The returned map should already be prefixed (see [`reprefix`]). Any
/// `FnMut(&EnrichmentRequest) -> Result<ConfigMap, ResolveError>` closure is
/// an enricher.
pub trait Enricher {
    fn enrich(&mut self, request: &EnrichmentRequest) -> Result<ConfigMap, ResolveError>;
}

impl<F> Enricher for F
where
    F: FnMut(&EnrichmentRequest) -> Result<ConfigMap, ResolveError>,
{
    fn enrich(&mut self, request: &EnrichmentRequest) -> Result<ConfigMap, ResolveError> {
        self(request)
    }
}

/// Plan, fetch through `enricher`, then resolve. The fetch is skipped when
/// nothing needs enriching.
pub fn resolve_blade_with<E: Enricher + ?Sized>(
    blade: &BladeConfig,
    enricher: &mut E,
    context: &Context,
    options: &Options,
) -> Result<BladeResolution, ResolveError> {
    let request = EnrichmentRequest::for_blade(blade, options);
    let data = if request.is_empty() {
        tracing::debug!("nothing to enrich; fetch skipped");
        ConfigMap::new()
    } else {
        tracing::debug!(paths = request.len(), "requesting enrichment");
        enricher.enrich(&request)?
    };
    resolve_blade(blade, &data, context, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn blade(value: Value) -> BladeConfig {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn plans_bound_relative_paths() {
        let blade = blade(json!({
            "inputConfig": [{ "roleSystemName": "client" }],
            "targetBlade": "Ods.Panel",
            "configForTargetBlade": [
                { "id": "[workItem.roles.{roleSystemName}.ods.id]" },
                { "again": "[WorkItem.roles.client.ods.id]" },
                { "t": "[workItem.title] $[data['workItem.ignored']]" },
                { "other": "[matter.ref]" }
            ]
        }));

        let request = EnrichmentRequest::for_blade(&blade, &Options::default());
        let paths: Vec<_> = request.enrich.iter().map(|p| p.path.as_str()).collect();

        assert_eq!(paths, vec!["roles.client.ods.id", "title"]);
        assert_eq!(serde_json::to_value(&request).unwrap(), json!({
            "enrich": [{ "path": "roles.client.ods.id" }, { "path": "title" }]
        }));
    }

    #[test]
    fn plan_includes_condition_paths() {
        let blade = blade(json!({
            "conditionalRules": [
                { "condition": { "path": "workItem.type.systemName", "operator": "equals", "value": "claim" },
                  "targetBlade": "Claims" },
                { "condition": { "path": "pageSystemName", "operator": "exists" }, "targetBlade": "Other" }
            ]
        }));

        let request = EnrichmentRequest::for_blade(&blade, &Options::default());
        assert_eq!(request.len(), 1);
        assert_eq!(request.enrich[0].path, "type.systemName");
    }

    #[test]
    fn reprefix_flattens_nested_objects() {
        let data = reprefix("workItem", &json!({ "title": "T", "roles": { "client": { "ods": { "id": "ODS-1" } } }, "tags": ["a"] }));

        assert_eq!(data["workItem.title"], json!("T"));
        assert_eq!(data["workItem.roles.client.ods.id"], json!("ODS-1"));
        assert_eq!(data["workItem.tags"], json!(["a"]));
        assert_eq!(reprefix("x", &json!(5))["x"], json!(5));
    }

    #[test]
    fn enricher_is_called_once_with_the_plan() {
        let blade = blade(json!({
            "targetBlade": "Ods.Panel",
            "configForTargetBlade": [{ "id": "[workItem.ref]" }]
        }));
        let mut calls = 0;
        let mut fetch = |request: &EnrichmentRequest| -> Result<ConfigMap, ResolveError> {
            calls += 1;
            assert_eq!(request.enrich[0].path, "ref");
            Ok(reprefix("workItem", &json!({ "ref": "MAT-9" })))
        };

        let resolution = resolve_blade_with(&blade, &mut fetch, &Context::default(), &Options::default()).unwrap();
        assert_eq!(resolution.config["id"], json!("MAT-9"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn empty_plan_skips_the_fetch() {
        let blade = blade(json!({ "targetBlade": "Static", "configForTargetBlade": [{ "k": "v" }] }));
        let mut fetch = |_: &EnrichmentRequest| -> Result<ConfigMap, ResolveError> {
            Err(ResolveError::Enrichment("should not be called".into()))
        };

        let resolution = resolve_blade_with(&blade, &mut fetch, &Context::default(), &Options::default()).unwrap();
        assert_eq!(resolution.target, "Static");
    }

    #[test]
    fn fetch_failures_propagate() {
        let blade = blade(json!({ "targetBlade": "Ods", "configForTargetBlade": [{ "id": "[workItem.ref]" }] }));
        let mut fetch =
            |_: &EnrichmentRequest| -> Result<ConfigMap, ResolveError> { Err(ResolveError::Enrichment("timeout".into())) };

        let err = resolve_blade_with(&blade, &mut fetch, &Context::default(), &Options::default()).unwrap_err();
        assert_eq!(err.to_string(), "enrichment failed: timeout");
    }
}
