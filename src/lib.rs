//! Configuration token engine for blade navigation.
//!
//! A navigation configuration is a list of key/template pairs. Templates carry
//! three kinds of placeholders:
//!
//! - `{name}`: a variable from the input configuration.
//! - `[source.path]`: a value from externally fetched ("enriched") data.
//! - `$[expression]`: a small expression evaluated in a sandbox.
//!
//! The engine extracts the bracketed tokens (so the caller knows what to
//! fetch), rewrites every template through three ordered stages and, when
//! conditional rules are configured, picks the blade to open.
//!
//! ```
//! use bladeconf::{ConfigArray, ConfigMap, process_configuration};
//! use serde_json::json;
//!
//! let input: ConfigArray = serde_json::from_value(json!([{ "role": "client" }])).unwrap();
//! let target: ConfigArray = serde_json::from_value(json!([{ "id": "[workItem.roles.{role}.id]" }])).unwrap();
//! let mut data = ConfigMap::new();
//! data.insert("workItem.roles.client.id".into(), json!("42"));
//!
//! let out = process_configuration(&target, &data, &input);
//! assert_eq!(out["id"], json!("42"));
//! ```

use serde::Serialize;

#[macro_use]
mod macros;
mod api;
mod config;
mod engine;
mod enrich;
mod error;
mod expr;
mod rules;

pub use api::{
    BladeResolution, Context, Options, ProcessResult, evaluate_condition, extract_tokens, plan_enrichment,
    process_configuration, process_configuration_with, resolve_blade, safe_execute, safe_execute_with,
};
pub use config::{BladeConfig, ConfigArray, ConfigMap};
pub use engine::{DelimiterMask, Diagnostic, ProcessMetrics, Stage, StageCounts};
pub use enrich::{EnrichPath, Enricher, EnrichmentRequest, reprefix, resolve_blade_with};
pub use error::{ExprError, ResolveError, remediation_for};
pub use expr::{PageContext, UserContext};
pub use rules::{Condition, ConditionalRule, Operator, RouteDecision, RouteTarget, determine_target, get_value_by_path};

// --- Core types -------------------------------------------------------------

/// A bracketed data reference found in a configuration template.
///
/// Only `[...]` placeholders become tokens; `{name}` variables and `$[...]`
/// expressions never need an enrichment fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    /// Exact matched text, delimiters included (e.g. `[workItem.title]`).
    pub original: String,
    /// Text between the brackets.
    pub full_path: String,
    /// Lower-cased first path segment (e.g. `workitem`).
    pub source: String,
    /// Whether the path embeds `{variable}` placeholders.
    pub has_variables: bool,
    /// Configuration key the token was first seen under.
    pub config_key: String,
}

impl Token {
    /// True when the token's source is one of the configured enrichment sources.
    pub fn requires_enrichment(&self, options: &Options) -> bool {
        options.enrichment_source(&self.source).is_some()
    }
}
