//! Data-stage lookups.
//!
//! Enrichment responses are flattened into dotted keys and re-prefixed with
//! their source tag before they reach the engine, but the prefix does not
//! always line up with what a template author wrote. A path is tried as:
//!
//! ```text
//! 1. exact                     workItem.roles.client.ods.id
//! 2. duplicated prefix         workItem.workItem.roles.client.ods.id
//! 3. canonical source prefix   workitem.title  ->  workItem.title
//! 4. nested walk               { "workItem": { "title": .. } }
//! ```
//!
//! Step 3 only applies when the first segment matches a configured enrichment
//! source case-insensitively but not exactly.

use serde_json::Value;

use super::lexer::{DelimiterMask, SegmentKind, segments};
use crate::config::ConfigMap;
use crate::expr::value::display;
use crate::rules::lookup_in_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupHit {
    Exact,
    DuplicatedPrefix,
    CanonicalPrefix,
    Nested,
}

pub(crate) fn lookup_data<'d>(data: &'d ConfigMap, path: &str, sources: &[String]) -> Option<(&'d Value, LookupHit)> {
    if let Some(value) = data.get(path) {
        return Some((value, LookupHit::Exact));
    }

    let (head, rest) = path.split_once('.').unwrap_or((path, ""));
    if let Some(value) = data.get(&format!("{head}.{path}")) {
        return Some((value, LookupHit::DuplicatedPrefix));
    }

    if !rest.is_empty() {
        let canonical = sources
            .iter()
            .filter(|source| source.eq_ignore_ascii_case(head) && source.as_str() != head)
            .find_map(|source| data.get(&format!("{source}.{rest}")));
        if let Some(value) = canonical {
            return Some((value, LookupHit::CanonicalPrefix));
        }
    }

    lookup_in_map(data, path).map(|value| (value, LookupHit::Nested))
}

/// Replace `{name}` placeholders in a path from the input map.
///
/// Unknown names fall back to the bare name (`{role}` -> `role`), so a
/// half-bound path still produces a plausible key for diagnostics.
pub(crate) fn bind_variables(path: &str, inputs: &ConfigMap) -> String {
    segments(path, DelimiterMask::VARIABLE)
        .into_iter()
        .map(|seg| match seg.kind {
            SegmentKind::Variable => inputs.get(seg.inner).map_or_else(|| seg.inner.to_string(), display),
            _ => seg.text.to_string(),
        })
        .collect()
}
